//! Turns normalized input into store mutations or selections.

use log::{debug, warn};

use crate::source::CredentialSource;

use super::error::TreeError;
use super::loader::load_children;
use super::node::{NodeId, NodeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// Enter or Space on the cursor row.
    Activate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerMove(NodeId),
    PointerLeave,
    Click(NodeId),
    Focus(bool),
    Key(NavKey),
}

/// An entry the user activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub node: NodeId,
    /// Source identity of the entry.
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ignored,
    Redraw,
    Selected(Selection),
}

pub type Store<S> =
    NodeStore<<S as CredentialSource>::GroupRef, <S as CredentialSource>::EntryRef>;

/// Sole owner of the node store; every mutation goes through here.
pub struct Dispatcher<S: CredentialSource> {
    source: S,
    store: Store<S>,
}

impl<S: CredentialSource> Dispatcher<S> {
    pub fn new(source: S, store: Store<S>) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn handle(&mut self, event: InputEvent) -> Result<Response, TreeError> {
        match event {
            InputEvent::PointerMove(id) => {
                if self.store.hover() == Some(id) {
                    return Ok(Response::Ignored);
                }
                self.store.set_hover(Some(id))?;
                Ok(Response::Redraw)
            }
            InputEvent::PointerLeave => {
                if self.store.hover().is_none() {
                    return Ok(Response::Ignored);
                }
                self.store.set_hover(None)?;
                Ok(Response::Redraw)
            }
            InputEvent::Focus(focus) => {
                if self.store.has_focus() == focus {
                    return Ok(Response::Ignored);
                }
                self.store.set_focus(focus);
                Ok(Response::Redraw)
            }
            InputEvent::Click(id) => {
                self.store.set_cursor(id)?;
                self.activate(id)
            }
            InputEvent::Key(key) => self.handle_key(key),
        }
    }

    /// Selects an entry, or expands/collapses a group, loading it first
    /// when it has never been loaded.
    pub fn activate(&mut self, id: NodeId) -> Result<Response, TreeError> {
        let node = self.store.get(id)?;
        if !node.is_group() {
            debug!("selected entry {} ({})", node.path(), node.key());
            return Ok(Response::Selected(Selection {
                node: id,
                key: node.key().to_string(),
                path: node.path().to_string(),
            }));
        }

        if node.is_expanded() {
            self.collapse(id)?;
        } else {
            self.expand(id)?;
        }
        Ok(Response::Redraw)
    }

    pub fn expand(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.store.get(id)?.is_loaded() {
            self.load(id)?;
        }
        self.store.set_expanded(id, true)?;
        Ok(())
    }

    pub fn collapse(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.store.set_expanded(id, false)?;
        if self.store.is_descendant(id, self.store.cursor()) {
            self.store.set_cursor(id)?;
        }
        if let Some(hover) = self.store.hover() {
            if self.store.is_descendant(id, hover) {
                self.store.set_hover(None)?;
            }
        }
        Ok(())
    }

    fn load(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.store.get(id)?;
        let Some(group) = node.group() else {
            return Err(TreeError::NotAGroup(id));
        };
        let reference = group.source().clone();
        let path = node.path().to_string();

        let children = load_children(&self.source, &reference, &path).inspect_err(|e| {
            warn!("expanding {path} failed: {e}");
        })?;
        match self.store.attach_children(id, children) {
            Ok(_) => Ok(()),
            Err(TreeError::AlreadyLoaded(_)) => {
                debug!("{path} was loaded concurrently; keeping the first result");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn handle_key(&mut self, key: NavKey) -> Result<Response, TreeError> {
        let cursor = self.store.cursor();
        match key {
            NavKey::Activate => self.activate(cursor),
            NavKey::Up => self.step_cursor(-1),
            NavKey::Down => self.step_cursor(1),
            NavKey::Home => {
                let root = self.store.root();
                self.move_cursor(root)
            }
            NavKey::End => match self.store.visible_rows().last() {
                Some(row) => self.move_cursor(row.id),
                None => Ok(Response::Ignored),
            },
            NavKey::Right => {
                let node = self.store.get(cursor)?;
                if !node.is_group() {
                    return Ok(Response::Ignored);
                }
                if !node.is_expanded() {
                    self.expand(cursor)?;
                    return Ok(Response::Redraw);
                }
                match node.children().first().copied() {
                    Some(child) => self.move_cursor(child),
                    None => Ok(Response::Ignored),
                }
            }
            NavKey::Left => {
                if self.store.get(cursor)?.is_expanded() {
                    self.collapse(cursor)?;
                    return Ok(Response::Redraw);
                }
                match self.store.parent_of(cursor) {
                    Some(parent) => self.move_cursor(parent),
                    None => Ok(Response::Ignored),
                }
            }
        }
    }

    /// Moves the cursor along the visible rows without wrapping.
    fn step_cursor(&mut self, delta: isize) -> Result<Response, TreeError> {
        let rows = self.store.visible_rows();
        let Some(pos) = rows.iter().position(|row| row.id == self.store.cursor()) else {
            let root = self.store.root();
            return self.move_cursor(root);
        };
        let Some(next) = pos.checked_add_signed(delta).and_then(|idx| rows.get(idx)) else {
            return Ok(Response::Ignored);
        };
        self.move_cursor(next.id)
    }

    fn move_cursor(&mut self, id: NodeId) -> Result<Response, TreeError> {
        if self.store.cursor() == id {
            return Ok(Response::Ignored);
        }
        self.store.set_cursor(id)?;
        Ok(Response::Redraw)
    }
}
