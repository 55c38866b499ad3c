use std::rc::Rc;

use log::{info, warn};
use ratatui::{
    layout::{Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::source::CredentialSource;

use super::dispatch::{Dispatcher, InputEvent, Response, Store};
use super::error::TreeError;
use super::label::{LabelCache, LabelStats};
use super::node::{NodeId, NodeStore, Row};

const INDENT: &str = "  ";

/// The group the navigator is mounted on.
#[derive(Debug, Clone)]
pub struct MountRoot<G> {
    pub key: String,
    pub label: String,
    pub reference: G,
}

/// Tree widget mounted by the host: owns the dispatcher (and through it the
/// node store) plus the label memo and scroll position.
pub struct TreeNavigator<S: CredentialSource> {
    dispatcher: Dispatcher<S>,
    labels: LabelCache,
    offset: usize,
    /// Inner area of the last render, used for pointer hit-testing.
    viewport: Rect,
    mount_error: Option<TreeError>,
}

impl<S: CredentialSource> TreeNavigator<S> {
    /// Creates the root node, loads its children and shows them.
    ///
    /// A failed root load leaves the root collapsed and unloaded; the error
    /// is kept for [`take_mount_error`](Self::take_mount_error) and a later
    /// activation of the root retries the fetch.
    pub fn mount(source: S, root: MountRoot<S::GroupRef>, label_capacity: usize) -> Self {
        let store = NodeStore::new(root.key, root.label, "/", root.reference);
        let mut dispatcher = Dispatcher::new(source, store);
        let root_id = dispatcher.store().root();
        let mount_error = match dispatcher.expand(root_id) {
            Ok(()) => {
                let loaded = dispatcher.store().get(root_id).map_or(0, |node| node.children().len());
                info!("navigator mounted with {loaded} top-level item(s)");
                None
            }
            Err(e) => {
                warn!("navigator mounted without its root: {e}");
                Some(e)
            }
        };
        Self {
            dispatcher,
            labels: LabelCache::new(label_capacity),
            offset: 0,
            viewport: Rect::default(),
            mount_error,
        }
    }

    /// The error of the root load at mount, if any. Returned once.
    pub fn take_mount_error(&mut self) -> Option<TreeError> {
        self.mount_error.take()
    }

    /// Gives the source back, dropping the tree.
    pub fn into_source(self) -> S {
        self.dispatcher.into_source()
    }

    pub fn handle(&mut self, event: InputEvent) -> Result<Response, TreeError> {
        self.dispatcher.handle(event)
    }

    pub fn store(&self) -> &Store<S> {
        self.dispatcher.store()
    }

    pub fn source(&self) -> &S {
        self.dispatcher.source()
    }

    pub fn has_focus(&self) -> bool {
        self.store().has_focus()
    }

    pub fn label_stats(&self) -> LabelStats {
        self.labels.stats()
    }

    /// Memoized label of `id` under the current interaction state.
    pub fn label(&mut self, id: NodeId) -> Result<Rc<Line<'static>>, TreeError> {
        let store = self.dispatcher.store();
        let node = store.get(id)?;
        let hover = store.hover() == Some(id);
        let cursor = store.cursor() == id;
        Ok(self.labels.label(node, hover, cursor, store.has_focus()))
    }

    pub fn rows(&self) -> Vec<Row> {
        self.store().visible_rows()
    }

    /// Node drawn at the given screen cell during the last render.
    pub fn node_at(&self, column: u16, row: u16) -> Option<NodeId> {
        if !self.viewport.contains(Position::new(column, row)) {
            return None;
        }
        let idx = self.offset + usize::from(row - self.viewport.y);
        self.rows().get(idx).map(|row| row.id)
    }

    pub fn render(&mut self, f: &mut Frame<'_>, area: Rect) {
        let focused = self.has_focus();
        let block = Block::default()
            .title("Groups")
            .borders(Borders::ALL)
            .border_style(if focused {
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            });
        let inner = block.inner(area);
        self.viewport = inner;

        let rows = self.rows();
        let height = usize::from(inner.height);
        if let Some(cursor) = rows.iter().position(|row| row.id == self.store().cursor()) {
            self.offset = scroll_to(self.offset, cursor, height);
        }
        self.offset = self.offset.min(rows.len().saturating_sub(1));

        let mut lines = Vec::with_capacity(height);
        for row in rows.iter().skip(self.offset).take(height) {
            let Ok(label) = self.label(row.id) else {
                continue;
            };
            let mut spans = vec![Span::raw(INDENT.repeat(usize::from(row.depth)))];
            spans.extend(label.spans.iter().cloned());
            lines.push(Line::from(spans));
        }

        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Smallest change to `offset` that keeps `cursor` inside a window of
/// `height` rows.
fn scroll_to(offset: usize, cursor: usize, height: usize) -> usize {
    if height == 0 {
        return offset;
    }
    if cursor < offset {
        cursor
    } else if cursor >= offset + height {
        cursor + 1 - height
    } else {
        offset
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::models::Database;
    use crate::source::GroupPath;

    fn database() -> Database {
        serde_json::from_str(
            r#"{ "root": {
                "uuid": "root", "name": "Root",
                "groups": [{ "uuid": "work", "name": "Work" }],
                "entries": [{ "uuid": "wifi", "title": "Wifi" }]
            } }"#,
        )
        .expect("database")
    }

    fn mount() -> TreeNavigator<Database> {
        let root = MountRoot {
            key: "root".into(),
            label: "Root".into(),
            reference: GroupPath::default(),
        };
        TreeNavigator::mount(database(), root, 64)
    }

    #[rstest]
    #[case(0, 0, 5, 0)]
    #[case(0, 4, 5, 0)]
    #[case(0, 5, 5, 1)]
    #[case(3, 1, 5, 1)]
    #[case(2, 2, 0, 2)]
    fn test_scroll_to(#[case] offset: usize, #[case] cursor: usize, #[case] height: usize, #[case] expected: usize) {
        assert_eq!(scroll_to(offset, cursor, height), expected);
    }

    #[test]
    fn test_mount_expands_root() {
        let nav = mount();

        let root = nav.store().get(nav.store().root()).expect("root");
        assert!(root.is_loaded());
        assert!(root.is_expanded());
        assert_eq!(nav.rows().len(), 3);
    }

    #[test]
    fn test_label_is_memoized_until_state_changes() {
        let mut nav = mount();
        let root = nav.store().root();
        let wifi = nav.rows()[2].id;

        let first = nav.label(wifi).expect("label");
        let again = nav.label(wifi).expect("label");
        assert!(Rc::ptr_eq(&first, &again));

        nav.handle(InputEvent::PointerMove(wifi)).expect("hover");
        let hovered = nav.label(wifi).expect("label");
        assert!(!Rc::ptr_eq(&first, &hovered));

        let root_before = nav.label(root).expect("root label");
        nav.handle(InputEvent::Focus(true)).expect("focus");
        let root_after = nav.label(root).expect("root label");
        assert!(!Rc::ptr_eq(&root_before, &root_after));
        assert_eq!(nav.label_stats().misses, 4);
    }

    #[test]
    fn test_failed_root_load_keeps_navigator_usable() {
        let root = MountRoot {
            key: "root".into(),
            label: "Root".into(),
            reference: GroupPath(vec![7]),
        };

        let mut nav = TreeNavigator::mount(database(), root, 64);

        let err = nav.take_mount_error().expect("root load error");
        assert!(matches!(err, TreeError::SourceUnavailable { ref path, .. } if path == "/"));
        assert_eq!(nav.take_mount_error(), None);
        let root_id = nav.store().root();
        let root_node = nav.store().get(root_id).expect("root");
        assert!(!root_node.is_loaded());
        assert!(!root_node.is_expanded());
        assert_eq!(nav.rows().len(), 1);
    }

    #[test]
    fn test_mount_without_error() {
        let mut nav = mount();
        assert_eq!(nav.take_mount_error(), None);
    }

    #[test]
    fn test_node_at_without_render_is_none() {
        let nav = mount();
        assert_eq!(nav.node_at(0, 0), None);
    }
}
