//! The credential source the navigator reads its tree from.
//!
//! The navigator only ever asks a source for the immediate members of a
//! group. It never sees secrets; the host resolves entry details itself
//! once an entry is selected.

use std::rc::Rc;

use crate::models::{Database, Entry, Group};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("group {0} is no longer in the database")]
    MissingGroup(String),

    #[error("{0}")]
    Unavailable(String),
}

/// One member of a group as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem<R> {
    /// Identity of the item inside the source.
    pub key: String,
    /// Group name or entry title, when it has one.
    pub name: Option<String>,
    /// Names of the item's ancestry, ending with the item itself.
    pub path: Vec<Option<String>>,
    pub reference: R,
}

/// Members of a group, each kind in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<G, E> {
    pub groups: Vec<SourceItem<G>>,
    pub entries: Vec<SourceItem<E>>,
}

impl<G, E> Default for Listing<G, E> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            entries: Vec::new(),
        }
    }
}

pub trait CredentialSource {
    type GroupRef: Clone;
    type EntryRef: Clone;

    /// Lists sub-groups and entries of `group` in one call.
    fn list(&self, group: &Self::GroupRef) -> Result<Listing<Self::GroupRef, Self::EntryRef>, SourceError>;
}

impl<T: CredentialSource + ?Sized> CredentialSource for Rc<T> {
    type GroupRef = T::GroupRef;
    type EntryRef = T::EntryRef;

    fn list(&self, group: &Self::GroupRef) -> Result<Listing<Self::GroupRef, Self::EntryRef>, SourceError> {
        (**self).list(group)
    }
}

/// A source that also hands out the full entry behind a leaf reference.
/// Only the host uses this; the navigator never reads entry fields.
pub trait EntryStore: CredentialSource {
    fn entry(&self, entry: &Self::EntryRef) -> Option<&Entry>;
}

impl<T: EntryStore + ?Sized> EntryStore for Rc<T> {
    fn entry(&self, entry: &Self::EntryRef) -> Option<&Entry> {
        (**self).entry(entry)
    }
}

/// Position of a group in a [`Database`], as child indices from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupPath(pub Vec<usize>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPath {
    pub group: GroupPath,
    pub index: usize,
}

impl Database {
    pub fn root_ref(&self) -> GroupPath {
        GroupPath::default()
    }

    pub fn group_at(&self, path: &GroupPath) -> Option<&Group> {
        self.root.descend(&path.0)
    }

    pub fn entry_at(&self, path: &EntryPath) -> Option<&Entry> {
        self.group_at(&path.group)?.entries.get(path.index)
    }

    /// Names of the groups from below the root down to `path`.
    fn trail(&self, path: &GroupPath) -> Vec<Option<String>> {
        let mut trail = Vec::with_capacity(path.0.len());
        let mut group = &self.root;
        for &idx in &path.0 {
            match group.groups.get(idx) {
                Some(child) => {
                    trail.push(child.name.clone());
                    group = child;
                }
                None => break,
            }
        }
        trail
    }
}

impl EntryStore for Database {
    fn entry(&self, entry: &EntryPath) -> Option<&Entry> {
        self.entry_at(entry)
    }
}

impl CredentialSource for Database {
    type GroupRef = GroupPath;
    type EntryRef = EntryPath;

    fn list(&self, path: &GroupPath) -> Result<Listing<GroupPath, EntryPath>, SourceError> {
        let group = self
            .group_at(path)
            .ok_or_else(|| SourceError::MissingGroup(format!("{:?}", path.0)))?;
        let trail = self.trail(path);

        let groups = group
            .groups
            .iter()
            .enumerate()
            .map(|(idx, child)| {
                let mut indices = path.0.clone();
                indices.push(idx);
                let mut item_path = trail.clone();
                item_path.push(child.name.clone());
                SourceItem {
                    key: child.uuid.clone(),
                    name: child.name.clone(),
                    path: item_path,
                    reference: GroupPath(indices),
                }
            })
            .collect();

        let entries = group
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let mut item_path = trail.clone();
                item_path.push(entry.title.clone());
                SourceItem {
                    key: entry.uuid.clone(),
                    name: entry.title.clone(),
                    path: item_path,
                    reference: EntryPath {
                        group: path.clone(),
                        index,
                    },
                }
            })
            .collect();

        Ok(Listing { groups, entries })
    }
}
