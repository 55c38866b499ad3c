//! Arena of tree nodes plus the navigator's interaction state.

use std::fmt;

use super::error::TreeError;

/// Stable handle of a node inside one [`NodeStore`].
///
/// Ids are only minted by the store, so an id obtained from a store always
/// resolves in that store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Expansion state carried only by group nodes.
#[derive(Debug, Clone)]
pub struct GroupState<G> {
    source: G,
    children: Vec<NodeId>,
    loaded: bool,
    expanded: bool,
}

impl<G> GroupState<G> {
    fn new(source: G) -> Self {
        Self {
            source,
            children: Vec::new(),
            loaded: false,
            expanded: false,
        }
    }

    pub fn source(&self) -> &G {
        &self.source
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind<G, E> {
    Group(GroupState<G>),
    Leaf { source: E },
}

#[derive(Debug, Clone)]
pub struct Node<G, E> {
    id: NodeId,
    key: String,
    label: String,
    path: String,
    kind: NodeKind<G, E>,
}

impl<G, E> Node<G, E> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Identity of the underlying source item (entry or group uuid).
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &NodeKind<G, E> {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn group(&self) -> Option<&GroupState<G>> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Leaf { .. } => None,
        }
    }

    fn group_mut(&mut self) -> Option<&mut GroupState<G>> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn entry(&self) -> Option<&E> {
        match &self.kind {
            NodeKind::Leaf { source } => Some(source),
            NodeKind::Group(_) => None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.group().is_some_and(GroupState::is_expanded)
    }

    pub fn is_loaded(&self) -> bool {
        self.group().is_some_and(GroupState::is_loaded)
    }

    pub fn children(&self) -> &[NodeId] {
        self.group().map(GroupState::children).unwrap_or(&[])
    }
}

/// What the loader hands over for a node that is not in the arena yet.
#[derive(Debug, Clone)]
pub struct NewNode<G, E> {
    pub key: String,
    pub label: String,
    pub path: String,
    pub kind: NewKind<G, E>,
}

#[derive(Debug, Clone)]
pub enum NewKind<G, E> {
    Group(G),
    Leaf(E),
}

/// A row of the flattened, currently visible tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub id: NodeId,
    pub depth: u16,
}

#[derive(Debug)]
pub struct NodeStore<G, E> {
    nodes: Vec<Node<G, E>>,
    cursor: NodeId,
    hover: Option<NodeId>,
    focus: bool,
}

impl<G, E> NodeStore<G, E> {
    /// Creates a store holding a single, unloaded root group.
    pub fn new(key: impl Into<String>, label: impl Into<String>, path: impl Into<String>, source: G) -> Self {
        let root = Node {
            id: NodeId(0),
            key: key.into(),
            label: label.into(),
            path: path.into(),
            kind: NodeKind::Group(GroupState::new(source)),
        };
        Self {
            nodes: vec![root],
            cursor: NodeId(0),
            hover: None,
            focus: false,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node<G, E>, TreeError> {
        self.nodes.get(id.0).ok_or(TreeError::NotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node<G, E>, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::NotFound(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<G, E>> {
        self.nodes.iter()
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn hover(&self) -> Option<NodeId> {
        self.hover
    }

    pub fn has_focus(&self) -> bool {
        self.focus
    }

    /// Returns whether the state changed. Leaves are left untouched.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<bool, TreeError> {
        let node = self.get_mut(id)?;
        let Some(group) = node.group_mut() else {
            return Ok(false);
        };
        let changed = group.expanded != expanded;
        group.expanded = expanded;
        Ok(changed)
    }

    pub fn set_hover(&mut self, id: Option<NodeId>) -> Result<(), TreeError> {
        if let Some(id) = id {
            self.check_reference(id)?;
        }
        self.hover = id;
        Ok(())
    }

    pub fn set_cursor(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check_reference(id)?;
        self.cursor = id;
        Ok(())
    }

    pub fn set_focus(&mut self, focus: bool) {
        self.focus = focus;
    }

    /// Appends `children` under `parent` in the given order and marks the
    /// parent loaded. A parent is loaded at most once.
    pub fn attach_children(
        &mut self,
        parent: NodeId,
        children: Vec<NewNode<G, E>>,
    ) -> Result<Vec<NodeId>, TreeError> {
        let first = self.nodes.len();
        let ids: Vec<NodeId> = (first..first + children.len()).map(NodeId).collect();

        let group = self
            .get_mut(parent)?
            .group_mut()
            .ok_or(TreeError::NotAGroup(parent))?;
        if group.loaded {
            return Err(TreeError::AlreadyLoaded(parent));
        }
        group.children.extend_from_slice(&ids);
        group.loaded = true;

        for (id, child) in ids.iter().zip(children) {
            let kind = match child.kind {
                NewKind::Group(source) => NodeKind::Group(GroupState::new(source)),
                NewKind::Leaf(source) => NodeKind::Leaf { source },
            };
            self.nodes.push(Node {
                id: *id,
                key: child.key,
                label: child.label,
                path: child.path,
                kind,
            });
        }
        Ok(ids)
    }

    /// Depth-first list of the nodes whose ancestors are all expanded,
    /// starting with the root.
    pub fn visible_rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut stack = vec![Row { id: self.root(), depth: 0 }];
        while let Some(row) = stack.pop() {
            rows.push(row);
            let node = &self.nodes[row.id.0];
            if node.is_expanded() {
                stack.extend(node.children().iter().rev().map(|&id| Row {
                    id,
                    depth: row.depth + 1,
                }));
            }
        }
        rows
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.children().contains(&id))
            .map(Node::id)
    }

    /// Whether `id` lies strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if !self.nodes[parent.0].is_expanded() {
                return false;
            }
            current = parent;
        }
        current == self.root()
    }

    fn check_reference(&self, id: NodeId) -> Result<(), TreeError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(TreeError::InvalidReference(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Store = NodeStore<&'static str, &'static str>;

    fn group(label: &str) -> NewNode<&'static str, &'static str> {
        NewNode {
            key: format!("g-{label}"),
            label: label.to_string(),
            path: label.to_string(),
            kind: NewKind::Group("group"),
        }
    }

    fn leaf(label: &str) -> NewNode<&'static str, &'static str> {
        NewNode {
            key: format!("e-{label}"),
            label: label.to_string(),
            path: label.to_string(),
            kind: NewKind::Leaf("entry"),
        }
    }

    fn store() -> Store {
        NodeStore::new("root", "Root", "/", "root")
    }

    #[test]
    fn test_attach_children_marks_parent_loaded_and_keeps_order() {
        let mut store = store();
        let root = store.root();
        let ids = store
            .attach_children(root, vec![group("Work"), leaf("Wifi")])
            .expect("attach");

        let root_node = store.get(root).expect("root");
        assert!(root_node.is_loaded());
        assert_eq!(root_node.children(), ids.as_slice());
        assert_eq!(store.get(ids[0]).expect("work").label(), "Work");
        assert_eq!(store.get(ids[1]).expect("wifi").label(), "Wifi");
    }

    #[test]
    fn test_attach_children_twice_is_rejected() {
        let mut store = store();
        let root = store.root();
        store.attach_children(root, vec![leaf("a")]).expect("first attach");

        let second = store.attach_children(root, vec![leaf("b")]);

        assert_eq!(second, Err(TreeError::AlreadyLoaded(root)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(root).expect("root").children().len(), 1);
    }

    #[test]
    fn test_attach_children_to_leaf_is_rejected() {
        let mut store = store();
        let ids = store.attach_children(store.root(), vec![leaf("a")]).expect("attach");

        let result = store.attach_children(ids[0], vec![leaf("b")]);

        assert_eq!(result, Err(TreeError::NotAGroup(ids[0])));
    }

    #[test]
    fn test_set_expanded_on_leaf_is_noop() {
        let mut store = store();
        let ids = store.attach_children(store.root(), vec![leaf("a")]).expect("attach");

        assert_eq!(store.set_expanded(ids[0], true), Ok(false));
        let node = store.get(ids[0]).expect("leaf");
        assert!(!node.is_expanded());
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_set_expanded_is_idempotent() {
        let mut store = store();
        let root = store.root();

        assert_eq!(store.set_expanded(root, true), Ok(true));
        assert_eq!(store.set_expanded(root, true), Ok(false));
        assert!(store.get(root).expect("root").is_expanded());
    }

    #[test]
    fn test_hover_and_cursor_reject_unknown_ids() {
        let mut store = store();
        let stranger = NodeId(42);

        assert_eq!(store.set_hover(Some(stranger)), Err(TreeError::InvalidReference(stranger)));
        assert_eq!(store.set_cursor(stranger), Err(TreeError::InvalidReference(stranger)));
        assert_eq!(store.hover(), None);
        assert_eq!(store.cursor(), store.root());
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let store = store();
        assert!(matches!(store.get(NodeId(7)), Err(TreeError::NotFound(_))));
    }

    #[test]
    fn test_every_handed_out_id_resolves() {
        let mut store = store();
        let root = store.root();
        let top = store
            .attach_children(root, vec![group("a"), group("b"), leaf("c")])
            .expect("attach root");
        let nested = store
            .attach_children(top[1], vec![leaf("d"), leaf("e")])
            .expect("attach nested");
        store.set_expanded(root, true).expect("expand root");
        store.set_expanded(top[1], true).expect("expand b");

        for id in top.iter().chain(nested.iter()).copied().chain([root]) {
            assert!(store.get(id).is_ok());
        }
        for row in store.visible_rows() {
            assert!(store.get(row.id).is_ok());
        }
        for node in store.nodes() {
            for child in node.children() {
                assert!(store.get(*child).is_ok());
            }
        }
    }

    #[test]
    fn test_visible_rows_skip_collapsed_subtrees() {
        let mut store = store();
        let root = store.root();
        let top = store
            .attach_children(root, vec![group("a"), leaf("b")])
            .expect("attach root");
        let nested = store.attach_children(top[0], vec![leaf("c")]).expect("attach a");
        store.set_expanded(root, true).expect("expand root");

        let ids: Vec<NodeId> = store.visible_rows().iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![root, top[0], top[1]]);
        assert!(!store.is_visible(nested[0]));

        store.set_expanded(top[0], true).expect("expand a");
        let rows = store.visible_rows();
        let ids: Vec<NodeId> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![root, top[0], nested[0], top[1]]);
        assert_eq!(rows[2].depth, 2);
        assert!(store.is_visible(nested[0]));
        assert!(store.is_descendant(root, nested[0]));
        assert!(!store.is_descendant(top[1], nested[0]));
        assert_eq!(store.parent_of(nested[0]), Some(top[0]));
    }
}
