//! Lazy-loading tree navigator over a [`CredentialSource`](crate::source::CredentialSource).

mod dispatch;
mod error;
mod label;
mod loader;
mod navigator;
mod node;

pub use dispatch::{Dispatcher, InputEvent, NavKey, Response, Selection, Store};
pub use error::TreeError;
pub use label::{render_label, LabelCache, LabelKey, LabelKind, LabelStats, DEFAULT_CACHE_CAPACITY};
pub use loader::{display_name, join_path, load_children, PLACEHOLDER_LABEL};
pub use navigator::{MountRoot, TreeNavigator};
pub use node::{GroupState, NewKind, NewNode, Node, NodeId, NodeKind, NodeStore, Row};
