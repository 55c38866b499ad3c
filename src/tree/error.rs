use super::node::NodeId;

/// Errors raised by the navigator core.
///
/// Only `SourceUnavailable` is expected at runtime; the others signal a
/// broken contract between the store and its callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    NotFound(NodeId),

    #[error("node {0} is not part of this tree")]
    InvalidReference(NodeId),

    #[error("node {0} is an entry and cannot hold children")]
    NotAGroup(NodeId),

    #[error("children of node {0} were already loaded")]
    AlreadyLoaded(NodeId),

    #[error("could not load '{path}': {reason}")]
    SourceUnavailable { path: String, reason: String },
}

impl TreeError {
    pub fn source_unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the user can retry the action that produced this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::AlreadyLoaded(_))
    }
}
