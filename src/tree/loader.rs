use log::debug;

use crate::source::{CredentialSource, SourceItem};

use super::error::TreeError;
use super::node::{NewKind, NewNode};

/// Label shown for items without a name.
pub const PLACEHOLDER_LABEL: &str = "--";

pub type Children<S> =
    Vec<NewNode<<S as CredentialSource>::GroupRef, <S as CredentialSource>::EntryRef>>;

/// Fetches the immediate children of `group` with a single call to the
/// source: sub-groups first, then entries, each in source order.
///
/// `parent_path` is only used to describe failures.
pub fn load_children<S: CredentialSource>(
    source: &S,
    group: &S::GroupRef,
    parent_path: &str,
) -> Result<Children<S>, TreeError> {
    let listing = source
        .list(group)
        .map_err(|e| TreeError::source_unavailable(parent_path, e))?;
    debug!(
        "loaded '{parent_path}': {} group(s), {} entr(ies)",
        listing.groups.len(),
        listing.entries.len()
    );

    let groups = listing
        .groups
        .into_iter()
        .map(|item| new_node(item, NewKind::Group));
    let entries = listing
        .entries
        .into_iter()
        .map(|item| new_node(item, NewKind::Leaf));
    Ok(groups.chain(entries).collect())
}

fn new_node<R, G, E>(item: SourceItem<R>, kind: impl FnOnce(R) -> NewKind<G, E>) -> NewNode<G, E> {
    NewNode {
        key: item.key,
        label: display_name(item.name.as_deref()),
        path: join_path(&item.path),
        kind: kind(item.reference),
    }
}

pub fn display_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => PLACEHOLDER_LABEL.to_string(),
    }
}

/// Joins ancestry segments with `/`; unnamed segments become empty.
pub fn join_path(segments: &[Option<String>]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("/")
}
