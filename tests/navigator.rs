use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ratatui::{backend::TestBackend, Terminal};
use vault_navigator::source::{CredentialSource, Listing, SourceError, SourceItem};
use vault_navigator::tree::{InputEvent, MountRoot, NavKey, NodeId, Response, TreeError, TreeNavigator};

/// Groups are numbered; entries carry their title as reference.
#[derive(Default)]
struct Counting {
    listings: HashMap<u32, Listing<u32, String>>,
    calls: RefCell<HashMap<u32, usize>>,
    broken: Cell<Option<u32>>,
}

impl Counting {
    fn calls(&self, group: u32) -> usize {
        self.calls.borrow().get(&group).copied().unwrap_or(0)
    }
}

impl CredentialSource for Counting {
    type GroupRef = u32;
    type EntryRef = String;

    fn list(&self, group: &u32) -> Result<Listing<u32, String>, SourceError> {
        *self.calls.borrow_mut().entry(*group).or_default() += 1;
        if self.broken.get() == Some(*group) {
            return Err(SourceError::Unavailable("database locked".into()));
        }
        Ok(self.listings.get(group).cloned().unwrap_or_default())
    }
}

fn group(id: u32, name: &str, trail: &[&str]) -> SourceItem<u32> {
    let mut path: Vec<Option<String>> = trail.iter().map(|s| Some(s.to_string())).collect();
    path.push(Some(name.to_string()));
    SourceItem {
        key: format!("g{id}"),
        name: Some(name.to_string()),
        path,
        reference: id,
    }
}

fn entry(title: &str, trail: &[&str]) -> SourceItem<String> {
    let mut path: Vec<Option<String>> = trail.iter().map(|s| Some(s.to_string())).collect();
    path.push(Some(title.to_string()));
    SourceItem {
        key: format!("e-{title}"),
        name: Some(title.to_string()),
        path,
        reference: title.to_string(),
    }
}

/// Root: group Work (1) and entry Wifi. Work: entry vpn.corp.
fn work_and_wifi() -> Rc<Counting> {
    let mut source = Counting::default();
    source.listings.insert(
        0,
        Listing {
            groups: vec![group(1, "Work", &[])],
            entries: vec![entry("Wifi", &[])],
        },
    );
    source.listings.insert(
        1,
        Listing {
            groups: vec![],
            entries: vec![entry("vpn.corp", &["Work"])],
        },
    );
    Rc::new(source)
}

fn mount(source: &Rc<Counting>) -> TreeNavigator<Rc<Counting>> {
    let root = MountRoot {
        key: "root".to_string(),
        label: "Root".to_string(),
        reference: 0,
    };
    TreeNavigator::mount(Rc::clone(source), root, 64)
}

fn labels(navigator: &TreeNavigator<Rc<Counting>>) -> Vec<String> {
    navigator
        .rows()
        .iter()
        .map(|row| {
            navigator
                .store()
                .get(row.id)
                .expect("visible row resolves")
                .label()
                .to_string()
        })
        .collect()
}

fn find(navigator: &TreeNavigator<Rc<Counting>>, label: &str) -> NodeId {
    navigator
        .store()
        .nodes()
        .find(|node| node.label() == label)
        .map(|node| node.id())
        .expect("node with label")
}

#[test]
fn test_mount_lists_groups_before_entries() {
    let source = work_and_wifi();

    let navigator = mount(&source);

    assert_eq!(labels(&navigator), ["Root", "Work", "Wifi"]);
    assert_eq!(source.calls(0), 1);
    assert_eq!(source.calls(1), 0);
}

#[test]
fn test_unreachable_root_is_retried_on_click() {
    let source = work_and_wifi();
    source.broken.set(Some(0));

    let mut navigator = mount(&source);

    let err = navigator.take_mount_error().expect("root load error");
    assert!(matches!(err, TreeError::SourceUnavailable { .. }));
    assert_eq!(labels(&navigator), ["Root"]);
    let root = navigator.store().root();
    assert!(!navigator.store().get(root).expect("root").is_loaded());

    source.broken.set(None);
    let response = navigator.handle(InputEvent::Click(root)).expect("retry root");

    assert_eq!(response, Response::Redraw);
    assert_eq!(labels(&navigator), ["Root", "Work", "Wifi"]);
    assert_eq!(source.calls(0), 2);
}

#[test]
fn test_group_loads_once_across_toggles() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let work = find(&navigator, "Work");

    navigator.handle(InputEvent::Click(work)).expect("expand");
    assert_eq!(labels(&navigator), ["Root", "Work", "vpn.corp", "Wifi"]);

    navigator.handle(InputEvent::Click(work)).expect("collapse");
    assert_eq!(labels(&navigator), ["Root", "Work", "Wifi"]);

    navigator.handle(InputEvent::Click(work)).expect("expand again");
    assert_eq!(labels(&navigator), ["Root", "Work", "vpn.corp", "Wifi"]);
    assert_eq!(source.calls(1), 1);
}

#[test]
fn test_activating_entry_selects_without_changing_expansion() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let wifi = find(&navigator, "Wifi");
    let rows_before = navigator.rows();

    let response = navigator.handle(InputEvent::Click(wifi)).expect("select");

    let Response::Selected(selection) = response else {
        panic!("expected a selection, got {response:?}");
    };
    assert_eq!(selection.node, wifi);
    assert_eq!(selection.key, "e-Wifi");
    assert_eq!(selection.path, "Wifi");
    assert_eq!(navigator.rows(), rows_before);
    assert_eq!(navigator.store().cursor(), wifi);
}

#[test]
fn test_nested_entry_path_is_joined() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let work = find(&navigator, "Work");
    navigator.handle(InputEvent::Click(work)).expect("expand");

    let vpn = find(&navigator, "vpn.corp");
    assert_eq!(navigator.store().get(vpn).expect("vpn").path(), "Work/vpn.corp");
}

#[test]
fn test_failed_load_can_be_retried() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let work = find(&navigator, "Work");
    source.broken.set(Some(1));

    let err = navigator.handle(InputEvent::Click(work)).expect_err("load fails");

    assert!(matches!(err, TreeError::SourceUnavailable { .. }));
    assert!(err.is_recoverable());
    let node = navigator.store().get(work).expect("work");
    assert!(!node.is_loaded());
    assert!(!node.is_expanded());

    source.broken.set(None);
    navigator.handle(InputEvent::Click(work)).expect("retry");
    assert_eq!(labels(&navigator), ["Root", "Work", "vpn.corp", "Wifi"]);
    assert_eq!(source.calls(1), 2);
}

#[test]
fn test_keyboard_walk_does_not_wrap() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let root = navigator.store().root();

    let response = navigator.handle(InputEvent::Key(NavKey::Up)).expect("up at top");
    assert_eq!(response, Response::Ignored);
    assert_eq!(navigator.store().cursor(), root);

    navigator.handle(InputEvent::Key(NavKey::End)).expect("end");
    let response = navigator.handle(InputEvent::Key(NavKey::Down)).expect("down at bottom");
    assert_eq!(response, Response::Ignored);
    assert_eq!(navigator.store().cursor(), find(&navigator, "Wifi"));
}

#[test]
fn test_collapse_moves_cursor_out_of_hidden_subtree() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let work = find(&navigator, "Work");
    navigator.handle(InputEvent::Click(work)).expect("expand");
    let vpn = find(&navigator, "vpn.corp");
    navigator.handle(InputEvent::Click(vpn)).expect("select vpn");

    assert_eq!(navigator.store().cursor(), vpn);

    navigator.handle(InputEvent::Click(work)).expect("collapse");

    assert_eq!(navigator.store().cursor(), work);
    assert!(!navigator.store().is_visible(vpn));
}

#[test]
fn test_labels_are_memoized_until_state_changes() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let wifi = find(&navigator, "Wifi");

    let first = navigator.label(wifi).expect("label");
    let again = navigator.label(wifi).expect("label");
    assert!(Rc::ptr_eq(&first, &again));

    navigator.handle(InputEvent::PointerMove(wifi)).expect("hover");
    let hovered = navigator.label(wifi).expect("label");
    assert!(!Rc::ptr_eq(&first, &hovered));

    navigator.handle(InputEvent::PointerLeave).expect("leave");
    let back = navigator.label(wifi).expect("label");
    assert!(Rc::ptr_eq(&first, &back));
}

#[test]
fn test_pointer_hits_rendered_rows() {
    let source = work_and_wifi();
    let mut navigator = mount(&source);
    let mut terminal = Terminal::new(TestBackend::new(30, 10)).expect("Failed to create terminal");

    terminal
        .draw(|f| navigator.render(f, f.size()))
        .expect("Failed to draw");

    // one border row above the first item
    assert_eq!(navigator.node_at(2, 1), Some(navigator.store().root()));
    assert_eq!(navigator.node_at(2, 2), Some(find(&navigator, "Work")));
    assert_eq!(navigator.node_at(2, 3), Some(find(&navigator, "Wifi")));
    assert_eq!(navigator.node_at(2, 4), None);
    assert_eq!(navigator.node_at(0, 0), None);
}
