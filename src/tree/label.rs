//! Row labels of the navigator and their memo.

use std::rc::Rc;

use hashlink::LruCache;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::node::{Node, NodeId};

const GLYPH_OPEN_GROUP: &str = "📂";
const GLYPH_CLOSED_GROUP: &str = "📁";
const GLYPH_ENTRY: &str = "📄";

pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    OpenGroup,
    ClosedGroup,
    Entry,
}

impl LabelKind {
    pub fn of<G, E>(node: &Node<G, E>) -> Self {
        match node.group() {
            Some(group) if group.is_expanded() => Self::OpenGroup,
            Some(_) => Self::ClosedGroup,
            None => Self::Entry,
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            Self::OpenGroup => GLYPH_OPEN_GROUP,
            Self::ClosedGroup => GLYPH_CLOSED_GROUP,
            Self::Entry => GLYPH_ENTRY,
        }
    }
}

/// Everything a label depends on. Two renders with equal keys produce the
/// same label, so the key doubles as the memo key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelKey {
    pub node: NodeId,
    pub kind: LabelKind,
    pub hover: bool,
    pub cursor: bool,
    pub focus: bool,
}

/// Formats one label. Pure: output depends on the arguments only.
pub fn render_label(text: &str, kind: LabelKind, hover: bool, cursor: bool, focus: bool) -> Line<'static> {
    let mut spans = match kind {
        LabelKind::OpenGroup | LabelKind::ClosedGroup => vec![Span::styled(
            text.to_string(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )],
        LabelKind::Entry => entry_spans(text),
    };

    if hover {
        spans = spans
            .into_iter()
            .map(|span| span.patch_style(Style::default().add_modifier(Modifier::UNDERLINED)))
            .collect();
    }
    if cursor && focus {
        spans = spans
            .into_iter()
            .map(|span| span.patch_style(Style::default().add_modifier(Modifier::REVERSED)))
            .collect();
    }

    let mut line = vec![Span::raw(format!("{} ", kind.glyph()))];
    line.extend(spans);
    Line::from(line)
}

fn entry_spans(text: &str) -> Vec<Span<'static>> {
    let base = Style::default().fg(Color::LightGreen);
    match extension_start(text) {
        Some(idx) => vec![
            Span::styled(text[..idx].to_string(), base),
            Span::styled(text[idx..].to_string(), base.fg(Color::Green)),
        ],
        None => vec![Span::styled(text.to_string(), base)],
    }
}

/// Byte offset of the last `.` when it starts a non-empty suffix and is not
/// the first character.
fn extension_start(text: &str) -> Option<usize> {
    let idx = text.rfind('.')?;
    (idx > 0 && idx + 1 < text.len()).then_some(idx)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStats {
    pub hits: u64,
    /// Times the formatter actually ran.
    pub misses: u64,
}

/// Bounded least-recently-used memo of rendered labels.
pub struct LabelCache {
    entries: LruCache<LabelKey, Rc<Line<'static>>>,
    stats: LabelStats,
}

impl LabelCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(capacity.max(1)),
            stats: LabelStats::default(),
        }
    }

    pub fn get_or_render(
        &mut self,
        key: LabelKey,
        render: impl FnOnce() -> Line<'static>,
    ) -> Rc<Line<'static>> {
        if let Some(line) = self.entries.get(&key) {
            self.stats.hits += 1;
            return Rc::clone(line);
        }
        self.stats.misses += 1;
        let line = Rc::new(render());
        self.entries.insert(key, Rc::clone(&line));
        line
    }

    /// Label of `node` under the given interaction flags.
    pub fn label<G, E>(&mut self, node: &Node<G, E>, hover: bool, cursor: bool, focus: bool) -> Rc<Line<'static>> {
        let kind = LabelKind::of(node);
        let key = LabelKey {
            node: node.id(),
            kind,
            hover,
            cursor,
            focus,
        };
        self.get_or_render(key, || render_label(node.label(), kind, hover, cursor, focus))
    }

    pub fn stats(&self) -> LabelStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

impl Default for LabelCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
