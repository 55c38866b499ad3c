use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use arboard::Clipboard;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};
use ratatui::{
    prelude::*,
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::models::Entry;
use crate::source::CredentialSource;
use crate::storage::SidebarPosition;
use crate::tree::TreeNavigator;

const COLOR_SAND: Color = Color::Rgb(0xEB, 0xDB, 0xB2);
const COLOR_OLIVE: Color = Color::Rgb(0x98, 0x97, 0x1A);
const MASK: char = '•';

const LOAD_FAILED_TITLE: &str = "Load failed";
const OVERLAY_BORDER: Color = Color::Rgb(0xB3, 0x88, 0x45);
const OVERLAY_TITLE: Color = Color::Rgb(0xF0, 0xD8, 0xA8);
const OVERLAY_BG: Color = Color::Rgb(0x2A, 0x1C, 0x11);

fn centered_overlay_area(frame_size: Rect, lines: &[String]) -> Rect {
    let maxw = lines.iter().map(|s| s.chars().count()).max().unwrap_or(0) as u16 + 4;
    let maxh = lines.len() as u16 + 2;
    Rect::new(
        (frame_size.width.saturating_sub(maxw)) / 2,
        (frame_size.height.saturating_sub(maxh)) / 2,
        maxw.min(frame_size.width),
        maxh.min(frame_size.height),
    )
}

fn render_overlay(f: &mut Frame<'_>, lines: &[String]) {
    let area = centered_overlay_area(f.size(), lines);
    let paragraph = Paragraph::new(
        lines
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect::<Vec<Line>>(),
    )
    .style(Style::default().fg(COLOR_SAND).bg(OVERLAY_BG))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                LOAD_FAILED_TITLE,
                Style::default()
                    .fg(OVERLAY_TITLE)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(
                Style::default()
                    .fg(OVERLAY_BORDER)
                    .add_modifier(Modifier::BOLD),
            )
            .style(Style::default().bg(OVERLAY_BG)),
    );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// Fields of the entry shown in the detail panel, wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EntryDetail {
    pub path: String,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub expires: bool,
    pub notes: String,
}

impl EntryDetail {
    pub fn new(entry: &Entry, path: &str) -> Self {
        Self {
            path: path.to_string(),
            title: entry.title.clone().unwrap_or_default(),
            username: entry.username.clone().unwrap_or_default(),
            password: entry.password.clone().unwrap_or_default(),
            url: entry.url.clone().unwrap_or_default(),
            expires: entry.expires,
            notes: entry.notes.clone().unwrap_or_default(),
        }
    }

    /// Label/value pairs of the "Entry" table. The password stays masked
    /// unless `reveal` is set.
    pub fn rows(&self, reveal: bool) -> Vec<(&'static str, String)> {
        let password = if reveal {
            self.password.clone()
        } else {
            MASK.to_string().repeat(self.password.chars().count())
        };
        vec![
            ("Title", self.title.clone()),
            ("Username", self.username.clone()),
            ("Password", password),
            ("URL", self.url.clone()),
            ("Expires", if self.expires { "Yes" } else { "No" }.to_string()),
        ]
    }
}

pub struct Sidebar {
    pub position: SidebarPosition,
    pub width: u16,
}

pub struct ViewState<'a> {
    pub detail: Option<&'a EntryDetail>,
    pub reveal_password: bool,
    pub sidebar: Option<Sidebar>,
    pub status: String,
    pub notification: Option<String>,
}

/// Splits the body into (sidebar, detail) according to the sidebar dock.
pub fn body_layout(area: Rect, sidebar: Option<&Sidebar>) -> (Option<Rect>, Rect) {
    let Some(sidebar) = sidebar else {
        return (None, area);
    };
    let width = sidebar.width.min(area.width);
    let constraints = match sidebar.position {
        SidebarPosition::Left => [Constraint::Length(width), Constraint::Min(1)],
        SidebarPosition::Right => [Constraint::Min(1), Constraint::Length(width)],
    };
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    match sidebar.position {
        SidebarPosition::Left => (Some(body[0]), body[1]),
        SidebarPosition::Right => (Some(body[1]), body[0]),
    }
}

pub fn draw<S: CredentialSource>(f: &mut Frame<'_>, state: &ViewState, navigator: &mut TreeNavigator<S>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    let (sidebar_area, detail_area) = body_layout(layout[0], state.sidebar.as_ref());
    if let Some(area) = sidebar_area {
        navigator.render(f, area);
    }

    draw_detail(f, detail_area, state);

    let footer = Paragraph::new(state.status.clone()).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, layout[1]);

    if let Some(message) = &state.notification {
        let lines = vec![message.clone(), "".to_string(), "[Esc] dismiss".to_string()];
        render_overlay(f, &lines);
    }
}

fn draw_detail(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let Some(detail) = state.detail else {
        let empty = Paragraph::new("No entry selected.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Entry").borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };

    let (table_area, notes_area) = if detail.notes.is_empty() {
        (area, None)
    } else {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(13), Constraint::Min(3)])
            .split(area);
        (split[0], Some(split[1]))
    };

    let rows: Vec<Row> = detail
        .rows(state.reveal_password)
        .into_iter()
        .map(|(label, value)| {
            Row::new(vec![
                Line::from(Span::styled(label, Style::default().fg(COLOR_OLIVE).add_modifier(Modifier::BOLD))),
                Line::from(value),
            ])
            .bottom_margin(1)
        })
        .collect();
    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(1)])
        .column_spacing(2)
        .block(
            Block::default()
                .title(format!("Entry: {}", detail.path))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_SAND)),
        );
    f.render_widget(table, table_area);

    if let Some(area) = notes_area {
        let notes = Paragraph::new(detail.notes.clone())
            .wrap(Wrap { trim: false })
            .block(Block::default().title("Notes").borders(Borders::ALL));
        f.render_widget(notes, area);
    }
}

/// Copies `text` and clears the clipboard after `lifetime_secs`, unless
/// something else was copied in the meantime.
pub fn copy_to_clipboard(text: &str, lifetime_secs: u64) -> Result<()> {
    let mut clipboard = Clipboard::new().map_err(|e| anyhow!("Clipboard unavailable: {e}"))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| anyhow!("Failed to set clipboard: {e}"))?;
    let copied = Zeroizing::new(text.to_string());
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(lifetime_secs));
        let current = clipboard.get_text().ok().map(Zeroizing::new);
        if still_holds(current.as_deref().map(String::as_str), &copied) {
            let _ = clipboard.set_text(String::new());
        }
    });
    Ok(())
}

/// Whether the clipboard still contains what this copy put there.
fn still_holds(current: Option<&str>, copied: &str) -> bool {
    current == Some(copied)
}
