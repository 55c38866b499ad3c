use std::fs::File;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser as _;
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, error, info, warn};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use regex::Regex;
use simplelog::WriteLogger;

use crate::cli::{Cli, Command, LogLevel};
use crate::models::Database;
use crate::source::EntryStore;
use crate::storage::{config_path, load_config, load_database, log_path, Config};
use crate::tree::{InputEvent, MountRoot, NavKey, Response, TreeError, TreeNavigator, PLACEHOLDER_LABEL};
use crate::ui::{copy_to_clipboard, draw, EntryDetail, Sidebar, ViewState};

const STATUS_MESSAGE_SECS: u64 = 2;
const NAV_HINT: &str =
    "↑/↓ move | ←/→ fold | Enter open | Tab focus | p/u/l copy | Ctrl+h reveal | b sidebar | q quit";
const IDLE_MESSAGE: &str = "Idle timeout reached. Exiting...";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;
    debug!("parsed CLI arguments: {cli:?}");

    let cfg_path = config_path(cli.config.as_deref())?;
    let config = load_config(&cfg_path)?;
    let db_path = cli
        .database
        .clone()
        .or_else(|| config.database_path.clone())
        .ok_or_else(|| {
            anyhow!(
                "No database configured. Set \"database_path\" in {} or pass --database",
                cfg_path.display()
            )
        })?;
    let mut database = load_database(&db_path)?;

    match cli.command {
        Some(Command::Search { pattern }) => {
            let lines = search(&database, &pattern)?;
            database.zeroize_secrets();
            if lines.is_empty() {
                return Err(anyhow!("No entries found with \"{pattern}\" in the database"));
            }
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        None => run_viewer(database, config),
    }
}

fn init_logging(level: LogLevel) -> Result<()> {
    let filter = level.to_level_filter();
    if filter == log::LevelFilter::Off {
        return Ok(());
    }
    let path = log_path()?;
    let log_file =
        File::create(&path).with_context(|| format!("Failed to create log file {}", path.display()))?;
    // a second init (tests, embedding) keeps the first logger
    let _ = WriteLogger::init(filter, simplelog::Config::default(), log_file);
    Ok(())
}

/// `group | title | password` for every entry whose title matches
/// `.*PATTERN.*`.
pub fn search(database: &Database, pattern: &str) -> Result<Vec<String>> {
    let re = Regex::new(&format!(".*{pattern}.*"))
        .with_context(|| format!("Invalid search pattern \"{pattern}\""))?;
    Ok(database
        .entries()
        .into_iter()
        .filter(|(_, entry)| re.is_match(entry.title.as_deref().unwrap_or("")))
        .map(|(trail, entry)| {
            format!(
                "/{} | {} | {}",
                trail.join("/"),
                entry.title.as_deref().unwrap_or(PLACEHOLDER_LABEL),
                entry.password.as_deref().unwrap_or("")
            )
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Host state around the navigator: detail panel, footer and notification.
pub struct Viewer<S: EntryStore> {
    navigator: TreeNavigator<S>,
    config: Config,
    detail: Option<EntryDetail>,
    reveal_password: bool,
    show_sidebar: bool,
    status: String,
    status_until: Option<Instant>,
    notification: Option<String>,
}

impl Viewer<Database> {
    /// Mounts the navigator on the database root.
    pub fn open(database: Database, config: Config) -> Self {
        let root = MountRoot {
            key: database.root.uuid.clone(),
            label: database
                .root
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Root".to_string()),
            reference: database.root_ref(),
        };
        Self::new(database, root, config)
    }

    /// Drops the tree and wipes the secrets of the database.
    fn close(self) {
        let Viewer {
            navigator, detail, ..
        } = self;
        drop(detail);
        let mut database = navigator.into_source();
        database.zeroize_secrets();
    }
}

impl<S: EntryStore> Viewer<S> {
    /// A root that fails to load is reported through the notification
    /// overlay; activating the root retries it.
    pub fn new(source: S, root: MountRoot<S::GroupRef>, config: Config) -> Self {
        let mut navigator = TreeNavigator::mount(source, root, config.label_cache_capacity);
        let notification = navigator.take_mount_error().map(|e| e.to_string());
        let mut viewer = Self {
            navigator,
            show_sidebar: config.show_sidebar,
            config,
            detail: None,
            reveal_password: false,
            status: NAV_HINT.to_string(),
            status_until: None,
            notification,
        };
        viewer.dispatch(InputEvent::Focus(viewer.show_sidebar));
        viewer
    }

    pub fn navigator(&self) -> &TreeNavigator<S> {
        &self.navigator
    }

    pub fn detail(&self) -> Option<&EntryDetail> {
        self.detail.as_ref()
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_sidebar(&self) -> bool {
        self.show_sidebar
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_until = Some(Instant::now() + Duration::from_secs(STATUS_MESSAGE_SECS));
    }

    fn expire_status(&mut self) {
        if let Some(until) = self.status_until {
            if Instant::now() >= until {
                self.status = NAV_HINT.to_string();
                self.status_until = None;
            }
        }
    }

    fn render(&mut self, f: &mut Frame<'_>) {
        let view = ViewState {
            detail: self.detail.as_ref(),
            reveal_password: self.reveal_password,
            sidebar: self.show_sidebar.then(|| Sidebar {
                position: self.config.sidebar_position,
                width: self.config.sidebar_width,
            }),
            status: self.status.clone(),
            notification: self.notification.clone(),
        };
        draw(f, &view, &mut self.navigator);
    }

    /// Forwards `event` to the navigator and applies its response.
    pub fn dispatch(&mut self, event: InputEvent) {
        match self.navigator.handle(event) {
            Ok(Response::Selected(selection)) => {
                let detail = self
                    .navigator
                    .store()
                    .get(selection.node)
                    .ok()
                    .and_then(|node| node.entry())
                    .and_then(|entry| self.navigator.source().entry(entry))
                    .map(|entry| EntryDetail::new(entry, &selection.path));
                match detail {
                    Some(detail) => {
                        self.detail = Some(detail);
                        self.reveal_password = false;
                        info!("showing entry {}", selection.path);
                    }
                    None => {
                        warn!("selected entry {} is missing from the database", selection.key);
                        self.set_status("Entry no longer exists");
                    }
                }
            }
            Ok(Response::Redraw | Response::Ignored) => {}
            Err(e @ TreeError::SourceUnavailable { .. }) => {
                warn!("{e}");
                self.notification = Some(e.to_string());
            }
            Err(e) => {
                error!("navigator rejected {event:?}: {e}");
                self.set_status(format!("Navigation error: {e}"));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }
        if self.notification.is_some() && key.code == KeyCode::Esc {
            self.notification = None;
            return Flow::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('h') | KeyCode::Char('H') if ctrl => {
                self.reveal_password = !self.reveal_password;
                self.set_status(if self.reveal_password {
                    "Password visibility: visible"
                } else {
                    "Password visibility: hidden"
                });
            }
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('b') => {
                self.show_sidebar = !self.show_sidebar;
                self.dispatch(InputEvent::Focus(self.show_sidebar));
                if !self.show_sidebar {
                    self.dispatch(InputEvent::PointerLeave);
                }
            }
            KeyCode::Char('p') => self.copy_field("password", |d| &d.password),
            KeyCode::Char('u') => self.copy_field("username", |d| &d.username),
            KeyCode::Char('l') => self.copy_field("URL", |d| &d.url),
            KeyCode::Tab if self.show_sidebar => {
                let focus = !self.navigator.has_focus();
                self.dispatch(InputEvent::Focus(focus));
            }
            code => {
                if let Some(nav) = nav_key(code) {
                    if self.show_sidebar && self.navigator.has_focus() {
                        self.dispatch(InputEvent::Key(nav));
                    }
                }
            }
        }
        Flow::Continue
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !self.show_sidebar {
            return;
        }
        let target = self.navigator.node_at(mouse.column, mouse.row);
        match (mouse.kind, target) {
            (MouseEventKind::Moved, Some(id)) => self.dispatch(InputEvent::PointerMove(id)),
            (MouseEventKind::Moved, None) => self.dispatch(InputEvent::PointerLeave),
            (MouseEventKind::Down(MouseButton::Left), Some(id)) => {
                self.dispatch(InputEvent::Focus(true));
                self.dispatch(InputEvent::Click(id));
            }
            _ => {}
        }
    }

    fn copy_field(&mut self, name: &str, field: impl Fn(&EntryDetail) -> &String) {
        let Some(detail) = self.detail.as_ref() else {
            self.set_status("No entry selected");
            return;
        };
        let value = field(detail).clone();
        let title = detail.title.clone();
        match copy_to_clipboard(&value, self.config.clipboard_lifetime_secs) {
            Ok(()) => self.set_status(format!(
                "Copied {name} of '{title}' to clipboard for {}s",
                self.config.clipboard_lifetime_secs
            )),
            Err(e) => {
                warn!("clipboard copy failed: {e}");
                self.set_status(format!("Clipboard error: {e}"));
            }
        }
    }

}

fn nav_key(code: KeyCode) -> Option<NavKey> {
    match code {
        KeyCode::Up => Some(NavKey::Up),
        KeyCode::Down => Some(NavKey::Down),
        KeyCode::Left => Some(NavKey::Left),
        KeyCode::Right => Some(NavKey::Right),
        KeyCode::Home => Some(NavKey::Home),
        KeyCode::End => Some(NavKey::End),
        KeyCode::Enter | KeyCode::Char(' ') => Some(NavKey::Activate),
        _ => None,
    }
}

fn run_viewer(database: Database, config: Config) -> Result<()> {
    let idle_timeout = Duration::from_secs(config.idle_timeout_secs);
    let mut viewer = Viewer::open(database, config);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange,
        crossterm::cursor::Hide
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut last_activity = Instant::now();

    let result = (|| -> Result<()> {
        loop {
            viewer.expire_status();

            if !idle_timeout.is_zero() && last_activity.elapsed() >= idle_timeout {
                viewer.status = IDLE_MESSAGE.to_string();
                viewer.status_until = None;
                terminal.draw(|f| viewer.render(f))?;
                info!("idle timeout reached");
                break;
            }

            terminal.draw(|f| viewer.render(f))?;

            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key_event) => {
                        last_activity = Instant::now();
                        if viewer.handle_key(key_event) == Flow::Quit {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => {
                        last_activity = Instant::now();
                        viewer.handle_mouse(mouse);
                    }
                    Event::FocusGained => viewer.dispatch(InputEvent::Focus(viewer.show_sidebar)),
                    Event::FocusLost => viewer.dispatch(InputEvent::Focus(false)),
                    _ => {}
                }
            }
        }
        Ok(())
    })();

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )
    .ok();
    terminal.show_cursor().ok();

    viewer.close();
    result
}
