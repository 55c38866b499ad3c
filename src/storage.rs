use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::models::Database;
use crate::tree::DEFAULT_CACHE_CAPACITY;

pub const APP_DIR: &str = "vaultnav";
pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_ENV: &str = "VAULTNAV_CONFIG_PATH";
pub const LOG_FILE: &str = "vaultnav.log";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SidebarPosition {
    #[default]
    Left,
    Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub sidebar_position: SidebarPosition,
    pub sidebar_width: u16,
    pub show_sidebar: bool,
    pub label_cache_capacity: usize,
    pub idle_timeout_secs: u64,
    pub clipboard_lifetime_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            sidebar_position: SidebarPosition::Left,
            sidebar_width: 48,
            show_sidebar: true,
            label_cache_capacity: DEFAULT_CACHE_CAPACITY,
            idle_timeout_secs: 120,
            clipboard_lifetime_secs: 20,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join(APP_DIR).join(CONFIG_FILE))
}

/// Picks the config file: explicit flag, then the environment, then the
/// default location under the home directory.
pub fn resolve_config_path(explicit: Option<&Path>, env: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match env {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => default_config_path(),
    }
}

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_config_path(explicit, std::env::var_os(CONFIG_ENV))
}

/// Reads the config, falling back to defaults when the file is missing.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let cfg: Config = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    debug!("loaded config from {}", path.display());
    Ok(cfg)
}

pub fn load_database(path: &Path) -> Result<Database> {
    if !path.is_file() {
        return Err(anyhow!(
            "Looks like the database does not exist. \
             Maybe you misspelled it, please check your config. \
             This is the path used: {}",
            path.display()
        ));
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read database {}", path.display()))?;
    let database: Database = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid database file {}", path.display()))?;
    info!("opened database {}", path.display());
    Ok(database)
}

pub fn log_path() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    let dir = base.join(APP_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir.join(LOG_FILE))
}
