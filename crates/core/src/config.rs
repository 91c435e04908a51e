//! Monitor configuration
//!
//! Loaded from TOML; every field has a default so a file only needs to name
//! what it changes. Command-line flags are applied on top by the caller.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names that are never reported
pub const DEFAULT_NOISE_NAMES: [&str; 3] = ["desktop.ini", "folder.jpg", "folder.gif"];

/// Audit log file name, relative to the monitored root
pub const DEFAULT_LOG_NAME: &str = "audit.log";

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory to monitor
    pub root: PathBuf,

    /// Audit log path (default: `<root>/audit.log`); relative paths are
    /// resolved against `root`
    pub log_file: Option<PathBuf>,

    /// JSON-lines export of file event records (default: none); relative
    /// paths are resolved against `root`
    pub json_log: Option<PathBuf>,

    /// Debounce window in milliseconds (default: 2000)
    pub window_ms: u64,

    /// Flush tick in milliseconds (default: 500)
    pub tick_ms: u64,

    /// File names to ignore, compared case-insensitively
    pub noise_names: Vec<String>,

    /// Enabled event sources
    pub sources: SourceConfig,

    /// Emit unsettled bursts when the monitor stops (default: false)
    pub drain_on_shutdown: bool,

    /// Colorize console output (default: true)
    pub color: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            log_file: None,
            json_log: None,
            window_ms: 2_000,
            tick_ms: 500,
            noise_names: DEFAULT_NOISE_NAMES.iter().map(|s| s.to_string()).collect(),
            sources: SourceConfig::default(),
            drain_on_shutdown: false,
            color: true,
        }
    }
}

/// Which event sources to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Portable filesystem watcher (no pid attribution)
    pub notify: bool,

    /// Linux fanotify (pid-attributed writes, needs CAP_SYS_ADMIN)
    pub fanotify: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            notify: true,
            fanotify: cfg!(target_os = "linux"),
        }
    }
}

impl MonitorConfig {
    /// Default configuration for `root`
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Debounce window
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Flush tick interval
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Resolved audit log path
    pub fn log_path(&self) -> PathBuf {
        match &self.log_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.root.join(path),
            None => self.root.join(DEFAULT_LOG_NAME),
        }
    }

    /// Resolved JSON export path, if one is configured
    pub fn json_log_path(&self) -> Option<PathBuf> {
        self.json_log.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                self.root.join(path)
            }
        })
    }

    /// Files written by the monitor itself, never reported
    pub fn own_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.log_path()];
        files.extend(self.json_log_path());
        files
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("window_ms", self.window_ms, 1, 3_600_000)?;
        check_range("tick_ms", self.tick_ms, 1, 60_000)?;

        if !self.sources.notify && !self.sources.fanotify {
            return Err(ConfigError::NoSources);
        }
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidPath(self.root.clone()));
        }

        Ok(())
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Commented example configuration
pub fn example_config() -> &'static str {
    r#"# fsaudit configuration

# Directory to monitor
root = "/srv/share"

# Audit log (relative paths resolve against root; default: audit.log)
log_file = "audit.log"

# JSON-lines export of file event records (disabled unless set)
# json_log = "events.jsonl"

# A burst settles once no severity-raising event arrived for this long
window_ms = 2000

# How often settled bursts are flushed
tick_ms = 500

# File names that are never reported (case-insensitive)
noise_names = ["desktop.ini", "folder.jpg", "folder.gif"]

# Emit unsettled bursts on shutdown instead of dropping them
drain_on_shutdown = false

# Colorize console output
color = true

[sources]
# Portable watcher: create/write/rename/delete, no process attribution
notify = true
# Linux fanotify: writes with process attribution (requires CAP_SYS_ADMIN)
fanotify = true
"#
}
