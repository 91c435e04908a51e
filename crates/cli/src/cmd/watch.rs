//! Watch a directory and write the audit log until interrupted

use anyhow::{Context, Result};
use clap::Args;
use fsaudit_core::classify::normalize_path;
use fsaudit_core::MonitorConfig;
use journal::{AuditLog, ConsoleSink, Fanout, JsonLinesLog, RecentEmissions};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use watcher::{Monitor, ProcfsLookup};

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Directory to monitor
    pub dir: PathBuf,

    /// Audit log file (default: <DIR>/audit.log)
    #[arg(short, long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Also export file event records as JSON lines to FILE
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Debounce window in milliseconds (default: 2000)
    #[arg(long, value_name = "MS")]
    pub window_ms: Option<u64>,

    /// Flush interval in milliseconds (default: 500)
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Extra file name to ignore, on top of the configured ones (repeatable)
    #[arg(long = "noise", value_name = "NAME")]
    pub noise: Vec<String>,

    /// Don't use fanotify (no process attribution for writes)
    #[arg(long)]
    pub no_fanotify: bool,

    /// Don't use the portable watcher
    #[arg(long)]
    pub no_notify: bool,

    /// Emit unsettled bursts on shutdown
    #[arg(long)]
    pub drain: bool,

    /// Plain console output
    #[arg(long)]
    pub no_color: bool,

    /// Configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// The directory to monitor doesn't exist
#[derive(Debug, thiserror::Error)]
#[error("Directory not found: {}", .0.display())]
pub struct MissingRoot(pub PathBuf);

impl WatchArgs {
    /// Build the monitor configuration: file (or defaults), then flags
    pub fn to_config(&self) -> Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => MonitorConfig::default(),
        };

        config.root = self.dir.clone();

        if let Some(log) = &self.log {
            // A log given on the command line is relative to the working
            // directory, not the root
            let log = normalize_path(log)
                .with_context(|| format!("Invalid log path: {}", log.display()))?;
            config.log_file = Some(log);
        }
        if let Some(json) = &self.json {
            let json = normalize_path(json)
                .with_context(|| format!("Invalid export path: {}", json.display()))?;
            config.json_log = Some(json);
        }
        if let Some(window_ms) = self.window_ms {
            config.window_ms = window_ms;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        config.noise_names.extend(self.noise.iter().cloned());
        if self.no_fanotify {
            config.sources.fanotify = false;
        }
        if self.no_notify {
            config.sources.notify = false;
        }
        if self.drain {
            config.drain_on_shutdown = true;
        }
        if self.no_color {
            config.color = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Canonical form of an existing directory
pub fn resolve_root(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(MissingRoot(dir.to_path_buf()).into());
    }
    std::fs::canonicalize(dir).with_context(|| format!("Failed to resolve {}", dir.display()))
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let root = resolve_root(&args.dir)?;
    let mut config = args.to_config()?;
    config.root = root;

    let log_path = config.log_path();
    let audit_log = Arc::new(AuditLog::open(&log_path)?);
    let recent = Arc::new(RecentEmissions::default());
    let mut sink = Fanout::new()
        .with(audit_log.clone())
        .with(Arc::new(ConsoleSink::new(config.color)))
        .with(recent.clone());
    if let Some(export) = config.json_log_path() {
        sink = sink.with(Arc::new(JsonLinesLog::open(&export)?));
    }

    let monitor = Monitor::start(&config, Arc::new(sink), Arc::new(ProcfsLookup))?;

    println!(
        "{} {} {}",
        "Monitoring".green().bold(),
        config.root.display(),
        format!("(log: {}, window: {}ms)", log_path.display(), config.window_ms).dimmed()
    );
    println!("{}", "Press Ctrl-C to stop".dimmed());

    shutdown_signal().await?;
    info!("Shutdown requested");

    monitor.stop().await?;
    audit_log.close()?;

    println!("{} {}", "✓".green(), "Session ended".bold());
    print_summary(&recent);
    Ok(())
}

fn print_summary(recent: &RecentEmissions) {
    if recent.is_empty() {
        return;
    }
    let counts: Vec<String> = recent
        .counts()
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(kind, n)| format!("{} {}", n, kind.label().to_lowercase()))
        .collect();
    println!("  {}", format!("Last {} lines: {}", recent.len(), counts.join(", ")).dimmed());
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(dir: &Path) -> WatchArgs {
        WatchArgs {
            dir: dir.to_path_buf(),
            log: None,
            json: None,
            window_ms: None,
            tick_ms: None,
            noise: Vec::new(),
            no_fanotify: false,
            no_notify: false,
            drain: false,
            no_color: false,
            config: None,
        }
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = args(Path::new("/srv/share")).to_config().unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/share"));
        assert_eq!(config.window_ms, 2_000);
        assert_eq!(config.tick_ms, 500);
        assert_eq!(config.log_path(), PathBuf::from("/srv/share/audit.log"));
        assert!(config.sources.notify);
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("fsaudit.toml");
        fs::write(
            &file,
            "root = \"/ignored\"\nwindow_ms = 5000\ntick_ms = 100\ndrain_on_shutdown = false\n",
        )
        .unwrap();

        let mut args = args(Path::new("/srv/share"));
        args.config = Some(file);
        args.window_ms = Some(750);
        args.drain = true;
        args.noise = vec!["thumbs.db".to_string()];
        args.no_fanotify = true;

        let config = args.to_config().unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/share"));
        assert_eq!(config.window_ms, 750);
        // Not given on the command line: file value stays
        assert_eq!(config.tick_ms, 100);
        assert!(config.drain_on_shutdown);
        assert!(!config.sources.fanotify);
        assert!(config.noise_names.iter().any(|n| n == "desktop.ini"));
        assert!(config.noise_names.iter().any(|n| n == "thumbs.db"));
    }

    #[test]
    fn test_log_flag_is_absolute() {
        let mut args = args(Path::new("/srv/share"));
        args.log = Some(PathBuf::from("logs/audit.log"));

        let config = args.to_config().unwrap();
        let log = config.log_path();
        assert!(log.is_absolute());
        assert!(log.ends_with("logs/audit.log"));
        assert!(!log.starts_with("/srv/share"));
    }

    #[test]
    fn test_json_flag_sets_export() {
        let mut args = args(Path::new("/srv/share"));
        assert_eq!(args.to_config().unwrap().json_log_path(), None);

        args.json = Some(PathBuf::from("/var/lib/fsaudit/events.jsonl"));
        let config = args.to_config().unwrap();
        assert_eq!(
            config.json_log_path(),
            Some(PathBuf::from("/var/lib/fsaudit/events.jsonl"))
        );
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let mut zero_window = args(Path::new("/srv/share"));
        zero_window.window_ms = Some(0);
        assert!(zero_window.to_config().is_err());

        let mut no_sources = args(Path::new("/srv/share"));
        no_sources.no_notify = true;
        no_sources.no_fanotify = true;
        assert!(no_sources.to_config().is_err());
    }

    #[test]
    fn test_resolve_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = resolve_root(temp_dir.path()).unwrap();
        assert!(root.is_absolute());

        let missing = temp_dir.path().join("nope");
        let err = resolve_root(&missing).unwrap_err();
        assert!(err.downcast_ref::<MissingRoot>().is_some());

        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        assert!(resolve_root(&file).is_err());
    }
}
