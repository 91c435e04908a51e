//! Append-only audit log file

use anyhow::{Context, Result};
use chrono::Local;
use fsaudit_core::emission::TIMESTAMP_FORMAT;
use fsaudit_core::{Emission, EmissionSink};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Audit log file with session banners
///
/// Every emission is written as one line and flushed immediately, so the
/// log stays readable while the monitor runs. Writes from different threads
/// are serialized.
pub struct AuditLog {
    /// Log file location
    path: PathBuf,
    /// Open file, `None` once the session has ended
    file: Mutex<Option<File>>,
}

impl AuditLog {
    /// Open (or create) the log in append mode and start a session
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;

        writeln!(file, "=== Session started {} ===", Local::now().format(TIMESTAMP_FORMAT))
            .context("Failed to write session banner")?;
        file.flush()?;

        tracing::info!("Audit log: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
        })
    }

    /// Log file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// End the session
    ///
    /// Idempotent; later emissions fail.
    pub fn close(&self) -> Result<()> {
        if let Some(mut file) = self.file.lock().take() {
            writeln!(file, "=== Session ended   {} ===", Local::now().format(TIMESTAMP_FORMAT))
                .context("Failed to write session banner")?;
            file.sync_all()?;
        }
        Ok(())
    }
}

impl EmissionSink for AuditLog {
    fn emit(&self, emission: &Emission) -> io::Result<()> {
        let mut guard = self.file.lock();
        let file = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "audit log session has ended"))?;
        writeln!(file, "{}", emission)?;
        file.flush()
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close audit log {}: {}", self.path.display(), e);
        }
    }
}
