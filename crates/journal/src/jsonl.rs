//! Machine-readable export: one JSON record per line

use anyhow::{Context, Result};
use fsaudit_core::{Emission, EmissionSink};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only JSON-lines file of file event records
pub struct JsonLinesLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesLog {
    /// Open (or create) the export file in append mode
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create export directory {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open event export {}", path.display()))?;

        tracing::info!("Event export: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Export file location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EmissionSink for JsonLinesLog {
    fn emit(&self, emission: &Emission) -> io::Result<()> {
        let record = serde_json::to_string(emission)?;
        let mut file = self.file.lock();
        writeln!(file, "{}", record)?;
        file.flush()
    }
}
