//! Portable source built on the `notify` crate
//!
//! Reports creates, writes, renames and deletes for the whole tree under the
//! root. The backends don't expose the acting process, so every event is
//! unattributed. When fanotify is running it owns content writes: this
//! source then leaves them out, so an unattributed copy of a write can't
//! win the burst over the attributed one.

use super::EventSource;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use fsaudit_core::{EventKind, RawEvent, SourceTag, UNATTRIBUTED_PID};
use notify::event::ModifyKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Recursive filesystem watcher feeding the pipeline
pub struct FsWatchSource {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl FsWatchSource {
    /// Start watching `root` recursively
    ///
    /// With `report_writes` false, content and metadata modifications are
    /// dropped and only creates, renames and deletes are reported.
    pub fn start(root: &Path, pipeline: Arc<Pipeline>, report_writes: bool) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for raw in translate(&event, report_writes) {
                        pipeline.ingest(raw.into());
                    }
                }
                Err(e) => warn!("Filesystem watch error: {}", e),
            }
        })
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        if report_writes {
            info!("Watching {} (notify)", root.display());
        } else {
            info!("Watching {} (notify, writes left to fanotify)", root.display());
        }

        Ok(Self {
            root: root.to_path_buf(),
            watcher: Some(watcher),
        })
    }
}

impl EventSource for FsWatchSource {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.root) {
                warn!("Failed to unwatch {}: {}", self.root.display(), e);
            }
        }
    }
}

impl Drop for FsWatchSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map a `notify` event onto raw events, one per affected path
pub fn translate(event: &notify::Event, report_writes: bool) -> Vec<RawEvent> {
    let kind = match event.kind {
        notify::EventKind::Create(_) => EventKind::Create,
        notify::EventKind::Modify(ModifyKind::Name(_)) => EventKind::Rename,
        notify::EventKind::Modify(_) if report_writes => EventKind::Write,
        notify::EventKind::Remove(_) => EventKind::Delete,
        // Access and unclassified events are not mutations
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| RawEvent::new(kind, UNATTRIBUTED_PID, path.to_string_lossy(), SourceTag::Notify))
        .collect()
}
