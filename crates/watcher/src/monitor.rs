//! Monitor lifecycle: sources + flush task around one shared pipeline

use crate::flush::FlushScheduler;
use crate::pipeline::{Pipeline, PipelineStats};
use crate::source::{EventSource, FsWatchSource};
use anyhow::{Context, Result};
use fsaudit_core::{EmissionSink, IdentityLookup, MonitorConfig, PathClassifier, SourceEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running monitor
///
/// Owns the pipeline state for the session: nothing is global, and dropping
/// or stopping the monitor ends the session.
pub struct Monitor {
    pipeline: Arc<Pipeline>,
    sources: Vec<Box<dyn EventSource>>,
    shutdown: watch::Sender<bool>,
    flush_task: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Validate `config`, start the enabled sources and the flush task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &MonitorConfig,
        sink: Arc<dyn EmissionSink>,
        lookup: Arc<dyn IdentityLookup>,
    ) -> Result<Self> {
        config.validate().context("Invalid monitor configuration")?;

        let classifier = PathClassifier::from_config(config).context("Invalid monitor paths")?;
        let root = classifier.root().to_path_buf();
        let pipeline = Arc::new(Pipeline::new(classifier, config.window(), lookup));

        let mut sources: Vec<Box<dyn EventSource>> = Vec::new();
        let mut fanotify_running = false;

        if config.sources.fanotify {
            match start_fanotify(&root, &pipeline) {
                Ok(source) => {
                    sources.push(source);
                    fanotify_running = true;
                }
                Err(e) if config.sources.notify => {
                    warn!("fanotify unavailable, continuing without process attribution for writes: {:#}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if config.sources.notify {
            // Attributed writes come from fanotify when it runs
            let source = FsWatchSource::start(&root, Arc::clone(&pipeline), !fanotify_running)?;
            sources.push(Box::new(source));
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let scheduler = FlushScheduler::new(
            Arc::clone(&pipeline),
            sink,
            config.tick(),
            config.drain_on_shutdown,
        );
        let flush_task = tokio::spawn(scheduler.run(shutdown_rx));

        info!(
            "Monitoring {} (sources: {})",
            root.display(),
            sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            pipeline,
            sources,
            shutdown,
            flush_task: Some(flush_task),
        })
    }

    /// Feed an event into the pipeline, as a source would
    pub fn ingest(&self, event: SourceEvent) {
        self.pipeline.ingest(event);
    }

    /// Shared pipeline
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Current counters
    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    /// Stop sources, then the flush task (which drains if configured)
    pub async fn stop(mut self) -> Result<()> {
        // Stopping joins reader threads
        let mut sources = std::mem::take(&mut self.sources);
        tokio::task::spawn_blocking(move || {
            for source in &mut sources {
                source.stop();
            }
        })
        .await
        .context("Failed to stop event sources")?;

        // Receiver gone means the task already exited
        let _ = self.shutdown.send(true);

        if let Some(task) = self.flush_task.take() {
            task.await.context("Flush task failed")?;
        }

        let stats = self.pipeline.stats();
        info!(
            "Monitor stopped ({} events accepted, {} rejected, {} processes seen)",
            stats.accepted, stats.rejected, stats.cached_identities
        );
        Ok(())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        for source in &mut self.sources {
            source.stop();
        }
        let _ = self.shutdown.send(true);
    }
}

#[cfg(target_os = "linux")]
fn start_fanotify(root: &std::path::Path, pipeline: &Arc<Pipeline>) -> Result<Box<dyn EventSource>> {
    let source = crate::source::FanotifySource::start(root, Arc::clone(pipeline))?;
    Ok(Box::new(source))
}

#[cfg(not(target_os = "linux"))]
fn start_fanotify(_root: &std::path::Path, _pipeline: &Arc<Pipeline>) -> Result<Box<dyn EventSource>> {
    anyhow::bail!("fanotify is only available on Linux")
}
