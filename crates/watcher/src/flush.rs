//! Periodic flush of settled bursts
//!
//! A single task scans the aggregator on a fixed tick, independent of the
//! debounce window, and hands every settled burst to the sink. Polling keeps
//! the cost bounded by the tick rate instead of one timer per path.
//!
//! Each flush runs on the blocking pool: attribution reads procfs and the
//! passwd database, and sinks write files and stdout.

use crate::pipeline::{clock_now, Pipeline};
use fsaudit_core::{Emission, EmissionSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodic flusher
pub struct FlushScheduler {
    /// Shared pipeline to drain
    pipeline: Arc<Pipeline>,

    /// Destination of audit lines
    sink: Arc<dyn EmissionSink>,

    /// Scan interval (default: 500ms)
    tick: Duration,

    /// Emit unsettled bursts when stopping
    drain_on_shutdown: bool,
}

impl FlushScheduler {
    /// Create new flush scheduler
    pub fn new(
        pipeline: Arc<Pipeline>,
        sink: Arc<dyn EmissionSink>,
        tick: Duration,
        drain_on_shutdown: bool,
    ) -> Self {
        Self {
            pipeline,
            sink,
            tick,
            drain_on_shutdown,
        }
    }

    /// Run the flush loop until `shutdown` turns true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting flush scheduler (tick: {:?}, window: {:?})",
            self.tick,
            self.pipeline.aggregator().window()
        );

        let scheduler = Arc::new(self);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let now = clock_now();
                    let flusher = Arc::clone(&scheduler);
                    if let Err(e) = tokio::task::spawn_blocking(move || flusher.flush_once(now)).await {
                        warn!("Flush failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if scheduler.drain_on_shutdown {
            let drainer = Arc::clone(&scheduler);
            match tokio::task::spawn_blocking(move || drainer.drain()).await {
                Ok(drained) => info!("Flush scheduler stopped, drained {} open bursts", drained),
                Err(e) => warn!("Drain on shutdown failed: {}", e),
            }
        } else {
            let open = scheduler.pipeline.aggregator().len();
            if open > 0 {
                info!("Flush scheduler stopped, dropping {} open bursts", open);
            } else {
                info!("Flush scheduler stopped");
            }
        }
    }

    /// Emit every burst settled at `now`, returning how many were emitted
    pub fn flush_once(&self, now: Instant) -> usize {
        let emissions = self.pipeline.take_settled(now);
        for emission in &emissions {
            self.emit(emission);
        }
        emissions.len()
    }

    /// Emit every open burst regardless of age
    pub fn drain(&self) -> usize {
        let emissions = self.pipeline.drain();
        for emission in &emissions {
            self.emit(emission);
        }
        emissions.len()
    }

    fn emit(&self, emission: &Emission) {
        match self.sink.emit(emission) {
            Ok(()) => debug!(
                kind = %emission.kind,
                pid = emission.pid,
                path = %emission.path.display(),
                "burst emitted"
            ),
            Err(e) => warn!("Failed to emit audit line for {}: {}", emission.path.display(), e),
        }
    }
}
