//! Shared event pipeline
//!
//! Every source feeds the same [`Pipeline`]: events are classified, merged
//! into the burst aggregator, and settled bursts are paired with their
//! process attribution. Ingestion is safe from any number of threads.

use chrono::Local;
use fsaudit_core::{
    AttributionCache, BurstAggregator, Emission, IdentityLookup, PathClassifier, RawEvent,
    SourceEvent,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Clock shared by producers and the flush task
///
/// Goes through tokio so tests with a paused runtime clock see consistent
/// readings; outside a runtime this is the plain monotonic clock.
pub fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Classifier + aggregator + attribution cache
#[derive(Debug)]
pub struct Pipeline {
    classifier: PathClassifier,
    aggregator: BurstAggregator,
    attribution: AttributionCache,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events merged into a burst
    pub accepted: u64,
    /// Events dropped by the classifier
    pub rejected: u64,
    /// Bursts currently open
    pub live_bursts: usize,
    /// Pids in the attribution cache
    pub cached_identities: usize,
}

impl Pipeline {
    /// Create a pipeline
    pub fn new(
        classifier: PathClassifier,
        window: Duration,
        lookup: Arc<dyn IdentityLookup>,
    ) -> Self {
        Self {
            classifier,
            aggregator: BurstAggregator::new(window),
            attribution: AttributionCache::new(lookup),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Hand one source event to the pipeline, stamped with the current time
    pub fn ingest(&self, event: SourceEvent) {
        match event {
            SourceEvent::File(raw) => self.record(raw, clock_now()),
            SourceEvent::Process { pid, name } => self.attribution.on_process(pid, &name),
        }
    }

    /// Hand a pid-attributed file event to the pipeline
    ///
    /// `name` is asked for the process name only when the event is in scope
    /// and its pid has no identity yet, so writes elsewhere on the
    /// filesystem never cost a process lookup.
    pub fn ingest_attributed<F>(&self, raw: RawEvent, name: F)
    where
        F: FnOnce(u32) -> Option<String>,
    {
        self.record_attributed(raw, clock_now(), name);
    }

    /// Classify and merge a file event observed at `now`
    pub fn record(&self, raw: RawEvent, now: Instant) {
        if let Some(path) = self.admit(&raw) {
            self.aggregator.record(path, raw.kind, raw.pid, now);
        }
    }

    /// [`Pipeline::record`], announcing the process of in-scope events first
    pub fn record_attributed<F>(&self, raw: RawEvent, now: Instant, name: F)
    where
        F: FnOnce(u32) -> Option<String>,
    {
        let Some(path) = self.admit(&raw) else { return };

        if !self.attribution.contains(raw.pid) {
            if let Some(name) = name(raw.pid) {
                self.attribution.on_process(raw.pid, &name);
            }
        }
        self.aggregator.record(path, raw.kind, raw.pid, now);
    }

    fn admit(&self, raw: &RawEvent) -> Option<PathBuf> {
        match self.classifier.check(&raw.path) {
            Ok(path) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                Some(path)
            }
            Err(reason) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                trace!(source = %raw.source, path = %raw.path, ?reason, "event rejected");
                None
            }
        }
    }

    /// Remove settled bursts and attribute them
    ///
    /// Attribution runs after the bursts have left the aggregator, so slow
    /// process lookups never hold up producers.
    pub fn take_settled(&self, now: Instant) -> Vec<Emission> {
        let bursts = self.aggregator.take_settled(now);
        self.attribute(bursts)
    }

    /// Remove every open burst regardless of age and attribute them
    pub fn drain(&self) -> Vec<Emission> {
        let bursts = self.aggregator.drain_all();
        self.attribute(bursts)
    }

    fn attribute(&self, bursts: Vec<fsaudit_core::Burst>) -> Vec<Emission> {
        bursts
            .into_iter()
            .map(|burst| {
                let identity = self.attribution.resolve(burst.state.pid);
                Emission::new(burst, identity, Local::now())
            })
            .collect()
    }

    /// Burst aggregator
    pub fn aggregator(&self) -> &BurstAggregator {
        &self.aggregator
    }

    /// Attribution cache
    pub fn attribution(&self) -> &AttributionCache {
        &self.attribution
    }

    /// Path classifier
    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            live_bursts: self.aggregator.len(),
            cached_identities: self.attribution.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsaudit_core::config::DEFAULT_NOISE_NAMES;
    use fsaudit_core::{EventKind, LookupError, ProcessIdentity, SourceTag};
    use std::cell::Cell;
    use std::path::Path;

    fn pipeline() -> Pipeline {
        let classifier =
            PathClassifier::new(Path::new("/mon"), Path::new("/mon/audit.log"), DEFAULT_NOISE_NAMES)
                .unwrap();
        let lookup = |pid: u32| -> Result<ProcessIdentity, LookupError> {
            match pid {
                100 => Ok(ProcessIdentity::new("vim", "alice")),
                _ => Err(LookupError::NotFound(pid)),
            }
        };
        Pipeline::new(classifier, Duration::from_secs(2), Arc::new(lookup))
    }

    fn file(kind: EventKind, pid: u32, path: &str) -> RawEvent {
        RawEvent::new(kind, pid, path, SourceTag::Manual)
    }

    #[test]
    fn test_rejected_events_never_create_bursts() {
        let p = pipeline();
        let t0 = Instant::now();

        for path in [
            "/elsewhere/a.txt",
            "/mon",
            "/mon/audit.log",
            "/mon/desktop.ini",
            "/mon/Makefile",
            "",
        ] {
            p.record(file(EventKind::Write, 100, path), t0);
        }

        assert!(p.aggregator().is_empty());
        assert_eq!(p.stats().rejected, 6);
        assert_eq!(p.stats().accepted, 0);
    }

    #[test]
    fn test_settled_bursts_are_attributed() {
        let p = pipeline();
        let t0 = Instant::now();

        p.record(file(EventKind::Create, 100, "/mon/a.txt"), t0);
        p.record(file(EventKind::Write, 100, "/mon/a.txt"), t0 + Duration::from_millis(300));
        p.record(file(EventKind::Delete, 5, "/mon/b.txt"), t0);

        let mut emissions = p.take_settled(t0 + Duration::from_millis(2_300));
        emissions.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(emissions.len(), 2);
        assert_eq!(emissions[0].path, PathBuf::from("/mon/a.txt"));
        assert_eq!(emissions[0].kind, EventKind::Write);
        assert_eq!(emissions[0].process, "vim");
        assert_eq!(emissions[0].owner, "alice");
        assert_eq!(emissions[1].kind, EventKind::Delete);
        assert_eq!(emissions[1].process, "unknown");
        assert_eq!(emissions[1].owner, "unknown");
        assert!(p.aggregator().is_empty());
    }

    #[test]
    fn test_process_event_primes_cache() {
        let p = pipeline();

        p.ingest(SourceEvent::Process { pid: 77, name: "rsync".to_string() });
        p.record(file(EventKind::Write, 77, "/mon/a.txt"), Instant::now());

        let emissions = p.drain();
        assert_eq!(emissions.len(), 1);
        assert_eq!(emissions[0].process, "rsync");
        assert_eq!(emissions[0].owner, "unknown");
    }

    #[test]
    fn test_out_of_scope_events_skip_process_lookup() {
        let p = pipeline();
        let asked = Cell::new(0);
        let name = |_pid: u32| {
            asked.set(asked.get() + 1);
            Some("logrotate".to_string())
        };

        p.record_attributed(
            RawEvent::new(EventKind::Write, 555, "/var/log/syslog.1", SourceTag::Fanotify),
            Instant::now(),
            name,
        );
        p.record_attributed(
            RawEvent::new(EventKind::Write, 556, "/mon/audit.log", SourceTag::Fanotify),
            Instant::now(),
            name,
        );

        assert_eq!(asked.get(), 0);
        assert!(p.attribution().is_empty());
        assert!(p.aggregator().is_empty());
        assert_eq!(p.stats().rejected, 2);
    }

    #[test]
    fn test_in_scope_event_announces_process_once() {
        let p = pipeline();
        let asked = Cell::new(0);
        let name = |_pid: u32| {
            asked.set(asked.get() + 1);
            Some("cc1".to_string())
        };

        let t0 = Instant::now();
        p.record_attributed(RawEvent::new(EventKind::Write, 88, "/mon/a.o", SourceTag::Fanotify), t0, name);
        p.record_attributed(RawEvent::new(EventKind::Write, 88, "/mon/b.o", SourceTag::Fanotify), t0, name);

        assert_eq!(asked.get(), 1);
        assert_eq!(p.attribution().len(), 1);

        let emissions = p.drain();
        assert_eq!(emissions.len(), 2);
        assert!(emissions.iter().all(|e| e.process == "cc1" && e.owner == "unknown"));
    }

    #[test]
    fn test_ingest_uses_clock() {
        let p = pipeline();
        let before = clock_now();

        p.ingest(file(EventKind::Rename, 100, "/mon/a.txt").into());

        let state = p.aggregator().get(Path::new("/mon/a.txt")).unwrap();
        assert!(state.last_update >= before);
        assert_eq!(p.stats().live_bursts, 1);
    }
}
