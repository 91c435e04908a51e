//! Per-path burst aggregation
//!
//! Each accepted event is merged into the burst state of its path. The merge
//! runs under the map's shard write lock (DashMap entry API), so two events on
//! the same path can never interleave into a mixed state, while events on
//! unrelated paths proceed in parallel.

use crate::event::EventKind;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Live state of one burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstState {
    /// Last event allowed to extend the burst
    pub last_update: Instant,
    /// Highest-severity kind seen in the burst
    pub kind: EventKind,
    /// Process behind `kind`
    pub pid: u32,
}

impl BurstState {
    fn new(now: Instant, kind: EventKind, pid: u32) -> Self {
        Self {
            last_update: now,
            kind,
            pid,
        }
    }

    /// Whether the debounce window has elapsed at `now`
    pub fn is_settled(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_update) >= window
    }
}

/// A burst that left the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burst {
    /// Aggregation key
    pub path: PathBuf,
    /// Final state
    pub state: BurstState,
}

/// Concurrent path -> burst map
#[derive(Debug)]
pub struct BurstAggregator {
    window: Duration,
    bursts: DashMap<PathBuf, BurstState>,
}

impl BurstAggregator {
    /// Create an empty aggregator with the given debounce window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            bursts: DashMap::new(),
        }
    }

    /// Debounce window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Merge one event into the burst state of `path`
    pub fn record(&self, path: PathBuf, kind: EventKind, pid: u32, now: Instant) {
        let window = self.window;
        self.bursts
            .entry(path)
            .and_modify(|old| {
                if now.saturating_duration_since(old.last_update) > window {
                    // Stale burst the flusher has not reaped yet: start over
                    *old = BurstState::new(now, kind, pid);
                } else if kind.rank() > old.kind.rank() {
                    *old = BurstState::new(now.max(old.last_update), kind, pid);
                }
                // Equal or lower severity leaves the burst untouched
            })
            .or_insert_with(|| BurstState::new(now, kind, pid));
    }

    /// Current state for a path
    pub fn get(&self, path: &Path) -> Option<BurstState> {
        self.bursts.get(path).map(|entry| *entry.value())
    }

    /// Number of live bursts
    pub fn len(&self) -> usize {
        self.bursts.len()
    }

    /// Whether there are no live bursts
    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }

    /// Remove and return every burst whose window has elapsed at `now`
    ///
    /// Works from a snapshot; an entry is only removed if it still holds the
    /// snapshot state, so a burst upgraded between the scan and the removal
    /// stays in place and is re-evaluated on the next call.
    pub fn take_settled(&self, now: Instant) -> Vec<Burst> {
        let snapshot: Vec<(PathBuf, BurstState)> = self
            .bursts
            .iter()
            .filter(|entry| entry.value().is_settled(now, self.window))
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        snapshot
            .into_iter()
            .filter_map(|(path, seen)| {
                self.bursts
                    .remove_if(&path, |_, current| *current == seen)
                    .map(|(path, state)| Burst { path, state })
            })
            .collect()
    }

    /// Remove and return every live burst regardless of age
    pub fn drain_all(&self) -> Vec<Burst> {
        let keys: Vec<PathBuf> = self.bursts.iter().map(|entry| entry.key().clone()).collect();
        keys.into_iter()
            .filter_map(|path| self.bursts.remove(&path))
            .map(|(path, state)| Burst { path, state })
            .collect()
    }
}
