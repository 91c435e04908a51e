//! Bounded in-memory history of recent emissions

use fsaudit_core::{Emission, EmissionSink, EventKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;

/// Default number of emissions kept
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Ring buffer sink; the oldest emission is dropped when full
#[derive(Debug)]
pub struct RecentEmissions {
    capacity: usize,
    buffer: Mutex<VecDeque<Emission>>,
}

impl Default for RecentEmissions {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecentEmissions {
    /// Create a buffer holding at most `capacity` emissions (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Copy of the buffered emissions, oldest first
    pub fn snapshot(&self) -> Vec<Emission> {
        self.buffer.lock().iter().cloned().collect()
    }

    /// Remove and return the buffered emissions, oldest first
    pub fn take(&self) -> Vec<Emission> {
        self.buffer.lock().drain(..).collect()
    }

    /// Number of buffered emissions
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Buffered emissions per event kind, in severity order
    pub fn counts(&self) -> Vec<(EventKind, usize)> {
        let buffer = self.buffer.lock();
        [EventKind::Create, EventKind::Write, EventKind::Rename, EventKind::Delete]
            .into_iter()
            .map(|kind| (kind, buffer.iter().filter(|e| e.kind == kind).count()))
            .collect()
    }
}

impl EmissionSink for RecentEmissions {
    fn emit(&self, emission: &Emission) -> io::Result<()> {
        let mut buffer = self.buffer.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(emission.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use fsaudit_core::{Burst, BurstState, ProcessIdentity};
    use std::path::PathBuf;
    use std::time::Instant;

    fn emission(n: usize, kind: EventKind) -> Emission {
        let burst = Burst {
            path: PathBuf::from(format!("/mon/{n}.txt")),
            state: BurstState {
                last_update: Instant::now(),
                kind,
                pid: 1,
            },
        };
        Emission::new(burst, ProcessIdentity::unknown(), Local::now())
    }

    #[test]
    fn test_oldest_dropped_when_full() {
        let recent = RecentEmissions::with_capacity(3);
        for n in 0..5 {
            recent.emit(&emission(n, EventKind::Write)).unwrap();
        }

        let paths: Vec<PathBuf> = recent.snapshot().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/mon/2.txt"),
                PathBuf::from("/mon/3.txt"),
                PathBuf::from("/mon/4.txt"),
            ]
        );
    }

    #[test]
    fn test_take_empties_buffer() {
        let recent = RecentEmissions::default();
        recent.emit(&emission(0, EventKind::Create)).unwrap();
        recent.emit(&emission(1, EventKind::Delete)).unwrap();

        assert_eq!(recent.take().len(), 2);
        assert!(recent.is_empty());
        assert!(recent.take().is_empty());
    }

    #[test]
    fn test_counts_by_kind() {
        let recent = RecentEmissions::default();
        recent.emit(&emission(0, EventKind::Write)).unwrap();
        recent.emit(&emission(1, EventKind::Write)).unwrap();
        recent.emit(&emission(2, EventKind::Delete)).unwrap();

        assert_eq!(
            recent.counts(),
            vec![
                (EventKind::Create, 0),
                (EventKind::Write, 2),
                (EventKind::Rename, 0),
                (EventKind::Delete, 1),
            ]
        );
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let recent = RecentEmissions::with_capacity(0);
        recent.emit(&emission(0, EventKind::Write)).unwrap();
        recent.emit(&emission(1, EventKind::Write)).unwrap();
        assert_eq!(recent.len(), 1);
    }
}
