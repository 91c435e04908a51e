//! Raw filesystem events as delivered by event sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of filesystem mutation
///
/// Variants are declared in severity order, so the derived `Ord` matches
/// [`EventKind::rank`]: Create < Write < Rename < Delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    /// File created
    Create,
    /// File content or metadata written
    Write,
    /// File renamed (either side of the rename)
    Rename,
    /// File deleted
    Delete,
}

impl EventKind {
    /// Severity rank used to pick the representative kind of a burst
    pub const fn rank(self) -> u8 {
        match self {
            EventKind::Create => 1,
            EventKind::Write => 2,
            EventKind::Rename => 3,
            EventKind::Delete => 4,
        }
    }

    /// Label used in emitted audit lines
    pub const fn label(self) -> &'static str {
        match self {
            EventKind::Create => "CREATED",
            EventKind::Write => "WRITTEN",
            EventKind::Rename => "RENAMED",
            EventKind::Delete => "DELETED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which source produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTag {
    /// Linux fanotify (pid-attributed)
    Fanotify,
    /// Portable `notify` watcher (no pid information)
    Notify,
    /// Injected directly through the pipeline API
    Manual,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceTag::Fanotify => "fanotify",
            SourceTag::Notify => "notify",
            SourceTag::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Pid carried by events whose source cannot attribute them
pub const UNATTRIBUTED_PID: u32 = 0;

/// One raw file event, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Type of change
    pub kind: EventKind,
    /// Process that caused the change ([`UNATTRIBUTED_PID`] if unknown)
    pub pid: u32,
    /// Path as reported by the source, not yet normalized
    pub path: String,
    /// Producing source
    pub source: SourceTag,
}

impl RawEvent {
    /// Create a new raw event
    pub fn new(kind: EventKind, pid: u32, path: impl Into<String>, source: SourceTag) -> Self {
        Self {
            kind,
            pid,
            path: path.into(),
            source,
        }
    }
}

/// Everything a source can hand to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A file mutation
    File(RawEvent),
    /// A process observed by the source (start notification or first sighting)
    Process {
        /// Process id
        pid: u32,
        /// Process name as reported by the source
        name: String,
    },
}

impl From<RawEvent> for SourceEvent {
    fn from(event: RawEvent) -> Self {
        SourceEvent::File(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order() {
        assert!(EventKind::Create.rank() < EventKind::Write.rank());
        assert!(EventKind::Write.rank() < EventKind::Rename.rank());
        assert!(EventKind::Rename.rank() < EventKind::Delete.rank());

        // Derived ordering agrees with rank
        assert!(EventKind::Create < EventKind::Delete);
        assert_eq!(
            [EventKind::Delete, EventKind::Create, EventKind::Rename, EventKind::Write]
                .iter()
                .max(),
            Some(&EventKind::Delete)
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(EventKind::Create.to_string(), "CREATED");
        assert_eq!(EventKind::Write.to_string(), "WRITTEN");
        assert_eq!(EventKind::Rename.to_string(), "RENAMED");
        assert_eq!(EventKind::Delete.to_string(), "DELETED");
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&EventKind::Create).unwrap(), "\"CREATE\"");
        assert_eq!(serde_json::to_string(&EventKind::Delete).unwrap(), "\"DELETE\"");
    }
}
