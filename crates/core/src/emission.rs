//! Finalized bursts, ready to be written out

use crate::aggregate::Burst;
use crate::attribution::ProcessIdentity;
use crate::event::{EventKind, UNATTRIBUTED_PID};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Timestamp format of audit lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One audit line worth of data
///
/// Serializes as a file event record:
/// `{"path", "event", "pid", "process", "user", "timestamp"}`, with `pid`
/// omitted for unattributed bursts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emission {
    /// Canonical path
    pub path: PathBuf,
    /// Representative event kind of the burst
    #[serde(rename = "event")]
    pub kind: EventKind,
    /// Pid behind `kind`
    #[serde(skip_serializing_if = "is_unattributed")]
    pub pid: u32,
    /// Resolved process name
    pub process: String,
    /// Resolved owning account
    #[serde(rename = "user")]
    pub owner: String,
    /// Local wall-clock time of the flush
    pub timestamp: DateTime<Local>,
}

fn is_unattributed(pid: &u32) -> bool {
    *pid == UNATTRIBUTED_PID
}

impl Emission {
    /// Combine a flushed burst with its attribution
    pub fn new(burst: Burst, identity: ProcessIdentity, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            kind: burst.state.kind,
            process: identity.name,
            pid: burst.state.pid,
            owner: identity.owner,
            path: burst.path,
        }
    }

    /// Formatted local timestamp
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} (PID {}, User {}): {}",
            self.formatted_timestamp(),
            self.kind.label(),
            self.process,
            self.pid,
            self.owner,
            self.path.display()
        )
    }
}

/// Destination of audit lines
///
/// Called from the flush task only, after the burst has left the aggregator.
pub trait EmissionSink: Send + Sync {
    /// Write one emission
    fn emit(&self, emission: &Emission) -> std::io::Result<()>;
}
