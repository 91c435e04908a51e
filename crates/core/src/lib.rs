//! Event aggregation and debounce engine for fsaudit
//!
//! This crate provides:
//! - Raw event types and severity ranking
//! - Path classification (scope filter + normalization)
//! - Per-path burst aggregation (lock-sharded concurrent map)
//! - Process attribution cache
//! - Monitor configuration

pub mod aggregate;
pub mod attribution;
pub mod classify;
pub mod config;
pub mod emission;
pub mod error;
pub mod event;

// Re-exports
pub use aggregate::{Burst, BurstAggregator, BurstState};
pub use attribution::{AttributionCache, IdentityLookup, ProcessIdentity, UNKNOWN};
pub use classify::{PathClassifier, Rejection};
pub use config::{MonitorConfig, SourceConfig};
pub use emission::{Emission, EmissionSink};
pub use error::{ConfigError, LookupError};
pub use event::{EventKind, RawEvent, SourceEvent, SourceTag, UNATTRIBUTED_PID};
