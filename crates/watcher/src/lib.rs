//! File system monitoring for fsaudit
//!
//! This crate provides:
//! - Event sources (portable `notify` watcher, Linux fanotify)
//! - procfs process identity lookup
//! - The shared classify/aggregate/attribute pipeline
//! - Periodic flushing of settled bursts
//! - Monitor lifecycle (start/stop)

pub mod flush;
pub mod lookup;
pub mod monitor;
pub mod pipeline;
pub mod source;

// Re-exports
pub use flush::FlushScheduler;
pub use lookup::ProcfsLookup;
pub use monitor::Monitor;
pub use pipeline::{clock_now, Pipeline, PipelineStats};
pub use source::EventSource;
