//! Audit line sinks
//!
//! This crate provides:
//! - Append-only audit log file with session banners
//! - Console output (optionally colorized)
//! - JSON-lines export of file event records
//! - Bounded history of recent emissions
//! - Fan-out to several sinks

pub mod console;
pub mod fanout;
pub mod journal;
pub mod jsonl;
pub mod recent;

// Re-exports
pub use console::ConsoleSink;
pub use fanout::Fanout;
pub use journal::AuditLog;
pub use jsonl::JsonLinesLog;
pub use recent::RecentEmissions;
