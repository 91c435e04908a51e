//! Error types for the aggregation core

use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems, reported before monitoring starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("{field} out of range: {value} (expected {min}-{max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("no event source enabled")]
    NoSources,

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Process identity lookup failures
///
/// Never fatal: the attribution cache degrades these to `unknown`.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("process {0} not found")]
    NotFound(u32),

    #[error("failed to query process {pid}: {source}")]
    Io {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("process lookup not supported on this platform")]
    Unsupported,
}
