//! Event sources
//!
//! Each source runs on its own thread (or the watcher backend's callback
//! thread) and feeds the shared [`Pipeline`](crate::Pipeline) directly.

#[cfg(target_os = "linux")]
pub mod fanotify;
pub mod fswatch;

#[cfg(target_os = "linux")]
pub use fanotify::FanotifySource;
pub use fswatch::FsWatchSource;

/// A running event source
pub trait EventSource: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Stop producing events
    ///
    /// Idempotent. Events already handed to the pipeline stay there.
    fn stop(&mut self);
}
