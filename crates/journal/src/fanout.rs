//! Forwarding one emission to several sinks

use fsaudit_core::{Emission, EmissionSink};
use std::io;
use std::sync::Arc;

/// Sends every emission to all inner sinks
///
/// A failing sink does not prevent the others from receiving the line; the
/// first error is reported back.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Arc<dyn EmissionSink>>,
}

impl Fanout {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn EmissionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of inner sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no inner sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EmissionSink for Fanout {
    fn emit(&self, emission: &Emission) -> io::Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(emission) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
