//! Injectable reporting capability.
//!
//! Every engine component logs its outcomes through a `&dyn Reporter`
//! instead of the global `tracing` macros. The binary wires in
//! [`TracingReporter`]; tests wire in [`RecordingReporter`] and assert on
//! the captured records.

use std::cell::RefCell;
use tracing::Level;

/// Sink for leveled, human-readable engine events.
pub trait Reporter {
    /// Record one event at `level`.
    fn report(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.report(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.report(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::ERROR, message);
    }
}

/// Forwards events to the installed `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            _ => tracing::trace!("{}", message),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    records: RefCell<Vec<(Level, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.borrow().clone()
    }

    /// Messages recorded at exactly `level`
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// True if any record at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    /// Index of the first record containing `needle`, at any level
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.records
            .borrow()
            .iter()
            .position(|(_, m)| m.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, level: Level, message: &str) {
        self.records.borrow_mut().push((level, message.to_string()));
    }
}
