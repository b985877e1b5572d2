// Diagnostic sinks - where store failures are reported

use crate::error::{ErrorKind, ManifestError};

/// Receives every failure a store reports.
pub trait DiagnosticSink {
    fn report(&mut self, error: &ManifestError);
}

/// Writes reports through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, error: &ManifestError) {
        log::error!("{error}");
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub reports: Vec<(ErrorKind, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.reports.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn last_kind(&self) -> Option<ErrorKind> {
        self.reports.last().map(|(kind, _)| *kind)
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&mut self, error: &ManifestError) {
        self.reports.push((error.kind(), error.to_string()));
    }
}
