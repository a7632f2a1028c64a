//! Collects the diagnostics of one linking session.

use crate::diagnostic::Diagnostic;
use crate::severity::{Severity, SeverityCounts};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Diagnostics reported while linking, in emission order.
///
/// Shared by reference between the linker and the passes it runs, so
/// emitting only needs `&self`. Errors are also counted on the side, which
/// keeps `has_errors` off the lock.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Records `diag`. Partial linkage set to the error level lands here as
    /// [`Severity::Error`] and fails the link.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        let mut diagnostics = self.diagnostics.lock().unwrap();
        diagnostics.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Tally per severity of everything emitted so far.
    pub fn counts(&self) -> SeverityCounts {
        let diagnostics = self.diagnostics.lock().unwrap();
        diagnostics.iter().map(|d| d.severity).collect()
    }

    /// Drains the sink. The error count is kept.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.lock().unwrap();
        std::mem::take(&mut *diagnostics)
    }

    /// Snapshot, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let diagnostics = self.diagnostics.lock().unwrap();
        diagnostics.clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}
