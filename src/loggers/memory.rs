//! Recording sink for tests.

use std::sync::Mutex;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::loggers::Logger;

#[derive(Default)]
pub(crate) struct MemoryLogger {
    seen: Mutex<Vec<Diagnostic>>,
}

impl MemoryLogger {
    pub(crate) fn kinds(&self) -> Vec<DiagnosticKind> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.kind)
            .collect()
    }

    pub(crate) fn count(&self, kind: DiagnosticKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl Logger for MemoryLogger {
    fn on_diagnostic(&self, d: &Diagnostic) {
        self.seen.lock().unwrap().push(d.clone());
    }
}
