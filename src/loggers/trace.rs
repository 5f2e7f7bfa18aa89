//! # `tracing` sink (default).
//!
//! [`TracingLogger`] forwards every diagnostic to the `tracing` macros with
//! structured fields. Severity comes from [`DiagnosticKind::severity`].

use tracing::{debug, error, warn};

use crate::diagnostics::{Diagnostic, Severity};
use crate::loggers::Logger;

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn on_diagnostic(&self, d: &Diagnostic) {
        let label = d.kind.as_label();
        let reason = d.reason.as_deref().unwrap_or("");
        match d.kind.severity() {
            Severity::Debug => {
                debug!(channel = %d.channel, seq = d.seq, step = ?d.step, reason, "{label}")
            }
            Severity::Warn => {
                warn!(channel = %d.channel, seq = d.seq, step = ?d.step, reason, "{label}")
            }
            Severity::Error => {
                error!(channel = %d.channel, seq = d.seq, step = ?d.step, reason, "{label}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
