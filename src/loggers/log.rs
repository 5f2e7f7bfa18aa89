//! # Simple stdout sink for debugging and demos.
//!
//! [`LogWriter`] prints diagnostics to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [no-listeners] channel=orders
//! [unsupported] channel=unknown
//! [listener-panicked] channel=orders err="boom"
//! [middleware-panicked] channel=orders step=1 err="boom"
//! [stalled] channel=orders step=0
//! [no-runtime] channel=orders step=2
//! ```

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::loggers::Logger;

/// Simple stdout logging sink.
///
/// Enabled via the `logging` feature. Not intended for production use;
/// prefer [`TracingLogger`](crate::TracingLogger) or a custom [`Logger`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl Logger for LogWriter {
    fn on_diagnostic(&self, d: &Diagnostic) {
        let ch = &d.channel;
        let err = d.reason.as_deref().unwrap_or("");
        match d.kind {
            DiagnosticKind::NoListeners => println!("[no-listeners] channel={ch}"),
            DiagnosticKind::UnsupportedEvent => println!("[unsupported] channel={ch}"),
            DiagnosticKind::ListenerPanicked => {
                println!("[listener-panicked] channel={ch} err={err:?}")
            }
            DiagnosticKind::MiddlewarePanicked => println!(
                "[middleware-panicked] channel={ch} step={:?} err={err:?}",
                d.step
            ),
            DiagnosticKind::EmissionStalled => {
                println!("[stalled] channel={ch} step={:?}", d.step)
            }
            DiagnosticKind::NoRuntime => println!("[no-runtime] channel={ch} step={:?}", d.step),
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
