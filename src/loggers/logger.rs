//! # Core logger trait
//!
//! `Logger` is the extension point for plugging a diagnostic sink into the bus.
//! It is called synchronously, on the thread that produced the diagnostic.
//!
//! ## Contract
//! - Implementations must be cheap; they run inline with `publish`.
//! - A sink must not call back into the channel that reported the diagnostic
//!   while holding its own locks.

use crate::diagnostics::Diagnostic;

/// Contract for diagnostic sinks.
pub trait Logger: Send + Sync + 'static {
    /// Handle a single diagnostic.
    fn on_diagnostic(&self, diagnostic: &Diagnostic);

    /// Human-readable name (for debugging).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
