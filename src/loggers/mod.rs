//! # Diagnostic logger sinks.
//!
//! This module provides the [`Logger`] trait and built-in sinks for the
//! [`Diagnostic`](crate::Diagnostic)s channels report.
//!
//! ## Architecture
//! ```text
//! Channel::publish / fan-out / Next drop
//!        │
//!        └──► Diagnostic ──► Arc<dyn Logger>::on_diagnostic(&Diagnostic)
//!                                   │
//!                         ┌─────────┼──────────┐
//!                         ▼         ▼          ▼
//!                  TracingLogger  LogWriter  Custom
//! ```
//!
//! The bus hands one logger to every channel; [`Bus::set_logger`](crate::Bus::set_logger)
//! swaps it on all live channels at once.
//!
//! ## Implementing a custom sink
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use replaybus::{Diagnostic, Logger};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl Logger for Counter {
//!     fn on_diagnostic(&self, _d: &Diagnostic) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//!     fn name(&self) -> &'static str { "counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod logger;
#[cfg(test)]
pub(crate) mod memory;
mod trace;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use logger::Logger;
pub use trace::TracingLogger;

use std::sync::Arc;

/// Logger used when none is configured.
pub(crate) fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}
