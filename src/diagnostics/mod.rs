//! Diagnostics: what channels report to the logger sink.
//!
//! Channels never print anything themselves. Noteworthy situations (a publish
//! nobody hears, a panicking listener, a vetoed emission) are turned into a
//! [`Diagnostic`] and handed to the configured [`Logger`](crate::Logger).
//!
//! ## Contents
//! - [`DiagnosticKind`], [`Diagnostic`] classification and payload metadata

mod diagnostic;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub(crate) use diagnostic::panic_message;
