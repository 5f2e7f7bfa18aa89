//! # Diagnostics emitted by channels and the bus.
//!
//! The [`DiagnosticKind`] enum classifies what happened:
//! - **Delivery warnings**: nobody was listening, or the name is not supported
//! - **Isolation reports**: a listener or async middleware panicked
//! - **Chain traces**: an emission stalled (vetoed) or could not be scheduled
//!
//! ## Ordering guarantees
//! Each diagnostic has a globally unique sequence number (`seq`) that increases
//! monotonically, so sinks can restore the order of reports coming from
//! different threads.
//!
//! ## Example
//! ```rust
//! use replaybus::{Diagnostic, DiagnosticKind};
//!
//! let d = Diagnostic::new(DiagnosticKind::NoListeners, "orders")
//!     .with_reason("no listeners registered");
//!
//! assert_eq!(d.kind, DiagnosticKind::NoListeners);
//! assert_eq!(&*d.channel, "orders");
//! assert_eq!(d.reason.as_deref(), Some("no listeners registered"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for diagnostic ordering.
static DIAGNOSTIC_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A value was published on a channel that has no listeners.
    ///
    /// Only reported while the channel's no-listener warning is on.
    NoListeners,

    /// A value was published under a name outside the bus allow-list.
    ///
    /// Only reported while the bus's unsupported-event warning is on.
    UnsupportedEvent,

    /// A listener panicked while receiving a value (fan-out or replay).
    ///
    /// Sets:
    /// - `reason`: panic message
    ListenerPanicked,

    /// An async middleware step panicked; the emission was vetoed.
    ///
    /// Sets:
    /// - `reason`: panic message
    /// - `step`: middleware index
    MiddlewarePanicked,

    /// A middleware dropped its continuation without proceeding.
    ///
    /// Sets:
    /// - `step`: middleware index
    EmissionStalled,

    /// An async middleware step ran outside a tokio runtime; the emission was vetoed.
    ///
    /// Sets:
    /// - `step`: middleware index
    NoRuntime,
}

impl DiagnosticKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DiagnosticKind::NoListeners => "no_listeners",
            DiagnosticKind::UnsupportedEvent => "unsupported_event",
            DiagnosticKind::ListenerPanicked => "listener_panicked",
            DiagnosticKind::MiddlewarePanicked => "middleware_panicked",
            DiagnosticKind::EmissionStalled => "emission_stalled",
            DiagnosticKind::NoRuntime => "no_runtime",
        }
    }

    /// Default severity a sink should use for this kind.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::NoListeners | DiagnosticKind::UnsupportedEvent => Severity::Warn,
            DiagnosticKind::ListenerPanicked
            | DiagnosticKind::MiddlewarePanicked
            | DiagnosticKind::NoRuntime => Severity::Error,
            DiagnosticKind::EmissionStalled => Severity::Debug,
        }
    }
}

/// How loud a sink should be about a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Warn,
    Error,
}

/// Diagnostic report with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`DiagnosticKind`]
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Diagnostic classification.
    pub kind: DiagnosticKind,
    /// Name of the channel that reported it.
    pub channel: Arc<str>,
    /// Human-readable reason (panic message, etc.).
    pub reason: Option<Arc<str>>,
    /// Index of the middleware step involved, if any.
    pub step: Option<usize>,
}

impl Diagnostic {
    /// Creates a new diagnostic with current timestamp and next sequence number.
    pub fn new(kind: DiagnosticKind, channel: impl Into<Arc<str>>) -> Self {
        Self {
            seq: DIAGNOSTIC_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            channel: channel.into(),
            reason: None,
            step: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the middleware step index.
    #[inline]
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Creates a listener panic report.
    #[inline]
    pub fn listener_panicked(channel: impl Into<Arc<str>>, info: String) -> Self {
        Diagnostic::new(DiagnosticKind::ListenerPanicked, channel).with_reason(info)
    }

    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::ListenerPanicked | DiagnosticKind::MiddlewarePanicked
        )
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Diagnostic::new(DiagnosticKind::NoListeners, "a");
        let b = Diagnostic::new(DiagnosticKind::NoListeners, "b");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(DiagnosticKind::NoListeners.severity(), Severity::Warn);
        assert_eq!(DiagnosticKind::EmissionStalled.severity(), Severity::Debug);
        assert!(Diagnostic::listener_panicked("x", "boom".into()).is_panic());
    }
}
