//! # Emission: one run of a middleware chain.
//!
//! An [`Emission`] threads a value through an immutable snapshot of
//! middleware, one step at a time, and hands the final value to a single
//! completion continuation.
//!
//! ## Algorithm
//! ```text
//! digest(0, args)
//!   ├─ i == len ──► resolved: on_resolved(args), exactly once
//!   └─ else ──► middleware[i](args, Next { step: i })
//!                     ├─ next.proceed(v) (now or later) ──► digest(i + 1, v)
//!                     ├─ next.veto()                    ──► stalled, silent
//!                     └─ next dropped                   ──► stalled, EmissionStalled
//! ```
//!
//! ## Rules
//! - The snapshot is taken when the emission is built; later changes to the
//!   channel's live list never reach an in-flight emission.
//! - [`Next`] is a one-shot token: `proceed` consumes it, so a step can
//!   advance the chain at most once.
//! - `proceed` may run on another thread (e.g. from a tokio task); the
//!   continuation then runs there as well.
//! - An empty snapshot resolves immediately with the initial value.
//! - Steps that proceed synchronously are driven by a loop, not by recursion,
//!   so stack use does not grow with chain length.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::loggers::{Logger, default_logger};
use crate::pipeline::middleware::Middleware;

type Resolve<T> = Box<dyn FnOnce(T) + Send>;

/// Where a step's `proceed` result goes.
enum Handoff<T> {
    /// The digest loop is still inside the step call.
    Running,
    /// The step proceeded before returning; the loop picks this up.
    Ready(T, Resolve<T>),
    /// The step returned without proceeding; a later `proceed` drives the chain itself.
    Detached,
}

type Slot<T> = Arc<Mutex<Handoff<T>>>;

fn lock<T>(slot: &Slot<T>) -> MutexGuard<'_, Handoff<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Immutable data shared by every step of one emission.
struct Chain<T> {
    name: Arc<str>,
    steps: Arc<[Middleware<T>]>,
    logger: Arc<dyn Logger>,
}

impl<T> Chain<T> {
    /// Runs steps from `index` on, looping while they proceed synchronously.
    fn digest(self: Arc<Self>, mut index: usize, mut args: T, mut on_resolved: Resolve<T>) {
        let slot: Slot<T> = Arc::new(Mutex::new(Handoff::Running));
        loop {
            let Some(step) = self.steps.get(index).cloned() else {
                on_resolved(args);
                return;
            };
            let next = Next {
                pending: Some(Pending {
                    chain: Arc::clone(&self),
                    step: index,
                    on_resolved,
                    slot: Arc::clone(&slot),
                }),
            };
            step.call(args, next);

            let mut state = lock(&slot);
            match std::mem::replace(&mut *state, Handoff::Running) {
                Handoff::Ready(value, resolve) => {
                    index += 1;
                    args = value;
                    on_resolved = resolve;
                }
                Handoff::Running | Handoff::Detached => {
                    *state = Handoff::Detached;
                    return;
                }
            }
        }
    }
}

/// State carried by a [`Next`] until it is used.
struct Pending<T> {
    chain: Arc<Chain<T>>,
    step: usize,
    on_resolved: Resolve<T>,
    slot: Slot<T>,
}

/// One-shot continuation handed to each middleware step.
///
/// Call [`proceed`](Next::proceed) to continue the chain, [`veto`](Next::veto)
/// to cancel the emission, or move it somewhere and call it later. Dropping it
/// unused cancels the emission as well and reports
/// [`DiagnosticKind::EmissionStalled`].
pub struct Next<T> {
    pending: Option<Pending<T>>,
}

impl<T> Next<T> {
    /// Continues the chain with `args` as the current value.
    ///
    /// Called inside the step, the digest loop takes over once the step
    /// returns; called later, the chain continues on the caller's thread.
    pub fn proceed(mut self, args: T) {
        let Some(p) = self.pending.take() else {
            return;
        };
        {
            let mut state = lock(&p.slot);
            if matches!(*state, Handoff::Running) {
                *state = Handoff::Ready(args, p.on_resolved);
                return;
            }
        }
        p.chain.digest(p.step + 1, args, p.on_resolved);
    }

    /// Cancels the emission without reporting anything.
    pub fn veto(mut self) {
        self.pending.take();
    }

    /// Name of the channel this emission belongs to.
    pub fn channel(&self) -> &str {
        self.pending.as_ref().map(|p| &*p.chain.name).unwrap_or("")
    }

    /// Index of the middleware step holding this token.
    pub fn step(&self) -> usize {
        self.pending.as_ref().map(|p| p.step).unwrap_or(0)
    }

    /// Cancels the emission and reports `diagnostic` instead of a stall.
    pub(crate) fn abandon(mut self, diagnostic: Diagnostic) {
        if let Some(p) = self.pending.take() {
            p.chain.logger.on_diagnostic(&diagnostic);
        }
    }
}

impl<T> Drop for Next<T> {
    fn drop(&mut self) {
        if let Some(p) = self.pending.take() {
            let d = Diagnostic::new(DiagnosticKind::EmissionStalled, Arc::clone(&p.chain.name))
                .with_step(p.step);
            p.chain.logger.on_diagnostic(&d);
        }
    }
}

impl<T> fmt::Debug for Next<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("channel", &self.channel())
            .field("step", &self.step())
            .field("used", &self.pending.is_none())
            .finish()
    }
}

/// A single run of a middleware chain over one published value.
///
/// # Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use replaybus::{Emission, Middleware};
///
/// let out = Arc::new(Mutex::new(None));
/// let sink = Arc::clone(&out);
///
/// Emission::new("numbers", 5, vec![Middleware::map(|n: i32| n * 2), Middleware::map(|n: i32| n + 1)])
///     .then(move |n| *sink.lock().unwrap() = Some(n))
///     .digest();
///
/// assert_eq!(*out.lock().unwrap(), Some(11));
/// ```
pub struct Emission<T> {
    name: Arc<str>,
    args: T,
    steps: Arc<[Middleware<T>]>,
    logger: Option<Arc<dyn Logger>>,
    on_resolved: Option<Resolve<T>>,
}

impl<T> Emission<T> {
    /// Creates an emission over `steps` (the middleware snapshot) starting from `args`.
    pub fn new(
        name: impl Into<Arc<str>>,
        args: T,
        steps: impl Into<Arc<[Middleware<T>]>>,
    ) -> Self {
        Self {
            name: name.into(),
            args,
            steps: steps.into(),
            logger: None,
            on_resolved: None,
        }
    }

    /// Routes this emission's diagnostics to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Registers the completion continuation, invoked once with the final value.
    ///
    /// A later call replaces the earlier continuation.
    pub fn then<F>(mut self, f: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_resolved = Some(Box::new(f));
        self
    }

    /// Number of middleware steps in the snapshot.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Starts digesting the chain from step 0.
    ///
    /// Returns as soon as the chain resolves, stalls, or a step defers its
    /// `proceed`; it never waits for deferred steps.
    pub fn digest(self) {
        let chain = Arc::new(Chain {
            name: self.name,
            steps: self.steps,
            logger: self.logger.unwrap_or_else(default_logger),
        });
        let on_resolved = self.on_resolved.unwrap_or_else(|| Box::new(|_| {}));
        chain.digest(0, self.args, on_resolved);
    }
}

impl<T> fmt::Debug for Emission<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emission")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("has_continuation", &self.on_resolved.is_some())
            .finish()
    }
}
