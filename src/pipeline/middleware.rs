//! # Middleware: chain steps that transform or veto a published value.
//!
//! A [`Middleware`] is a shared function of `(value, next)`. It continues the
//! chain by calling [`Next::proceed`] (now or later) or vetoes the emission by
//! never doing so. Identity is reference identity: two clones of the same
//! `Middleware` are equal, two separately built ones never are.
//!
//! Async steps implement [`AsyncMiddleware`] (or wrap a closure in
//! [`MiddlewareFn`]) and are adapted with [`Middleware::from_async`]. The step
//! is spawned on the ambient tokio runtime and proceeds with the value it
//! returns; `None` vetoes.
//!
//! ## Example
//! ```rust
//! use replaybus::Middleware;
//!
//! let double: Middleware<i64> = Middleware::map(|n| n * 2);
//! let only_even: Middleware<i64> = Middleware::filter(|n| n % 2 == 0);
//! let manual: Middleware<i64> = Middleware::new(|n, next| {
//!     if n > 0 {
//!         next.proceed(n);
//!     }
//! });
//! assert_ne!(double, only_even);
//! assert_eq!(manual, manual.clone());
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::diagnostics::{Diagnostic, DiagnosticKind, panic_message};
use crate::pipeline::emission::Next;

type StepFn<T> = dyn Fn(T, Next<T>) + Send + Sync;

/// Shared middleware step.
pub struct Middleware<T> {
    f: Arc<StepFn<T>>,
}

impl<T> Middleware<T> {
    /// Creates a middleware from a `(value, next)` function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T, Next<T>) + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Creates a middleware that always proceeds with `f(value)`.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::new(move |args, next| next.proceed(f(args)))
    }

    /// Creates a middleware that proceeds unchanged when `keep` returns true
    /// and vetoes the emission otherwise.
    pub fn filter<F>(keep: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::new(move |args, next| {
            if keep(&args) {
                next.proceed(args);
            } else {
                next.veto();
            }
        })
    }

    /// Returns true if both values refer to the same registered step.
    #[inline]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    #[inline]
    pub(crate) fn call(&self, args: T, next: Next<T>) {
        (self.f)(args, next)
    }
}

impl<T: Send + 'static> Middleware<T> {
    /// Adapts an [`AsyncMiddleware`] into a chain step.
    ///
    /// ### Rules
    /// - The step is spawned on the current tokio runtime; `publish` returns
    ///   before it completes.
    /// - `Some(v)` proceeds with `v`, `None` vetoes.
    /// - Outside a runtime the emission is vetoed and `NoRuntime` is reported.
    /// - A panic inside the step is caught, reported as `MiddlewarePanicked`,
    ///   and vetoes the emission.
    pub fn from_async<A>(step: A) -> Self
    where
        A: AsyncMiddleware<T>,
    {
        let step = Arc::new(step);
        Self::new(move |args, next: Next<T>| {
            let runtime = match tokio::runtime::Handle::try_current() {
                Ok(rt) => rt,
                Err(_) => {
                    let d = Diagnostic::new(DiagnosticKind::NoRuntime, next.channel())
                        .with_step(next.step());
                    next.abandon(d);
                    return;
                }
            };

            let step = Arc::clone(&step);
            runtime.spawn(async move {
                match AssertUnwindSafe(step.handle(args)).catch_unwind().await {
                    Ok(Some(out)) => next.proceed(out),
                    Ok(None) => next.veto(),
                    Err(panic_err) => {
                        let d = Diagnostic::new(DiagnosticKind::MiddlewarePanicked, next.channel())
                            .with_step(next.step())
                            .with_reason(panic_message(&*panic_err));
                        next.abandon(d);
                    }
                }
            });
        })
    }

    /// Shorthand for `from_async(MiddlewareFn::new(f))`.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        Self::from_async(MiddlewareFn::new(f))
    }
}

impl<T> Clone for Middleware<T> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<T> PartialEq for Middleware<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<T> Eq for Middleware<T> {}

impl<T> fmt::Debug for Middleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("ptr", &Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// # Asynchronous middleware step.
///
/// Receives the current value and resolves to the value the chain should
/// continue with, or `None` to veto the emission.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use replaybus::{AsyncMiddleware, Middleware};
///
/// struct Enrich;
///
/// #[async_trait]
/// impl AsyncMiddleware<String> for Enrich {
///     async fn handle(&self, args: String) -> Option<String> {
///         Some(format!("{args}!"))
///     }
/// }
///
/// let _step: Middleware<String> = Middleware::from_async(Enrich);
/// ```
#[async_trait]
pub trait AsyncMiddleware<T: Send + 'static>: Send + Sync + 'static {
    /// Runs the step.
    async fn handle(&self, args: T) -> Option<T>;
}

/// Function-backed async middleware.
///
/// Wraps a closure that *creates* a new future per emission.
#[derive(Debug)]
pub struct MiddlewareFn<F> {
    f: F,
}

impl<F> MiddlewareFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> AsyncMiddleware<T> for MiddlewareFn<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    async fn handle(&self, args: T) -> Option<T> {
        (self.f)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::pipeline::emission::Emission;

    fn run<T: Send + 'static>(chain: Vec<Middleware<T>>, args: T) -> Arc<Mutex<Option<T>>> {
        let out = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&out);
        Emission::new("test", args, chain)
            .then(move |v| *sink.lock().unwrap() = Some(v))
            .digest();
        out
    }

    #[test]
    fn test_identity_is_by_reference() {
        let a: Middleware<u8> = Middleware::map(|v| v);
        let b: Middleware<u8> = Middleware::map(|v| v);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_filter_vetoes() {
        let keep_small = Middleware::filter(|v: &u32| *v < 10);
        assert_eq!(*run(vec![keep_small.clone()], 3).lock().unwrap(), Some(3));
        assert_eq!(*run(vec![keep_small], 30).lock().unwrap(), None);
    }

    #[tokio::test]
    async fn test_async_step_proceeds_later() {
        let slow = Middleware::from_async_fn(|v: u32| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Some(v + 1)
        });
        let (tx, rx) = tokio::sync::oneshot::channel();
        Emission::new("test", 1_u32, vec![slow, Middleware::map(|v: u32| v * 10)])
            .then(move |v| {
                let _ = tx.send(v);
            })
            .digest();
        assert_eq!(rx.await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_async_none_vetoes() {
        let deny = Middleware::from_async_fn(|_v: u32| async move { None });
        let out = run(vec![deny], 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*out.lock().unwrap(), None);
    }

    #[test]
    fn test_async_without_runtime_vetoes() {
        let step = Middleware::from_async_fn(|v: u32| async move { Some(v) });
        let out = run(vec![step], 1);
        assert_eq!(*out.lock().unwrap(), None);
    }

    #[tokio::test]
    async fn test_async_panic_is_reported_and_vetoes() {
        let logger = Arc::new(crate::loggers::memory::MemoryLogger::default());
        let boom = Middleware::from_async_fn(|v: u32| async move {
            if v > 0 {
                panic!("boom");
            }
            Some(v)
        });
        let out = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&out);
        Emission::new("test", 1_u32, vec![boom])
            .with_logger(logger.clone())
            .then(move |v| *sink.lock().unwrap() = Some(v))
            .digest();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*out.lock().unwrap(), None);
        assert_eq!(logger.count(DiagnosticKind::MiddlewarePanicked), 1);
    }
}
