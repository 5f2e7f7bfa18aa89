//! # Listener: a shared callback receiving resolved values.
//!
//! Identity is reference identity, so the same `Listener` value (or a clone of
//! it) is what you pass to `unsubscribe`.

use std::fmt;
use std::sync::Arc;

type ListenFn<T> = dyn Fn(&T) + Send + Sync;

/// Shared listener callback.
///
/// # Example
/// ```
/// use replaybus::Listener;
///
/// let a: Listener<u32> = Listener::new(|n| println!("got {n}"));
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_ne!(a, Listener::new(|_n: &u32| {}));
/// ```
pub struct Listener<T> {
    f: Arc<ListenFn<T>>,
}

impl<T> Listener<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Returns true if both values refer to the same registered callback.
    #[inline]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    #[inline]
    pub(crate) fn call(&self, args: &T) {
        (self.f)(args)
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<T> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<T> Eq for Listener<T> {}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}
