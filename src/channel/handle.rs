//! # Registration handles.
//!
//! Returned by `subscribe` / `use_middleware`. A handle only keeps a weak
//! reference to its channel; it never keeps the channel alive and dropping it
//! does **not** unregister anything.
//!
//! - [`ListenerHandle`] - `remove()` and `replay(n)`.
//! - [`MiddlewareHandle`] - `remove()`.
//!
//! `remove()` is idempotent. Handles issued by a [`Bus`](crate::Bus) also
//! let the bus drop the channel once its last listener is gone.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::channel::channel::Channel;
use crate::channel::listener::Listener;
use crate::core::Registry;
use crate::error::BusError;
use crate::pipeline::Middleware;

/// Capability to remove or replay into one subscribed listener.
pub struct ListenerHandle<T> {
    channel: Weak<Channel<T>>,
    name: Arc<str>,
    listener: Listener<T>,
    registry: Option<Weak<Registry<T>>>,
    removed: AtomicBool,
}

impl<T> ListenerHandle<T> {
    pub(crate) fn new(
        channel: Weak<Channel<T>>,
        name: Arc<str>,
        listener: Listener<T>,
        registry: Option<Weak<Registry<T>>>,
    ) -> Self {
        Self {
            channel,
            name,
            listener,
            registry,
            removed: AtomicBool::new(false),
        }
    }

    /// The listener this handle is bound to.
    pub fn listener(&self) -> &Listener<T> {
        &self.listener
    }

    /// Name of the channel the listener was subscribed on.
    pub fn channel_name(&self) -> &str {
        &self.name
    }

    /// Returns true once [`remove`](Self::remove) has been called.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

impl<T: Clone + Send + 'static> ListenerHandle<T> {
    /// Unsubscribes the listener. Calling it again is a no-op.
    pub fn remove(&self) {
        if self.removed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(channel) = self.channel.upgrade() else {
            return;
        };
        channel.unsubscribe(&self.listener);
        if let Some(registry) = self.registry.as_ref().and_then(Weak::upgrade) {
            registry.prune(&channel);
        }
    }

    /// Delivers the last `n` buffered values to this listener, oldest first.
    ///
    /// # Errors
    /// - [`BusError::ReplayNotEnabled`] if the channel has replay off.
    /// - [`BusError::ChannelDropped`] if the channel no longer exists.
    pub fn replay(&self, n: usize) -> Result<&Self, BusError> {
        let channel = self.channel.upgrade().ok_or_else(|| BusError::ChannelDropped {
            channel: Arc::clone(&self.name),
        })?;
        channel.replay_to(&self.listener, n)?;
        Ok(self)
    }
}

impl<T> fmt::Debug for ListenerHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("channel", &self.name)
            .field("listener", &self.listener)
            .field("removed", &self.is_removed())
            .finish()
    }
}

/// Capability to remove one middleware step.
pub struct MiddlewareHandle<T> {
    channel: Weak<Channel<T>>,
    middleware: Middleware<T>,
    removed: AtomicBool,
}

impl<T> MiddlewareHandle<T> {
    pub(crate) fn new(channel: Weak<Channel<T>>, middleware: Middleware<T>) -> Self {
        Self {
            channel,
            middleware,
            removed: AtomicBool::new(false),
        }
    }

    pub fn middleware(&self) -> &Middleware<T> {
        &self.middleware
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Removes the middleware from its channel. Calling it again is a no-op.
    pub fn remove(&self) {
        if self.removed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(channel) = self.channel.upgrade() {
            channel.remove_middleware(&self.middleware);
        }
    }
}

impl<T> fmt::Debug for MiddlewareHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareHandle")
            .field("middleware", &self.middleware)
            .field("removed", &self.is_removed())
            .finish()
    }
}
