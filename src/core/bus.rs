//! # Bus: named channels behind one publish/subscribe surface.
//!
//! The [`Bus`] owns a [`Registry`] of channels keyed by name. Channels are
//! created lazily on first publish, subscribe or middleware registration, and
//! dropped once a listener removal leaves them without listeners.
//!
//! ## Key responsibilities
//! - route `publish(name, value)` to the right [`Channel`]
//! - hold bus-wide settings and **cascade** every change to all live channels
//! - gate publishes through the enabled flag and the supported-event allow-list
//!
//! ## High-level architecture
//! ```text
//! publish(name, args)
//!   ├─ bus disabled ──────────────► dropped
//!   ├─ name not supported ────────► dropped (+ UnsupportedEvent if warning on)
//!   └─ Registry::get_or_create(name) ──► Channel::publish(args)
//!
//! set_logger / enable_replay / set_replay_buffer_size / ...
//!   └─ Registry::cascade ──► settings updated ──► every live Channel updated
//!
//! unsubscribe(name, listener) / ListenerHandle::remove()
//!   └─ Channel::unsubscribe ──► Registry::prune (drops channel at 0 listeners)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use replaybus::{Bus, BusConfig};
//!
//! let bus: Bus<u32> = Bus::new(BusConfig { replay_buffer_size: 2, ..BusConfig::default() });
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let _first = bus.on("orders", |_n| {}).unwrap();
//! bus.publish("orders", 1);
//! bus.publish("orders", 2);
//! bus.publish("orders", 3);
//!
//! let late = bus.on("orders", move |n| sink.lock().unwrap().push(*n)).unwrap();
//! late.replay(2).unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::channel::{Channel, Listener, ListenerHandle, MiddlewareHandle};
use crate::core::builder::BusBuilder;
use crate::core::config::BusConfig;
use crate::core::registry::Registry;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::BusError;
use crate::loggers::{Logger, default_logger};
use crate::pipeline::Middleware;

/// Registry of named channels carrying values of type `T`.
///
/// Cheap to clone; clones share the same channels and settings.
pub struct Bus<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Bus<T> {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl<T> Bus<T> {
    /// Starts building a bus from `cfg`.
    pub fn builder(cfg: BusConfig) -> BusBuilder<T> {
        BusBuilder::new(cfg)
    }

    pub(crate) fn from_parts(cfg: &BusConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            registry: Registry::new(cfg, logger),
        }
    }

    // ---------------------------
    // Bus-wide switches
    // ---------------------------

    pub fn is_enabled(&self) -> bool {
        self.registry.read().settings.enabled
    }

    /// Resumes delivery after [`disable`](Self::disable).
    pub fn enable(&self) {
        self.registry.write().settings.enabled = true;
    }

    /// Drops every publish until re-enabled. Registrations keep working.
    pub fn disable(&self) {
        self.registry.write().settings.enabled = false;
    }

    pub fn replay_is_enabled(&self) -> bool {
        self.registry.read().settings.replay
    }

    /// Enables replay on the bus and on every live channel.
    pub fn enable_replay(&self) {
        self.registry.cascade(|settings, channels| {
            if settings.replay {
                return;
            }
            settings.replay = true;
            for ch in channels {
                ch.enable_replay();
            }
        });
    }

    /// Disables replay on the bus and discards every channel's buffer.
    pub fn disable_replay(&self) {
        self.registry.cascade(|settings, channels| {
            if !settings.replay {
                return;
            }
            settings.replay = false;
            for ch in channels {
                ch.disable_replay();
            }
        });
    }

    /// Current bus-wide replay capacity.
    pub fn replay_buffer_size(&self) -> usize {
        self.registry.read().settings.replay_buffer_size
    }

    /// Sets the replay capacity of the bus and every live channel.
    ///
    /// Shrinking keeps the **earliest** buffered entries of each channel.
    ///
    /// # Errors
    /// - [`BusError::ReplayDisabled`] if bus replay is off.
    /// - [`BusError::InvalidBufferSize`] if `size == 0`.
    pub fn set_replay_buffer_size(&self, size: usize) -> Result<(), BusError> {
        let mut result = Ok(());
        self.registry.cascade(|settings, channels| {
            if !settings.replay {
                result = Err(BusError::ReplayDisabled);
                return;
            }
            if size == 0 {
                result = Err(BusError::InvalidBufferSize { size });
                return;
            }
            settings.replay_buffer_size = size;
            for ch in channels {
                ch.apply_replay_capacity(size);
            }
        });
        result
    }

    /// Empties every channel's replay buffer.
    ///
    /// # Errors
    /// [`BusError::ReplayDisabled`] if bus replay is off.
    pub fn clear_replay_buffers(&self) -> Result<(), BusError> {
        let inner = self.registry.read();
        if !inner.settings.replay {
            return Err(BusError::ReplayDisabled);
        }
        for ch in inner.channels.values() {
            // channels with replay switched off individually have nothing to clear
            let _ = ch.clear_replay_buffer();
        }
        Ok(())
    }

    /// Empties the replay buffer of `name`, if that channel exists.
    ///
    /// # Errors
    /// - [`BusError::ReplayDisabled`] if bus replay is off.
    /// - [`BusError::ReplayNotEnabled`] if that channel has replay off.
    pub fn clear_replay_buffer_for(&self, name: &str) -> Result<(), BusError> {
        if !self.replay_is_enabled() {
            return Err(BusError::ReplayDisabled);
        }
        match self.registry.get(name) {
            Some(ch) => ch.clear_replay_buffer(),
            None => Ok(()),
        }
    }

    pub fn no_listeners_warning(&self) -> bool {
        self.registry.read().settings.no_listeners_warning
    }

    pub fn enable_no_listeners_warning(&self) {
        self.registry.cascade(|settings, channels| {
            if settings.no_listeners_warning {
                return;
            }
            settings.no_listeners_warning = true;
            for ch in channels {
                ch.enable_no_listeners_warning();
            }
        });
    }

    pub fn disable_no_listeners_warning(&self) {
        self.registry.cascade(|settings, channels| {
            if !settings.no_listeners_warning {
                return;
            }
            settings.no_listeners_warning = false;
            for ch in channels {
                ch.disable_no_listeners_warning();
            }
        });
    }

    /// Replaces the diagnostic sink of the bus and every live channel.
    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        self.registry.cascade(|settings, channels| {
            for ch in channels {
                ch.set_logger(Arc::clone(&logger));
            }
            settings.logger = logger;
        });
    }

    // ---------------------------
    // Supported events
    // ---------------------------

    /// Restricts `publish` to the given names.
    pub fn set_supported_events<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        self.registry.write().settings.supported = Some(names);
    }

    /// Lifts the allow-list; every name becomes supported again.
    pub fn clear_supported_events(&self) {
        self.registry.write().settings.supported = None;
    }

    /// Adds `name` to the allow-list, creating the list if there is none.
    pub fn add_supported_event(&self, name: impl Into<String>) {
        self.registry
            .write()
            .settings
            .supported
            .get_or_insert_with(HashSet::new)
            .insert(name.into());
    }

    /// Removes `name` from the allow-list, if there is one.
    pub fn remove_supported_event(&self, name: &str) {
        if let Some(names) = self.registry.write().settings.supported.as_mut() {
            names.remove(name);
        }
    }

    pub fn event_is_supported(&self, name: &str) -> bool {
        self.registry.read().settings.is_supported(name)
    }

    pub fn enable_unsupported_event_warning(&self) {
        self.registry.write().settings.unsupported_event_warning = true;
    }

    pub fn disable_unsupported_event_warning(&self) {
        self.registry.write().settings.unsupported_event_warning = false;
    }

    // ---------------------------
    // Channel lifecycle
    // ---------------------------

    /// Returns the channel registered under `name`, without creating it.
    pub fn get_channel(&self, name: &str) -> Option<Arc<Channel<T>>> {
        self.registry.get(name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.registry.get(name).is_some()
    }

    /// Drops the channel registered under `name`; returns false if there was none.
    ///
    /// In-flight emissions of a dropped channel are discarded on resolution.
    pub fn remove_channel(&self, name: &str) -> bool {
        self.registry.remove(name).is_some()
    }

    /// Returns sorted list of live channel names.
    pub fn channel_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Copy of the replay buffer of `name`; `None` if the channel does not
    /// exist or has replay off.
    pub fn replay_buffer(&self, name: &str) -> Option<Vec<T>>
    where
        T: Clone + Send + 'static,
    {
        self.registry.get(name).and_then(|ch| ch.replay_buffer())
    }
}

impl<T: Clone + Send + 'static> Bus<T> {
    /// Creates a bus reporting diagnostics through `tracing`.
    pub fn new(cfg: BusConfig) -> Self {
        Self::from_parts(&cfg, default_logger())
    }

    /// Returns the channel for `name`, creating it if needed.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `name` is empty.
    pub fn channel(&self, name: &str) -> Result<Arc<Channel<T>>, BusError> {
        self.registry.get_or_create(name)
    }

    /// Publishes `args` on `name`.
    ///
    /// Silently dropped when the bus is disabled, the name is not supported,
    /// or the name is empty (nothing can subscribe to it).
    pub fn publish(&self, name: &str, args: T) {
        let (supported, warn, logger) = {
            let inner = self.registry.read();
            let s = &inner.settings;
            if !s.enabled {
                return;
            }
            (
                s.is_supported(name),
                s.unsupported_event_warning,
                Arc::clone(&s.logger),
            )
        };

        if !supported {
            if warn {
                logger.on_diagnostic(&Diagnostic::new(DiagnosticKind::UnsupportedEvent, name));
            }
            return;
        }

        if let Ok(ch) = self.registry.get_or_create(name) {
            ch.publish(args);
        }
    }

    /// Subscribes `listener` on `name` and returns its handle.
    ///
    /// Removing the returned handle drops the channel once it has no listeners.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `name` is empty.
    pub fn subscribe(&self, name: &str, listener: Listener<T>) -> Result<ListenerHandle<T>, BusError> {
        let ch = self.registry.attach(name, &listener)?;
        Ok(ListenerHandle::new(
            Arc::downgrade(&ch),
            ch.name_arc(),
            listener,
            Some(Arc::downgrade(&self.registry)),
        ))
    }

    /// Shorthand for `subscribe(name, Listener::new(f))`.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `name` is empty.
    pub fn on<F>(&self, name: &str, f: F) -> Result<ListenerHandle<T>, BusError>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(name, Listener::new(f))
    }

    /// Removes `listener` from `name`; drops the channel once it has no listeners.
    ///
    /// Returns false if the listener was not subscribed there.
    pub fn unsubscribe(&self, name: &str, listener: &Listener<T>) -> bool {
        let Some(ch) = self.registry.get(name) else {
            return false;
        };
        let removed = ch.unsubscribe(listener);
        if removed {
            self.registry.prune(&ch);
        }
        removed
    }

    /// Removes every listener from `name` and drops the channel.
    pub fn remove_all_listeners(&self, name: &str) {
        if let Some(ch) = self.registry.get(name) {
            ch.clear_listeners();
            self.registry.prune(&ch);
        }
    }

    /// Appends `middleware` to the chain of `name`.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `name` is empty.
    pub fn use_middleware(
        &self,
        name: &str,
        middleware: Middleware<T>,
    ) -> Result<MiddlewareHandle<T>, BusError> {
        let ch = self.registry.get_or_create(name)?;
        Ok(ch.use_middleware(middleware))
    }

    /// Removes `middleware` from the chain of `name`.
    ///
    /// Returns false if it was not registered there.
    pub fn remove_middleware(&self, name: &str, middleware: &Middleware<T>) -> bool {
        self.registry
            .get(name)
            .is_some_and(|ch| ch.remove_middleware(middleware))
    }
}

impl<T> fmt::Debug for Bus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.registry.read();
        let s = &inner.settings;
        f.debug_struct("Bus")
            .field("channels", &inner.channels.len())
            .field("enabled", &s.enabled)
            .field("replay", &s.replay)
            .field("replay_buffer_size", &s.replay_buffer_size)
            .field("logger", &s.logger.name())
            .finish()
    }
}
