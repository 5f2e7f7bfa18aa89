//! # Channel registry - name → channel mapping and live bus settings.
//!
//! The registry is the single source of truth for which channels exist and
//! for the settings new channels are created with.
//!
//! ## Architecture
//! ```text
//! Bus ──► Registry
//!           ├─► get_or_create(name) → Arc<Channel>   (from current settings)
//!           ├─► prune(channel)      → drop entry once it has no listeners
//!           └─► cascade(f)          → apply f to every live channel
//! ```
//!
//! ## Rules
//! - One `RwLock` guards the map and the settings together, so a channel is
//!   never created from settings a concurrent cascade is about to change.
//! - The lock is never held while listeners or middleware run.
//! - Lock order is always registry → channel; channels never call back here.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::channel::{Channel, Listener};
use crate::core::config::{BusConfig, ChannelConfig};
use crate::error::BusError;
use crate::loggers::Logger;

/// Live bus settings (a mutable copy of [`BusConfig`]).
pub(crate) struct Settings {
    pub(crate) enabled: bool,
    pub(crate) replay: bool,
    pub(crate) replay_buffer_size: usize,
    pub(crate) no_listeners_warning: bool,
    pub(crate) unsupported_event_warning: bool,
    pub(crate) supported: Option<HashSet<String>>,
    pub(crate) logger: Arc<dyn Logger>,
}

impl Settings {
    fn from_config(cfg: &BusConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            enabled: cfg.enabled,
            replay: cfg.replay,
            replay_buffer_size: cfg.replay_buffer_size_clamped(),
            no_listeners_warning: cfg.no_listeners_warning,
            unsupported_event_warning: cfg.unsupported_event_warning,
            supported: cfg.supported_events_set(),
            logger,
        }
    }

    fn channel_config(&self, name: &str) -> ChannelConfig {
        ChannelConfig {
            name: Some(name.to_string()),
            replay: self.replay,
            replay_buffer_size: self.replay_buffer_size,
            no_listeners_warning: self.no_listeners_warning,
        }
    }

    pub(crate) fn is_supported(&self, name: &str) -> bool {
        self.supported
            .as_ref()
            .is_none_or(|names| names.contains(name))
    }
}

pub(crate) struct Inner<T> {
    pub(crate) channels: HashMap<String, Arc<Channel<T>>>,
    pub(crate) settings: Settings,
}

/// Name → channel registry shared by a [`Bus`](crate::Bus) and its handles.
pub(crate) struct Registry<T> {
    inner: RwLock<Inner<T>>,
}

impl<T> Registry<T> {
    pub(crate) fn new(cfg: &BusConfig, logger: Arc<dyn Logger>) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner {
                channels: HashMap::new(),
                settings: Settings::from_config(cfg, logger),
            }),
        })
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the channel registered under `name`, if any.
    pub(crate) fn get(&self, name: &str) -> Option<Arc<Channel<T>>> {
        self.read().channels.get(name).cloned()
    }

    /// Removes and returns the channel registered under `name`.
    pub(crate) fn remove(&self, name: &str) -> Option<Arc<Channel<T>>> {
        self.write().channels.remove(name)
    }

    /// Returns sorted list of live channel names.
    pub(crate) fn names(&self) -> Vec<String> {
        let inner = self.read();
        let mut names: Vec<String> = inner.channels.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Applies `f` to every live channel while holding the settings write lock.
    ///
    /// `f` must not run user callbacks.
    pub(crate) fn cascade<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings, &[Arc<Channel<T>>]),
    {
        let mut inner = self.write();
        let channels: Vec<Arc<Channel<T>>> = inner.channels.values().cloned().collect();
        f(&mut inner.settings, &channels);
    }

    /// Drops `channel` from the map if it is still the registered one and has no listeners.
    pub(crate) fn prune(&self, channel: &Arc<Channel<T>>) -> bool {
        let mut inner = self.write();
        let is_current = inner
            .channels
            .get(channel.name())
            .is_some_and(|c| Arc::ptr_eq(c, channel));
        if is_current && channel.listener_count() == 0 {
            inner.channels.remove(channel.name());
            true
        } else {
            false
        }
    }
}

impl<T: Clone + Send + 'static> Registry<T> {
    /// Returns the channel for `name`, creating it from the current settings.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `name` is empty.
    pub(crate) fn get_or_create(&self, name: &str) -> Result<Arc<Channel<T>>, BusError> {
        if let Some(ch) = self.get(name) {
            return Ok(ch);
        }
        let mut inner = self.write();
        Self::insert_missing(&mut inner, name)
    }

    /// Subscribes `listener` on `name` while the map lock is held.
    ///
    /// `prune` needs the write lock, so the returned channel is still the
    /// registered one once the listener is on it.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `name` is empty.
    pub(crate) fn attach(&self, name: &str, listener: &Listener<T>) -> Result<Arc<Channel<T>>, BusError> {
        {
            let inner = self.read();
            if let Some(ch) = inner.channels.get(name) {
                ch.add_listener(listener);
                return Ok(Arc::clone(ch));
            }
        }
        let mut inner = self.write();
        let ch = Self::insert_missing(&mut inner, name)?;
        ch.add_listener(listener);
        Ok(ch)
    }

    fn insert_missing(inner: &mut Inner<T>, name: &str) -> Result<Arc<Channel<T>>, BusError> {
        if let Some(ch) = inner.channels.get(name) {
            return Ok(Arc::clone(ch));
        }
        let cfg = inner.settings.channel_config(name);
        let ch = Channel::with_logger(cfg, Arc::clone(&inner.settings.logger))?;
        inner.channels.insert(name.to_string(), Arc::clone(&ch));
        Ok(ch)
    }
}
