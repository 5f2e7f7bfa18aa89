//! # Bus and channel configuration.
//!
//! Provides [`BusConfig`] (bus-wide defaults, cascaded to every channel) and
//! [`ChannelConfig`] (what a single [`Channel`](crate::Channel) is built from).
//!
//! ## Sentinel values
//! - `replay_buffer_size = 0` → treated as `1`
//! - `supported_events = None` → every name is supported
//! - `ChannelConfig::name = None` (or empty) → construction fails with
//!   [`BusError::MissingConfig`](crate::BusError::MissingConfig)

use std::collections::HashSet;

/// Construction parameters of a single channel.
///
/// ## Field semantics
/// - `name`: required; unique key of the channel on a bus
/// - `replay`: start with an (empty) replay buffer
/// - `replay_buffer_size`: replay capacity (min 1; clamped)
/// - `no_listeners_warning`: report publishes nobody hears
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Channel name.
    pub name: Option<String>,
    /// Whether replay starts enabled.
    pub replay: bool,
    /// Replay buffer capacity.
    pub replay_buffer_size: usize,
    /// Whether to report `NoListeners` diagnostics.
    pub no_listeners_warning: bool,
}

impl ChannelConfig {
    /// Config for a channel called `name`, everything else default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Enables replay with the given capacity.
    pub fn with_replay(mut self, size: usize) -> Self {
        self.replay = true;
        self.replay_buffer_size = size;
        self
    }

    pub fn with_no_listeners_warning(mut self, on: bool) -> Self {
        self.no_listeners_warning = on;
        self
    }

    /// Returns the replay capacity clamped to a minimum of 1.
    #[inline]
    pub fn replay_buffer_size_clamped(&self) -> usize {
        self.replay_buffer_size.max(1)
    }
}

impl Default for ChannelConfig {
    /// Default configuration:
    ///
    /// - `name = None` (must be set)
    /// - `replay = false`
    /// - `replay_buffer_size = 1`
    /// - `no_listeners_warning = false`
    fn default() -> Self {
        Self {
            name: None,
            replay: false,
            replay_buffer_size: 1,
            no_listeners_warning: false,
        }
    }
}

/// Bus-wide settings.
///
/// New channels are created from the bus's *current* settings; changing a
/// setting through the bus cascades to every live channel.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// A disabled bus drops every publish.
    pub enabled: bool,

    /// Whether channels record replay history.
    pub replay: bool,

    /// Replay capacity of every channel (min 1; clamped).
    pub replay_buffer_size: usize,

    /// Report publishes on channels without listeners.
    pub no_listeners_warning: bool,

    /// Report publishes of names outside `supported_events`.
    pub unsupported_event_warning: bool,

    /// Allow-list of channel names accepted by `publish`.
    ///
    /// - `None` → every name is supported
    /// - `Some(list)` → only names in `list`
    pub supported_events: Option<Vec<String>>,
}

impl BusConfig {
    /// Returns the replay capacity clamped to a minimum of 1.
    #[inline]
    pub fn replay_buffer_size_clamped(&self) -> usize {
        self.replay_buffer_size.max(1)
    }

    /// Returns the allow-list as a set, if any.
    pub fn supported_events_set(&self) -> Option<HashSet<String>> {
        self.supported_events
            .as_ref()
            .map(|names| names.iter().cloned().collect())
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `enabled = true`
    /// - `replay = true`
    /// - `replay_buffer_size = 1`
    /// - `no_listeners_warning = true`
    /// - `unsupported_event_warning = true`
    /// - `supported_events = None` (everything allowed)
    fn default() -> Self {
        Self {
            enabled: true,
            replay: true,
            replay_buffer_size: 1,
            no_listeners_warning: true,
            unsupported_event_warning: true,
            supported_events: None,
        }
    }
}
