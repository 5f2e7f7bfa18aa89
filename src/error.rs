//! Error types used by channels and the bus.
//!
//! Everything fallible in this crate returns [`BusError`]. Errors are raised
//! synchronously at the call that broke the contract and leave the channel
//! state untouched; there is no internal retry.
//!
//! Like the rest of the crate, the enum provides `as_label` / `as_message`
//! helpers for logs and metrics.

use std::sync::Arc;

use thiserror::Error;

/// # Errors produced by channels and the bus.
///
/// Two classes exist:
/// - **configuration errors** ([`BusError::MissingConfig`]) raised on construction;
/// - **capability misuse** (everything else) raised when an operation needs
///   a capability the channel does not currently have.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A required configuration field was not provided.
    #[error("config.{field} is required")]
    MissingConfig {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A replay-dependent operation ran on a channel whose replay is off.
    #[error("replay is not enabled for channel {channel:?}")]
    ReplayNotEnabled {
        /// Name of the channel.
        channel: Arc<str>,
    },

    /// A bus-wide replay operation ran while global replay is off.
    #[error("replay is not enabled on the bus")]
    ReplayDisabled,

    /// Replay buffer capacity must be at least 1.
    #[error("replay buffer size needs to be >= 1 (got {size})")]
    InvalidBufferSize {
        /// The rejected capacity.
        size: usize,
    },

    /// The channel behind a handle no longer exists.
    #[error("channel {channel:?} has been dropped")]
    ChannelDropped {
        /// Name of the channel the handle was issued by.
        channel: Arc<str>,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use replaybus::BusError;
    ///
    /// let err = BusError::InvalidBufferSize { size: 0 };
    /// assert_eq!(err.as_label(), "invalid_buffer_size");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::MissingConfig { .. } => "config_missing_field",
            BusError::ReplayNotEnabled { .. } => "replay_not_enabled",
            BusError::ReplayDisabled => "replay_disabled",
            BusError::InvalidBufferSize { .. } => "invalid_buffer_size",
            BusError::ChannelDropped { .. } => "channel_dropped",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::MissingConfig { field } => format!("missing config field: {field}"),
            BusError::ReplayNotEnabled { channel } => format!("replay off: channel={channel}"),
            BusError::ReplayDisabled => "replay off: bus".to_string(),
            BusError::InvalidBufferSize { size } => format!("invalid buffer size: {size}"),
            BusError::ChannelDropped { channel } => format!("dropped: channel={channel}"),
        }
    }

    /// Indicates whether the error comes from construction-time configuration.
    ///
    /// # Example
    /// ```
    /// use replaybus::BusError;
    ///
    /// assert!(BusError::MissingConfig { field: "name" }.is_config());
    /// assert!(!BusError::ReplayDisabled.is_config());
    /// ```
    pub fn is_config(&self) -> bool {
        matches!(self, BusError::MissingConfig { .. })
    }
}
