//! Channels: named publish/subscribe units and their registration handles.
//!
//! ## Contents
//! - [`Channel`] subscriber set, middleware list and replay buffer of one name
//! - [`Listener`] shared callback receiving resolved values
//! - [`ReplayBuffer`] bounded history used to catch up late subscribers
//! - [`ListenerHandle`], [`MiddlewareHandle`] remove/replay capabilities
//!
//! See [`Channel`] for the emission flow.

#[allow(clippy::module_inception)]
mod channel;
mod handle;
mod listener;
mod replay;

pub use channel::Channel;
pub use handle::{ListenerHandle, MiddlewareHandle};
pub use listener::Listener;
pub use replay::ReplayBuffer;
