//! Bus core: the channel registry and its public facade.
//!
//! The only public API from this module is [`Bus`] (plus its builder and
//! configs), which owns named channels and cascades bus-wide settings to them.
//!
//! Internal modules:
//! - [`registry`]: name → channel map and live settings behind one lock;
//! - [`bus`]: publish routing, subscription and setting cascades;
//! - [`builder`]: assembles a bus with an optional logger;
//! - [`config`]: bus and channel construction parameters.

mod builder;
mod bus;
mod config;
mod registry;

pub use builder::BusBuilder;
pub use bus::Bus;
pub use config::{BusConfig, ChannelConfig};

pub(crate) use registry::Registry;
