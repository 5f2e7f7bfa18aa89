//! # replaybus
//!
//! **Replaybus** is an in-process, named-event dispatcher.
//!
//! Values are published on named channels. Each channel runs them through an
//! ordered middleware chain (which may transform, delay or veto them), then
//! fans the resolved value out to its listeners and optionally keeps it in a
//! bounded replay buffer so late subscribers can catch up.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  publisher ──► Bus::publish(name, value)
//!                   │  enabled?  supported?
//!                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registry (name → Channel, live settings)                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │ Channel  │       │ Channel  │       │ Channel  │
//!   │ "orders" │       │ "users"  │       │   ...    │
//!   └────┬─────┘       └──────────┘       └──────────┘
//!        │ Emission (snapshot of middleware)
//!        ▼
//!   mw[0] ─► mw[1] ─► ... ─► mw[n-1] ─► resolved
//!     │ veto / drop Next          │
//!     ▼                           ├─► ReplayBuffer::record
//!   discarded                     └─► listeners (snapshot at resolution)
//! ```
//!
//! ### Replay
//! ```text
//! subscribe(late) ──► ListenerHandle::replay(n)
//!                        └─► last min(n, len) buffered values, oldest first,
//!                            delivered to `late` only, middleware bypassed
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Bus**           | Named channels, bus-wide switches cascaded to every channel. | [`Bus`], [`BusBuilder`], [`BusConfig`]      |
//! | **Channels**      | Listeners, middleware and replay for one name.               | [`Channel`], [`ChannelConfig`]              |
//! | **Middleware**    | Sync or async steps that transform, delay or veto values.    | [`Middleware`], [`AsyncMiddleware`], [`Next`] |
//! | **Handles**       | Idempotent removal and per-listener replay.                  | [`ListenerHandle`], [`MiddlewareHandle`]    |
//! | **Diagnostics**   | Warnings and panics reported to a pluggable sink.            | [`Logger`], [`Diagnostic`]                  |
//! | **Errors**        | Typed errors for configuration and replay misuse.            | [`BusError`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use replaybus::{Bus, BusConfig, Middleware, Next};
//!
//! let bus: Bus<i64> = Bus::builder(BusConfig { replay_buffer_size: 3, ..BusConfig::default() })
//!     .build();
//!
//! // Drop negative values, double the rest.
//! bus.use_middleware("numbers", Middleware::new(|n: i64, next: Next<i64>| {
//!     if n < 0 { next.veto() } else { next.proceed(n) }
//! })).unwrap();
//! bus.use_middleware("numbers", Middleware::map(|n: i64| n * 2)).unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let handle = bus.on("numbers", move |n| sink.lock().unwrap().push(*n)).unwrap();
//!
//! bus.publish("numbers", 1);
//! bus.publish("numbers", -1);
//! bus.publish("numbers", 2);
//! assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
//!
//! handle.replay(1).unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![2, 4, 4]);
//! ```
mod channel;
mod core;
mod diagnostics;
mod error;
mod loggers;
mod pipeline;

// ---- Public re-exports ----

pub use crate::core::{Bus, BusBuilder, BusConfig, ChannelConfig};
pub use channel::{Channel, Listener, ListenerHandle, MiddlewareHandle, ReplayBuffer};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::BusError;
pub use loggers::{Logger, TracingLogger};
pub use pipeline::{AsyncMiddleware, Emission, Middleware, MiddlewareFn, Next};

// Optional: expose a simple built-in stdout sink (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use loggers::LogWriter;
