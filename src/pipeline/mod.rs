//! Middleware pipeline: chain steps and the executor that threads a value through them.
//!
//! ## Contents
//! - [`Middleware`], [`AsyncMiddleware`], [`MiddlewareFn`] chain steps
//! - [`Emission`], [`Next`] one run of a chain and its one-shot continuation
//!
//! ## Quick wiring
//! ```text
//! Channel::publish(args)
//!      └─► Emission::new(name, args, middleware snapshot)
//!              .then(|final| channel records replay + fans out)
//!              .digest()
//! ```

mod emission;
mod middleware;

pub use emission::{Emission, Next};
pub use middleware::{AsyncMiddleware, Middleware, MiddlewareFn};
