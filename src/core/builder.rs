use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::bus::Bus;
use crate::core::config::BusConfig;
use crate::loggers::{Logger, default_logger};

/// Builder for constructing a [`Bus`] with optional features.
pub struct BusBuilder<T> {
    cfg: BusConfig,
    logger: Option<Arc<dyn Logger>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> BusBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            logger: None,
            _payload: PhantomData,
        }
    }

    /// Sets the diagnostic sink.
    ///
    /// Every channel created by the bus inherits it. Defaults to
    /// [`TracingLogger`](crate::TracingLogger).
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Restricts `publish` to the given channel names.
    pub fn with_supported_events<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.supported_events = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Builds and returns the bus. No channel exists until first use.
    pub fn build(self) -> Bus<T> {
        let logger = self.logger.unwrap_or_else(default_logger);
        Bus::from_parts(&self.cfg, logger)
    }
}

impl<T> fmt::Debug for BusBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusBuilder")
            .field("cfg", &self.cfg)
            .field("logger", &self.logger.as_ref().map(|l| l.name()))
            .finish()
    }
}
