//! # Channel: one named publish/subscribe unit.
//!
//! A [`Channel`] owns its subscriber set, its ordered middleware list and its
//! optional replay buffer, and drives an [`Emission`] on every publish.
//!
//! ## Architecture
//! ```text
//! publish(args)
//!     │
//!     ├─ no listeners ∧ warning on ──► Logger (NoListeners)
//!     │
//!     ├─ no middleware:
//!     │     ├─ no listeners ──► nothing (no replay entry)
//!     │     └─ record(args) ──► fan-out to listeners snapshot (publish time)
//!     │
//!     └─ middleware:
//!           Emission(snapshot of middleware, args).digest()
//!                 └─ resolved(final) ──► record(final)
//!                                    └─► fan-out to listeners snapshot (resolution time)
//! ```
//!
//! ## Rules
//! - **Snapshots**: each emission captures its own middleware list at publish
//!   time and its own listener list at resolution time. Later mutation of the
//!   live lists never reaches an in-flight emission.
//! - **Removal wins**: a listener removed before resolution never receives it.
//! - **No lock across callbacks**: listeners and middleware may call back into
//!   the channel (unsubscribe themselves, publish again).
//! - **Replay state**: `None` means replay is off (never recorded); an empty
//!   buffer means replay is on but nothing is retained.
//! - **Panic isolation**: a panicking listener is reported as
//!   `ListenerPanicked`; the remaining listeners still run.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use replaybus::{Channel, ChannelConfig, Listener, Middleware};
//!
//! let ch = Channel::new(ChannelConfig::new("numbers")).unwrap();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! ch.use_middleware(Middleware::map(|n: i64| n * 2));
//! ch.use_middleware(Middleware::map(|n: i64| n + 1));
//! ch.subscribe(Listener::new(move |n: &i64| sink.lock().unwrap().push(*n)));
//!
//! ch.publish(5);
//! assert_eq!(*seen.lock().unwrap(), vec![11]);
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::channel::handle::{ListenerHandle, MiddlewareHandle};
use crate::channel::listener::Listener;
use crate::channel::replay::ReplayBuffer;
use crate::core::ChannelConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, panic_message};
use crate::error::BusError;
use crate::loggers::{Logger, default_logger};
use crate::pipeline::{Emission, Middleware};

/// Mutable channel state, guarded by one mutex.
struct State<T> {
    listeners: Vec<Listener<T>>,
    middlewares: Vec<Middleware<T>>,
    replay: Option<ReplayBuffer<T>>,
    replay_capacity: usize,
    no_listeners_warning: bool,
    logger: Arc<dyn Logger>,
}

/// What `publish` decided to do once the lock is released.
enum Dispatch<T> {
    Skip,
    Now(Vec<Listener<T>>),
    Chain(Arc<[Middleware<T>]>),
}

/// A named channel with listeners, middleware and an optional replay buffer.
pub struct Channel<T> {
    name: Arc<str>,
    state: Mutex<State<T>>,
}

impl<T> Channel<T> {
    /// Returns the channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replay_not_enabled(&self) -> BusError {
        BusError::ReplayNotEnabled {
            channel: self.name_arc(),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Number of registered middleware steps.
    pub fn middleware_count(&self) -> usize {
        self.lock().middlewares.len()
    }

    /// Returns true if `listener` is currently subscribed.
    pub fn has_listener(&self, listener: &Listener<T>) -> bool {
        self.lock().listeners.iter().any(|l| l.same(listener))
    }

    /// Removes `listener`; returns false if it was not subscribed.
    pub fn unsubscribe(&self, listener: &Listener<T>) -> bool {
        let mut st = self.lock();
        let before = st.listeners.len();
        st.listeners.retain(|l| !l.same(listener));
        st.listeners.len() != before
    }

    /// Removes `middleware`, keeping the relative order of the rest.
    ///
    /// Returns false if it was not registered.
    pub fn remove_middleware(&self, middleware: &Middleware<T>) -> bool {
        let mut st = self.lock();
        let before = st.middlewares.len();
        st.middlewares.retain(|m| !m.same(middleware));
        st.middlewares.len() != before
    }

    /// Drops every listener.
    pub fn clear_listeners(&self) {
        self.lock().listeners.clear();
    }

    /// Drops every middleware step.
    pub fn clear_middlewares(&self) {
        self.lock().middlewares.clear();
    }

    pub fn replay_is_enabled(&self) -> bool {
        self.lock().replay.is_some()
    }

    /// Allocates an empty replay buffer. No-op when already enabled.
    pub fn enable_replay(&self) {
        let mut st = self.lock();
        if st.replay.is_none() {
            st.replay = Some(ReplayBuffer::new(st.replay_capacity));
        }
    }

    /// Discards the replay buffer entirely.
    pub fn disable_replay(&self) {
        self.lock().replay = None;
    }

    /// Capacity the replay buffer has (or will have once enabled).
    pub fn replay_capacity(&self) -> usize {
        self.lock().replay_capacity
    }

    /// Changes the replay capacity.
    ///
    /// Shrinking keeps the **earliest** `size` buffered entries.
    ///
    /// # Errors
    /// - [`BusError::ReplayNotEnabled`] if replay is off (state unchanged).
    /// - [`BusError::InvalidBufferSize`] if `size == 0`.
    pub fn set_replay_buffer_size(&self, size: usize) -> Result<(), BusError> {
        let mut st = self.lock();
        let Some(buf) = st.replay.as_mut() else {
            return Err(self.replay_not_enabled());
        };
        if size == 0 {
            return Err(BusError::InvalidBufferSize { size });
        }
        buf.resize(size);
        st.replay_capacity = size;
        Ok(())
    }

    /// Applies a bus-wide capacity change whether or not replay is on.
    pub(crate) fn apply_replay_capacity(&self, size: usize) {
        let mut st = self.lock();
        let size = size.max(1);
        st.replay_capacity = size;
        if let Some(buf) = st.replay.as_mut() {
            buf.resize(size);
        }
    }

    /// Empties the replay buffer; replay stays enabled.
    ///
    /// # Errors
    /// [`BusError::ReplayNotEnabled`] if replay is off.
    pub fn clear_replay_buffer(&self) -> Result<(), BusError> {
        let mut st = self.lock();
        match st.replay.as_mut() {
            Some(buf) => {
                buf.clear();
                Ok(())
            }
            None => Err(self.replay_not_enabled()),
        }
    }

    pub fn no_listeners_warning(&self) -> bool {
        self.lock().no_listeners_warning
    }

    pub fn enable_no_listeners_warning(&self) {
        self.lock().no_listeners_warning = true;
    }

    pub fn disable_no_listeners_warning(&self) {
        self.lock().no_listeners_warning = false;
    }

    /// Replaces the diagnostic sink.
    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        self.lock().logger = logger;
    }

    fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.lock().logger)
    }
}

impl<T: Clone + Send + 'static> Channel<T> {
    /// Creates a channel with the default `tracing` sink.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `cfg.name` is not set.
    pub fn new(cfg: ChannelConfig) -> Result<Arc<Self>, BusError> {
        Self::with_logger(cfg, default_logger())
    }

    /// Creates a channel reporting diagnostics to `logger`.
    ///
    /// # Errors
    /// [`BusError::MissingConfig`] if `cfg.name` is not set.
    pub fn with_logger(cfg: ChannelConfig, logger: Arc<dyn Logger>) -> Result<Arc<Self>, BusError> {
        let name: Arc<str> = match cfg.name.as_deref() {
            Some(n) if !n.is_empty() => Arc::from(n),
            _ => return Err(BusError::MissingConfig { field: "name" }),
        };
        let replay_capacity = cfg.replay_buffer_size_clamped();
        let replay = cfg.replay.then(|| ReplayBuffer::new(replay_capacity));

        Ok(Arc::new(Self {
            name,
            state: Mutex::new(State {
                listeners: Vec::new(),
                middlewares: Vec::new(),
                replay,
                replay_capacity,
                no_listeners_warning: cfg.no_listeners_warning,
                logger,
            }),
        }))
    }

    /// Publishes `args` on this channel.
    ///
    /// Non-blocking: with asynchronous middleware this returns before the
    /// listeners have run.
    pub fn publish(self: &Arc<Self>, args: T) {
        let (dispatch, logger, warn) = {
            let mut st = self.lock();
            let warn = st.listeners.is_empty() && st.no_listeners_warning;
            let dispatch = if !st.middlewares.is_empty() {
                Dispatch::Chain(Arc::from(st.middlewares.as_slice()))
            } else if st.listeners.is_empty() {
                Dispatch::Skip
            } else {
                if let Some(buf) = st.replay.as_mut() {
                    buf.record(args.clone());
                }
                Dispatch::Now(st.listeners.clone())
            };
            (dispatch, Arc::clone(&st.logger), warn)
        };

        if warn {
            logger.on_diagnostic(&Diagnostic::new(DiagnosticKind::NoListeners, self.name_arc()));
        }

        match dispatch {
            Dispatch::Skip => {}
            Dispatch::Now(listeners) => fan_out(&self.name, logger.as_ref(), &listeners, &args),
            Dispatch::Chain(steps) => {
                let channel: Weak<Self> = Arc::downgrade(self);
                Emission::new(self.name_arc(), args, steps)
                    .with_logger(logger)
                    .then(move |resolved| {
                        if let Some(ch) = channel.upgrade() {
                            ch.resolve(resolved);
                        }
                    })
                    .digest();
            }
        }
    }

    /// Records a resolved value and delivers it to the current listeners.
    fn resolve(&self, args: T) {
        let (listeners, logger) = {
            let mut st = self.lock();
            if let Some(buf) = st.replay.as_mut() {
                buf.record(args.clone());
            }
            (st.listeners.clone(), Arc::clone(&st.logger))
        };
        fan_out(&self.name, logger.as_ref(), &listeners, &args);
    }

    /// Adds `listener` (idempotent) and returns its handle.
    pub fn subscribe(self: &Arc<Self>, listener: Listener<T>) -> ListenerHandle<T> {
        self.add_listener(&listener);
        ListenerHandle::new(Arc::downgrade(self), self.name_arc(), listener, None)
    }

    /// Shorthand for `subscribe(Listener::new(f))`.
    pub fn on<F>(self: &Arc<Self>, f: F) -> ListenerHandle<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(Listener::new(f))
    }

    pub(crate) fn add_listener(&self, listener: &Listener<T>) {
        let mut st = self.lock();
        if !st.listeners.iter().any(|l| l.same(listener)) {
            st.listeners.push(listener.clone());
        }
    }

    /// Appends `middleware` (idempotent) and returns its handle.
    ///
    /// Insertion order is execution order.
    pub fn use_middleware(self: &Arc<Self>, middleware: Middleware<T>) -> MiddlewareHandle<T> {
        {
            let mut st = self.lock();
            if !st.middlewares.iter().any(|m| m.same(&middleware)) {
                st.middlewares.push(middleware.clone());
            }
        }
        MiddlewareHandle::new(Arc::downgrade(self), middleware)
    }

    /// Delivers the last `n` buffered values (oldest first) to `listener` only.
    ///
    /// Bypasses middleware and does not touch the buffer.
    ///
    /// # Errors
    /// [`BusError::ReplayNotEnabled`] if replay is off.
    pub fn replay_to(&self, listener: &Listener<T>, n: usize) -> Result<(), BusError> {
        let values = {
            let st = self.lock();
            match st.replay.as_ref() {
                Some(buf) => buf.last(n),
                None => return Err(self.replay_not_enabled()),
            }
        };
        let logger = self.logger();
        let target = std::slice::from_ref(listener);
        for v in &values {
            fan_out(&self.name, logger.as_ref(), target, v);
        }
        Ok(())
    }

    /// Replays into the listener bound to `handle`.
    ///
    /// # Errors
    /// [`BusError::ReplayNotEnabled`] if replay is off.
    pub fn replay(&self, handle: &ListenerHandle<T>, n: usize) -> Result<(), BusError> {
        self.replay_to(handle.listener(), n)
    }

    /// Copy of the replay buffer, oldest first; `None` when replay is off.
    pub fn replay_buffer(&self) -> Option<Vec<T>> {
        self.lock().replay.as_ref().map(ReplayBuffer::to_vec)
    }
}

/// Calls every listener with `args`, isolating panics.
fn fan_out<T>(name: &Arc<str>, logger: &dyn Logger, listeners: &[Listener<T>], args: &T) {
    for listener in listeners {
        if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| listener.call(args))) {
            let d = Diagnostic::listener_panicked(Arc::clone(name), panic_message(&*panic_err));
            logger.on_diagnostic(&d);
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.lock();
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("listeners", &st.listeners.len())
            .field("middlewares", &st.middlewares.len())
            .field("replay", &st.replay.as_ref().map(ReplayBuffer::len))
            .field("replay_capacity", &st.replay_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::loggers::memory::MemoryLogger;
    use crate::pipeline::Next;

    type Seen<T> = Arc<Mutex<Vec<T>>>;

    fn recorder<T: Clone + Send + 'static>() -> (Seen<T>, Listener<T>) {
        let seen: Seen<T> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Listener::new(move |v: &T| sink.lock().unwrap().push(v.clone())))
    }

    fn replaying(name: &str, size: usize) -> Arc<Channel<i32>> {
        Channel::new(ChannelConfig::new(name).with_replay(size)).unwrap()
    }

    #[test]
    fn test_missing_name_is_config_error() {
        let err = Channel::<i32>::new(ChannelConfig::default()).unwrap_err();
        assert_eq!(err, BusError::MissingConfig { field: "name" });
    }

    #[test]
    fn test_defaults_from_config() {
        let ch = Channel::<i32>::new(ChannelConfig::new("x")).unwrap();
        assert_eq!(ch.name(), "x");
        assert!(!ch.replay_is_enabled());
        assert_eq!(ch.replay_buffer(), None);
        assert_eq!(ch.replay_capacity(), 1);
    }

    #[test]
    fn test_publish_without_middleware_is_synchronous() {
        let ch = replaying("x", 3);
        let (seen, l) = recorder();
        ch.subscribe(l);
        ch.publish(1);
        ch.publish(2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(ch.replay_buffer(), Some(vec![1, 2]));
    }

    #[test]
    fn test_publish_without_listeners_records_nothing() {
        let logger = Arc::new(MemoryLogger::default());
        let cfg = ChannelConfig::new("x").with_replay(2).with_no_listeners_warning(true);
        let ch: Arc<Channel<i32>> = Channel::with_logger(cfg, logger.clone()).unwrap();
        ch.publish(1);
        assert_eq!(ch.replay_buffer(), Some(vec![]));
        assert_eq!(logger.count(DiagnosticKind::NoListeners), 1);
    }

    #[test]
    fn test_middleware_without_listeners_warns_and_records() {
        let logger = Arc::new(MemoryLogger::default());
        let cfg = ChannelConfig::new("x").with_replay(3).with_no_listeners_warning(true);
        let ch: Arc<Channel<i32>> = Channel::with_logger(cfg, logger.clone()).unwrap();
        ch.use_middleware(Middleware::map(|v: i32| v * 10));

        ch.publish(1);
        ch.publish(2);

        assert_eq!(logger.count(DiagnosticKind::NoListeners), 2);
        assert_eq!(ch.replay_buffer(), Some(vec![10, 20]));
    }

    #[test]
    fn test_warning_off_is_silent() {
        let logger = Arc::new(MemoryLogger::default());
        let ch: Arc<Channel<i32>> =
            Channel::with_logger(ChannelConfig::new("x"), logger.clone()).unwrap();
        ch.publish(1);
        assert!(logger.kinds().is_empty());
    }

    #[test]
    fn test_orders_scenario() {
        let ch = replaying("orders", 2);
        let (_first, existing) = recorder();
        ch.subscribe(existing);
        ch.publish(1);
        ch.publish(2);
        ch.publish(3);
        assert_eq!(ch.replay_buffer(), Some(vec![2, 3]));

        let (seen, late) = recorder();
        let handle = ch.subscribe(late);
        handle.replay(2).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
        assert_eq!(ch.replay_buffer(), Some(vec![2, 3]));
    }

    #[test]
    fn test_replay_yields_last_min_n_c() {
        for (n, c) in [(0, 3), (2, 3), (3, 3), (7, 3), (5, 1)] {
            let ch = replaying("x", c);
            let (_s, keep) = recorder();
            ch.subscribe(keep);
            for v in 0..n {
                ch.publish(v);
                assert!(ch.replay_buffer().unwrap().len() <= c);
            }
            let (seen, late) = recorder();
            ch.replay_to(&late, c).unwrap();
            let expected: Vec<i32> = (0..n).skip((n as usize).saturating_sub(c)).collect();
            assert_eq!(*seen.lock().unwrap(), expected, "n={n} c={c}");
        }
    }

    #[test]
    fn test_two_middlewares_double_then_add() {
        let ch = Channel::new(ChannelConfig::new("x")).unwrap();
        ch.use_middleware(Middleware::map(|n: i64| n * 2));
        ch.use_middleware(Middleware::map(|n: i64| n + 1));
        let (a, la) = recorder();
        let (b, lb) = recorder();
        ch.subscribe(la);
        ch.subscribe(lb);
        ch.publish(5);
        assert_eq!(*a.lock().unwrap(), vec![11]);
        assert_eq!(*b.lock().unwrap(), vec![11]);
    }

    #[test]
    fn test_pass_through_chain_delivers_once() {
        let ch = replaying("x", 5);
        for _ in 0..3 {
            ch.use_middleware(Middleware::map(|v| v));
        }
        let (seen, l) = recorder();
        ch.subscribe(l);
        ch.publish(7);
        assert_eq!(*seen.lock().unwrap(), vec![7]);
        assert_eq!(ch.replay_buffer(), Some(vec![7]));
    }

    #[test]
    fn test_vetoing_middleware_blocks_delivery_and_replay() {
        let ch = replaying("x", 5);
        ch.use_middleware(Middleware::new(|_v: i32, next: Next<i32>| next.veto()));
        let (seen, l) = recorder();
        ch.subscribe(l);
        ch.publish(1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(ch.replay_buffer(), Some(vec![]));
    }

    #[test]
    fn test_unsubscribe_during_deferred_chain() {
        let ch = replaying("x", 5);
        let parked: Arc<Mutex<Vec<Next<i32>>>> = Arc::new(Mutex::new(Vec::new()));
        let park = Arc::clone(&parked);
        ch.use_middleware(Middleware::new(move |_v, next| park.lock().unwrap().push(next)));

        let (gone, leaving) = recorder();
        let (kept, staying) = recorder();
        ch.subscribe(leaving.clone());
        ch.subscribe(staying);

        ch.publish(1);
        assert!(ch.unsubscribe(&leaving));

        let next = parked.lock().unwrap().pop().unwrap();
        next.proceed(1);

        assert!(gone.lock().unwrap().is_empty());
        assert_eq!(*kept.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_middleware_added_after_publish_is_not_applied() {
        let ch = Channel::new(ChannelConfig::new("x")).unwrap();
        let parked: Arc<Mutex<Option<Next<i32>>>> = Arc::new(Mutex::new(None));
        let park = Arc::clone(&parked);
        ch.use_middleware(Middleware::new(move |_v, next| *park.lock().unwrap() = Some(next)));
        let (seen, l) = recorder();
        ch.subscribe(l);

        ch.publish(1);
        ch.use_middleware(Middleware::map(|v: i32| v * 100));
        parked.lock().unwrap().take().unwrap().proceed(2);

        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_duplicate_subscribe_is_idempotent() {
        let ch = Channel::new(ChannelConfig::new("x")).unwrap();
        let (seen, l) = recorder();
        ch.subscribe(l.clone());
        ch.subscribe(l.clone());
        assert_eq!(ch.listener_count(), 1);
        ch.publish(3);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
        assert!(ch.unsubscribe(&l));
        assert!(!ch.unsubscribe(&l));
    }

    #[test]
    fn test_remove_middleware_keeps_order() {
        let ch = Channel::new(ChannelConfig::new("x")).unwrap();
        let add_a = Middleware::map(|s: String| s + "a");
        let add_b = Middleware::map(|s: String| s + "b");
        let add_c = Middleware::map(|s: String| s + "c");
        ch.use_middleware(add_a);
        ch.use_middleware(add_b.clone());
        ch.use_middleware(add_c);
        assert!(ch.remove_middleware(&add_b));
        let (seen, l) = recorder();
        ch.subscribe(l);
        ch.publish(String::new());
        assert_eq!(*seen.lock().unwrap(), vec!["ac".to_string()]);
    }

    #[test]
    fn test_clear_lists() {
        let ch = replaying("x", 2);
        let (seen, l) = recorder();
        ch.use_middleware(Middleware::new(|_v: i32, next: Next<i32>| next.veto()));
        ch.subscribe(l.clone());
        ch.clear_middlewares();
        ch.publish(1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        ch.clear_listeners();
        assert_eq!(ch.listener_count(), 0);
        ch.publish(2);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_set_size_requires_replay() {
        let ch = Channel::<i32>::new(ChannelConfig::new("x")).unwrap();
        let err = ch.set_replay_buffer_size(1).unwrap_err();
        assert_eq!(err.as_label(), "replay_not_enabled");
        assert_eq!(ch.replay_buffer(), None);
    }

    #[test]
    fn test_set_size_rejects_zero() {
        let ch = replaying("x", 2);
        assert_eq!(
            ch.set_replay_buffer_size(0),
            Err(BusError::InvalidBufferSize { size: 0 })
        );
        assert_eq!(ch.replay_capacity(), 2);
    }

    #[test]
    fn test_shrink_keeps_earliest_entries() {
        let ch = replaying("x", 4);
        let (_s, l) = recorder();
        ch.subscribe(l);
        for v in 1..=4 {
            ch.publish(v);
        }
        ch.set_replay_buffer_size(2).unwrap();
        assert_eq!(ch.replay_buffer(), Some(vec![1, 2]));
        ch.publish(5);
        assert_eq!(ch.replay_buffer(), Some(vec![2, 5]));
    }

    #[test]
    fn test_enable_disable_clear_replay() {
        let ch = Channel::new(ChannelConfig::new("x")).unwrap();
        let (_s, l) = recorder();
        ch.subscribe(l.clone());
        assert!(ch.replay_to(&l, 1).is_err());
        assert!(ch.clear_replay_buffer().is_err());

        ch.enable_replay();
        ch.publish(1);
        ch.enable_replay();
        assert_eq!(ch.replay_buffer(), Some(vec![1]));

        ch.clear_replay_buffer().unwrap();
        assert!(ch.replay_is_enabled());
        assert_eq!(ch.replay_buffer(), Some(vec![]));

        ch.disable_replay();
        assert_eq!(ch.replay_buffer(), None);
    }

    #[test]
    fn test_replay_does_not_run_middleware() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let ch = replaying("x", 3);
        ch.use_middleware(Middleware::map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        }));
        let (_s, l) = recorder();
        ch.subscribe(l);
        ch.publish(1);
        let (seen, late) = recorder();
        ch.replay_to(&late, 3).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(ch.replay_buffer(), Some(vec![1]));
    }

    #[test]
    fn test_listener_panic_is_isolated() {
        let logger = Arc::new(MemoryLogger::default());
        let ch: Arc<Channel<i32>> =
            Channel::with_logger(ChannelConfig::new("x"), logger.clone()).unwrap();
        ch.on(|_v| panic!("boom"));
        let (seen, l) = recorder();
        ch.subscribe(l);
        ch.publish(1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(logger.count(DiagnosticKind::ListenerPanicked), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let ch: Arc<Channel<i32>> = Channel::new(ChannelConfig::new("x")).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<ListenerHandle<i32>>>> = Arc::new(Mutex::new(None));
        let (me, counter) = (Arc::clone(&slot), Arc::clone(&calls));
        let handle = ch.on(move |_v| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(h) = me.lock().unwrap().as_ref() {
                h.remove();
            }
        });
        *slot.lock().unwrap() = Some(handle);
        ch.publish(1);
        ch.publish(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ch.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_async_middleware_delivers_after_publish_returns() {
        let ch = replaying("x", 2);
        ch.use_middleware(Middleware::from_async_fn(|v: i32| async move {
            tokio::task::yield_now().await;
            Some(v * 3)
        }));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        ch.on(move |v: &i32| {
            let _ = tx.send(*v);
        });

        ch.publish(2);
        assert_eq!(rx.recv().await, Some(6));
        assert_eq!(ch.replay_buffer(), Some(vec![6]));
    }
}
