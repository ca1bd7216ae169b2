//! The dispatch engine
//!
//! `Logfan` owns the global bounded queue, the dispatcher thread that fans
//! records out to every interested target host, the level-enablement cache,
//! the formatting-buffer pool, and the flush/shutdown protocol. Producers
//! call [`Logfan::log`] from any thread and never block beyond the bounded
//! enqueue timeout.

use super::buffer_pool::{BufferPool, DEFAULT_MAX_POOLED_BUFFER};
use super::error::{EngineError, Result};
use super::field::Field;
use super::filter::Filter;
use super::formatter::Formatter;
use super::hooks::{ErrorHook, ErrorSink, QueueFullHook, TargetQueueFullHook};
use super::host::{FlushSend, TargetHost};
use super::level::Level;
use super::level_cache::{LevelCache, LevelStatus};
use super::metrics::{
    MetricsCollector, TargetMetrics, DEFAULT_METRICS_INTERVAL, ENGINE_METRICS_NAME,
    MIN_METRICS_INTERVAL,
};
use super::record::Record;
use super::target::Target;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, SendTimeoutError, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Default capacity of the engine queue and of each target queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Default bound on how long a producer blocks on a full queue before the
/// record is dropped.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(200);

/// Default flush/shutdown timeout (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

enum Msg {
    Record(Record),
    Flush(Sender<Result<()>>),
    Shutdown,
}

struct Options {
    max_queue_size: usize,
    enqueue_timeout: Duration,
    flush_timeout: Duration,
    on_queue_full: Option<QueueFullHook>,
    on_target_queue_full: Option<TargetQueueFullHook>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

struct Inner {
    opts: Options,
    tx: Sender<Msg>,
    hosts: RwLock<Vec<Arc<TargetHost>>>,
    cache: LevelCache,
    pool: Arc<BufferPool>,
    errors: ErrorSink,
    metrics: Arc<TargetMetrics>,
    dispatcher: Mutex<Option<thread::JoinHandle<()>>>,
    ticker_stop: Mutex<Option<Sender<()>>>,
    shutdown_started: AtomicBool,
    terminal: AtomicBool,
}

impl Inner {
    /// Resolve lazy state exactly once, then hand the record to every host
    /// whose filter enables its level.
    fn dispatch(&self, mut rec: Record) {
        rec.prep();
        let rec = Arc::new(rec);
        let hosts = self.hosts.read();
        for host in hosts.iter() {
            if host.filter.is_enabled(&rec.level) {
                host.log(Arc::clone(&rec));
            }
        }
    }

    /// Send a flush marker to every host and wait for all acks.
    fn fanout_flush(&self) -> Result<()> {
        let hosts: Vec<Arc<TargetHost>> = self.hosts.read().iter().cloned().collect();
        let deadline = Instant::now() + self.opts.flush_timeout;

        let mut acks = Vec::with_capacity(hosts.len());
        for host in &hosts {
            let (tx, rx) = bounded(1);
            match host.send_flush(tx, self.opts.flush_timeout) {
                FlushSend::Sent => acks.push(rx),
                // Removed concurrently; nothing left to flush there.
                FlushSend::Closed => {}
                FlushSend::TimedOut => {
                    return Err(EngineError::FlushTimeout {
                        timeout: self.opts.flush_timeout,
                    })
                }
            }
        }
        for rx in acks {
            if rx.recv_deadline(deadline).is_err() {
                return Err(EngineError::FlushTimeout {
                    timeout: self.opts.flush_timeout,
                });
            }
        }
        Ok(())
    }
}

fn run_dispatcher(inner: Weak<Inner>, rx: Receiver<Msg>) {
    loop {
        let msg = match rx.recv() {
            Ok(msg) => msg,
            // All engine handles dropped; pending records were drained.
            Err(_) => break,
        };
        let Some(inner) = inner.upgrade() else { break };
        match msg {
            Msg::Record(rec) => {
                // A panic out of a caller-supplied hook must not kill the
                // dispatcher; recover, report, keep going.
                let outcome = catch_unwind(AssertUnwindSafe(|| inner.dispatch(rec)));
                if outcome.is_err() {
                    inner.errors.report(&EngineError::other(
                        "dispatcher recovered from a panic during fan-out",
                    ));
                }
            }
            Msg::Flush(ack) => {
                let _ = ack.send(inner.fanout_flush());
            }
            Msg::Shutdown => break,
        }
    }
}

fn run_ticker(inner: Weak<Inner>, stop: Receiver<()>, interval: Duration) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let Some(inner) = inner.upgrade() else { break };
                inner.metrics.set_queue_size(inner.tx.len());
                for host in inner.hosts.read().iter() {
                    host.update_queue_gauge();
                }
            }
            // Stop sender dropped: shutdown.
            _ => break,
        }
    }
}

/// The log-record dispatch engine.
///
/// Cheap to clone; clones share the same queues, targets, and lifecycle.
#[derive(Clone)]
pub struct Logfan {
    inner: Arc<Inner>,
}

impl Logfan {
    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Create an engine with default options and no targets.
    #[must_use]
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Memoized enablement status for a level: is any target interested,
    /// and does any interested target want a stack trace.
    ///
    /// O(1) on a cache hit. On a miss the target filters are scanned under
    /// the host-list read lock and the answer is stored. Always disabled
    /// after shutdown.
    pub fn status(&self, level: &Level) -> LevelStatus {
        if self.inner.terminal.load(Ordering::Acquire) {
            return LevelStatus::DISABLED;
        }
        if let Some(status) = self.inner.cache.get(level.id) {
            return status;
        }

        let mut status = LevelStatus::DISABLED;
        let hosts = self.inner.hosts.read();
        for host in hosts.iter() {
            if host.filter.is_enabled(level) {
                status.enabled = true;
                if host.filter.is_stacktrace_enabled(level) || host.formatter_wants_stack() {
                    status.stacktrace = true;
                }
                if status.stacktrace {
                    break;
                }
            }
        }
        // The store must happen while the read lock is still held: a
        // membership change resets the cache under the write lock, and a
        // stale answer stored after that reset would stick until the next
        // change.
        self.inner.cache.put(level.id, status);
        status
    }

    /// Convenience wrapper over [`Logfan::status`].
    pub fn is_enabled(&self, level: &Level) -> bool {
        self.status(level).enabled
    }

    /// Log a record. Returns immediately when the level is disabled on
    /// every target; this is the critical fast path.
    pub fn log(&self, level: Level, msg: impl Into<String>, fields: Vec<Field>) {
        // Check enablement before converting the message so a disabled
        // level costs one cache read and nothing else.
        if !self.status(&level).enabled {
            return;
        }
        self.log_record(level, msg.into(), fields, Vec::new());
    }

    pub(crate) fn log_record(
        &self,
        level: Level,
        msg: String,
        fields: Vec<Field>,
        producer_fields: Vec<Field>,
    ) {
        let status = self.status(&level);
        if !status.enabled {
            return;
        }
        let mut rec = Record::new(level, msg, fields).with_producer_fields(producer_fields);
        if status.stacktrace || rec.level.stacktrace {
            rec.capture_stack();
        }
        self.enqueue(rec);
    }

    /// A sublogger bound to producer fields that are merged ahead of
    /// call-site fields on every record it emits.
    pub fn with_fields(&self, fields: Vec<Field>) -> Sublogger {
        Sublogger {
            engine: self.clone(),
            fields,
        }
    }

    /// Two-stage enqueue: non-blocking send first; on a full queue the
    /// drop hook decides, else block up to the enqueue timeout, else
    /// report and drop. Capacity problems never surface to the producer
    /// as a hard failure.
    fn enqueue(&self, rec: Record) {
        let inner = &*self.inner;
        match inner.tx.try_send(Msg::Record(rec)) {
            Ok(()) => inner.metrics.incr_logged(),
            Err(TrySendError::Full(Msg::Record(rec))) => {
                if let Some(hook) = &inner.opts.on_queue_full {
                    if hook(&rec, inner.opts.max_queue_size) {
                        inner.metrics.incr_dropped();
                        return;
                    }
                }
                inner.metrics.incr_blocked();
                match inner
                    .tx
                    .send_timeout(Msg::Record(rec), inner.opts.enqueue_timeout)
                {
                    Ok(()) => inner.metrics.incr_logged(),
                    Err(SendTimeoutError::Timeout(_)) => {
                        inner.metrics.incr_dropped();
                        inner.errors.report(&EngineError::EnqueueTimeout {
                            target: ENGINE_METRICS_NAME.to_string(),
                            capacity: inner.opts.max_queue_size,
                            timeout: inner.opts.enqueue_timeout,
                        });
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {}
                }
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Add a target. The only mutation points for the target set are
    /// `add_target` and `remove_targets`; both reset the level cache under
    /// the host-list write lock so no stale enablement answer is observed.
    pub fn add_target(
        &self,
        mut target: Box<dyn Target>,
        name: impl Into<String>,
        filter: Arc<dyn Filter>,
        formatter: Arc<dyn Formatter>,
        max_queue_size: usize,
    ) -> Result<()> {
        if self.inner.shutdown_started.load(Ordering::Acquire) {
            return Err(EngineError::AlreadyShutdown);
        }
        let name = name.into();
        target
            .init()
            .map_err(|e| EngineError::target_init(name.as_str(), e.to_string()))?;

        let metrics = Arc::new(TargetMetrics::new(
            self.inner.opts.metrics.as_ref(),
            &name,
        ));
        let host = TargetHost::start(
            name,
            target,
            filter,
            formatter,
            max_queue_size,
            self.inner.opts.enqueue_timeout,
            self.inner.opts.on_target_queue_full.clone(),
            self.inner.errors.clone(),
            metrics,
            Arc::clone(&self.inner.pool),
        );

        let mut hosts = self.inner.hosts.write();
        hosts.push(Arc::new(host));
        self.inner.cache.reset();
        Ok(())
    }

    /// Remove every target whose name matches the predicate, shutting each
    /// one down (drain, then close) within `timeout`.
    pub fn remove_targets(
        &self,
        timeout: Duration,
        predicate: impl Fn(&str) -> bool,
    ) -> Result<()> {
        let removed: Vec<Arc<TargetHost>> = {
            let mut hosts = self.inner.hosts.write();
            let mut kept = Vec::with_capacity(hosts.len());
            let mut gone = Vec::new();
            for host in hosts.drain(..) {
                if predicate(host.name()) {
                    gone.push(host);
                } else {
                    kept.push(host);
                }
            }
            *hosts = kept;
            self.inner.cache.reset();
            gone
        };

        let deadline = Instant::now() + timeout;
        let mut first_err = None;
        for host in removed {
            if let Err(e) = host.shutdown(deadline) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Synchronous flush: every record enqueued before this call is written
    /// to every interested target's sink before it returns, or a
    /// [`EngineError::FlushTimeout`] is returned.
    ///
    /// A flush marker travels the engine queue behind all earlier records,
    /// then a per-target marker travels each host queue; queue FIFO makes
    /// the marker observe everything enqueued before it.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        if self.inner.terminal.load(Ordering::Acquire) {
            return Err(EngineError::AlreadyShutdown);
        }
        self.flush_until(Instant::now() + timeout, timeout)
    }

    fn flush_until(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.inner
            .tx
            .send_deadline(Msg::Flush(ack_tx), deadline)
            .map_err(|_| EngineError::FlushTimeout { timeout })?;
        match ack_rx.recv_deadline(deadline) {
            Ok(result) => result,
            Err(_) => Err(EngineError::FlushTimeout { timeout }),
        }
    }

    /// Flush, then mark the engine terminal and tear everything down:
    /// stop the dispatcher, drain and close every target. Terminal means
    /// terminal; a second call fails with [`EngineError::AlreadyShutdown`]
    /// and the engine is never recreated.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        if self
            .inner
            .shutdown_started
            .swap(true, Ordering::SeqCst)
        {
            return Err(EngineError::AlreadyShutdown);
        }
        let deadline = Instant::now() + timeout;
        let mut timed_out = false;

        // Best-effort drain of everything already accepted.
        if let Err(e) = self.flush_until(deadline, timeout) {
            timed_out |= e.is_timeout();
        }

        // From here on every level reads as disabled; no further work is
        // scheduled.
        self.inner.terminal.store(true, Ordering::SeqCst);
        self.inner.cache.reset();

        // Stop the metrics ticker.
        self.inner.ticker_stop.lock().take();

        // Stop the dispatcher and wait for it.
        let _ = self.inner.tx.send_deadline(Msg::Shutdown, deadline);
        let handle = self.inner.dispatcher.lock().take();
        if let Some(handle) = handle {
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                if Instant::now() >= deadline {
                    timed_out = true;
                    break;
                }
                thread::sleep(JOIN_POLL_INTERVAL);
            }
        }

        // Drain and close every target under the remaining budget.
        let hosts: Vec<Arc<TargetHost>> = {
            let mut hosts = self.inner.hosts.write();
            self.inner.cache.reset();
            hosts.drain(..).collect()
        };
        for host in hosts {
            if let Err(e) = host.shutdown(deadline) {
                timed_out |= e.is_timeout();
                self.inner.errors.report(&e);
            }
        }

        if timed_out {
            Err(EngineError::ShutdownTimeout { timeout })
        } else {
            Ok(())
        }
    }
}

impl Default for Logfan {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle bound to producer fields. Records logged through it carry those
/// fields ahead of call-site fields; merging happens in `prep`, on the
/// dispatcher, not on the producer.
#[derive(Clone)]
pub struct Sublogger {
    engine: Logfan,
    fields: Vec<Field>,
}

impl Sublogger {
    pub fn log(&self, level: Level, msg: impl Into<String>, fields: Vec<Field>) {
        if !self.engine.status(&level).enabled {
            return;
        }
        self.engine
            .log_record(level, msg.into(), fields, self.fields.clone());
    }

    /// A child sublogger carrying these fields in addition to its parent's.
    #[must_use]
    pub fn with_fields(&self, fields: Vec<Field>) -> Sublogger {
        let mut merged = self.fields.clone();
        merged.extend(fields);
        Sublogger {
            engine: self.engine.clone(),
            fields: merged,
        }
    }
}

/// Builder for constructing an engine with a fluent API
///
/// # Example
/// ```
/// use logfan::Logfan;
/// use std::time::Duration;
///
/// let engine = Logfan::builder()
///     .max_queue_size(4096)
///     .enqueue_timeout(Duration::from_millis(50))
///     .build();
/// ```
pub struct Builder {
    max_queue_size: usize,
    enqueue_timeout: Duration,
    flush_timeout: Duration,
    on_queue_full: Option<QueueFullHook>,
    on_target_queue_full: Option<TargetQueueFullHook>,
    on_error: Option<ErrorHook>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    metrics_interval: Duration,
    max_pooled_buffer: usize,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
            flush_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            on_queue_full: None,
            on_target_queue_full: None,
            on_error: None,
            metrics: None,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            max_pooled_buffer: DEFAULT_MAX_POOLED_BUFFER,
        }
    }

    /// Capacity of the engine queue.
    #[must_use = "builder methods return a new value"]
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size.max(1);
        self
    }

    /// Bound on how long producers block on a full queue before dropping.
    #[must_use = "builder methods return a new value"]
    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Internal deadline for marker propagation during flush.
    #[must_use = "builder methods return a new value"]
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Decide drop-vs-block when the engine queue is full.
    #[must_use = "builder methods return a new value"]
    pub fn on_queue_full(mut self, hook: QueueFullHook) -> Self {
        self.on_queue_full = Some(hook);
        self
    }

    /// Decide drop-vs-block when one target's queue is full.
    #[must_use = "builder methods return a new value"]
    pub fn on_target_queue_full(mut self, hook: TargetQueueFullHook) -> Self {
        self.on_target_queue_full = Some(hook);
        self
    }

    /// Receive asynchronous-path failures instead of the stderr fallback.
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Wire a metrics collector; also starts the gauge ticker.
    #[must_use = "builder methods return a new value"]
    pub fn metrics(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(collector);
        self
    }

    /// Gauge-update interval, clamped to [`MIN_METRICS_INTERVAL`].
    #[must_use = "builder methods return a new value"]
    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval.max(MIN_METRICS_INTERVAL);
        self
    }

    /// Largest formatting buffer the pool will retain.
    #[must_use = "builder methods return a new value"]
    pub fn max_pooled_buffer(mut self, bytes: usize) -> Self {
        self.max_pooled_buffer = bytes;
        self
    }

    pub fn build(self) -> Logfan {
        let (tx, rx) = bounded(self.max_queue_size);
        let errors = ErrorSink::new(self.on_error);
        let metrics = Arc::new(TargetMetrics::new(
            self.metrics.as_ref(),
            ENGINE_METRICS_NAME,
        ));
        let has_collector = self.metrics.is_some();
        let metrics_interval = self.metrics_interval;

        let inner = Arc::new(Inner {
            opts: Options {
                max_queue_size: self.max_queue_size,
                enqueue_timeout: self.enqueue_timeout,
                flush_timeout: self.flush_timeout,
                on_queue_full: self.on_queue_full,
                on_target_queue_full: self.on_target_queue_full,
                metrics: self.metrics,
            },
            tx,
            hosts: RwLock::new(Vec::new()),
            cache: LevelCache::new(),
            pool: Arc::new(BufferPool::new(self.max_pooled_buffer)),
            errors,
            metrics,
            dispatcher: Mutex::new(None),
            ticker_stop: Mutex::new(None),
            shutdown_started: AtomicBool::new(false),
            terminal: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&inner);
        let handle = thread::Builder::new()
            .name("logfan-dispatcher".to_string())
            .spawn(move || run_dispatcher(weak, rx))
            .ok();
        *inner.dispatcher.lock() = handle;

        if has_collector {
            let (stop_tx, stop_rx) = bounded(0);
            let weak = Arc::downgrade(&inner);
            let spawned = thread::Builder::new()
                .name("logfan-metrics".to_string())
                .spawn(move || run_ticker(weak, stop_rx, metrics_interval))
                .is_ok();
            if spawned {
                *inner.ticker_stop.lock() = Some(stop_tx);
            }
        }

        Logfan { inner }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::StdFilter;
    use crate::core::level;
    use crate::core::record::{STACK_CAPTURES, STACK_RESOLVES};
    use crate::formatters::Plain;
    use crate::targets::testing::StoringTarget;

    fn storing_engine(filter_level: Level) -> (Logfan, StoringTarget) {
        let engine = Logfan::builder().build();
        let target = StoringTarget::new();
        engine
            .add_target(
                Box::new(target.clone()),
                "store",
                Arc::new(StdFilter::new(filter_level)),
                Arc::new(Plain::new()),
                100,
            )
            .expect("add_target");
        (engine, target)
    }

    #[test]
    fn test_no_targets_means_disabled() {
        let engine = Logfan::new();
        assert!(!engine.is_enabled(&level::ERROR));
        assert!(!engine.is_enabled(&level::TRACE));
    }

    #[test]
    fn test_add_target_flips_enablement_immediately() {
        let (engine, _target) = storing_engine(level::INFO);
        assert!(engine.is_enabled(&level::INFO));
        assert!(!engine.is_enabled(&level::DEBUG));
    }

    #[test]
    fn test_remove_targets_flips_enablement_immediately() {
        let (engine, _target) = storing_engine(level::INFO);
        assert!(engine.is_enabled(&level::INFO));
        engine
            .remove_targets(Duration::from_secs(2), |name| name == "store")
            .expect("remove");
        assert!(!engine.is_enabled(&level::INFO));
    }

    #[test]
    fn test_enablement_stays_fresh_under_membership_churn() {
        // A concurrent status() scan must not store an answer computed
        // before a membership change after that change's cache reset.
        let engine = Logfan::builder().build();
        let stop = Arc::new(AtomicBool::new(false));
        let reader = {
            let engine = engine.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let _ = engine.is_enabled(&level::INFO);
                }
            })
        };

        for _ in 0..300 {
            engine
                .add_target(
                    Box::new(StoringTarget::new()),
                    "churn",
                    Arc::new(StdFilter::new(level::INFO)),
                    Arc::new(Plain::new()),
                    10,
                )
                .expect("add_target");
            assert!(engine.is_enabled(&level::INFO));
            engine
                .remove_targets(Duration::from_secs(2), |name| name == "churn")
                .expect("remove");
            assert!(!engine.is_enabled(&level::INFO));
        }

        stop.store(true, Ordering::Relaxed);
        reader.join().expect("reader");
    }

    #[test]
    fn test_status_disabled_after_shutdown() {
        let (engine, _target) = storing_engine(level::TRACE);
        assert!(engine.is_enabled(&level::INFO));
        engine.shutdown(Duration::from_secs(2)).expect("shutdown");
        assert!(!engine.is_enabled(&level::INFO));
        assert!(!engine.is_enabled(&level::PANIC));
    }

    #[test]
    fn test_disabled_level_skips_stack_capture() {
        let _guard = crate::core::record::STACK_TEST_LOCK.lock();
        let (engine, _target) = storing_engine(level::ERROR);
        let before = STACK_CAPTURES.load(std::sync::atomic::Ordering::Relaxed);
        // DEBUG is disabled everywhere; FATAL would force a capture, so the
        // fast path must bail before even constructing the record.
        engine.log(level::DEBUG, "nobody listening", Vec::new());
        engine.log(
            Level::new(level::FATAL.id + 40, "custom-quiet", true),
            "still nobody",
            Vec::new(),
        );
        assert_eq!(
            STACK_CAPTURES.load(std::sync::atomic::Ordering::Relaxed),
            before
        );
    }

    #[test]
    fn test_enabled_stack_level_captures_and_resolves_once() {
        let _guard = crate::core::record::STACK_TEST_LOCK.lock();
        let (engine, _target) = storing_engine(level::FATAL);
        let captures = STACK_CAPTURES.load(std::sync::atomic::Ordering::Relaxed);
        let resolves = STACK_RESOLVES.load(std::sync::atomic::Ordering::Relaxed);
        engine.log(level::FATAL, "with stack", Vec::new());
        engine.flush(Duration::from_secs(2)).expect("flush");
        assert_eq!(
            STACK_CAPTURES.load(std::sync::atomic::Ordering::Relaxed),
            captures + 1
        );
        assert_eq!(
            STACK_RESOLVES.load(std::sync::atomic::Ordering::Relaxed),
            resolves + 1
        );
    }

    #[test]
    fn test_sublogger_fields_precede_call_site_fields() {
        let (engine, target) = storing_engine(level::INFO);
        let sub = engine.with_fields(vec![Field::string("service", "api")]);
        sub.log(level::INFO, "hi", vec![Field::int("n", 1)]);
        engine.flush(Duration::from_secs(2)).expect("flush");
        let lines = target.lines();
        assert_eq!(lines.len(), 1);
        let service = lines[0].find("service=api").expect("service field");
        let n = lines[0].find("n=1").expect("call-site field");
        assert!(service < n);
    }

    #[test]
    fn test_flush_after_shutdown_fails() {
        let (engine, _target) = storing_engine(level::INFO);
        engine.shutdown(Duration::from_secs(2)).expect("shutdown");
        assert!(matches!(
            engine.flush(Duration::from_secs(1)),
            Err(EngineError::AlreadyShutdown)
        ));
    }

    #[test]
    fn test_add_target_after_shutdown_fails() {
        let (engine, _target) = storing_engine(level::INFO);
        engine.shutdown(Duration::from_secs(2)).expect("shutdown");
        let result = engine.add_target(
            Box::new(StoringTarget::new()),
            "late",
            Arc::new(StdFilter::new(level::INFO)),
            Arc::new(Plain::new()),
            10,
        );
        assert!(matches!(result, Err(EngineError::AlreadyShutdown)));
    }
}
