//! Per-target queue and worker
//!
//! A `TargetHost` owns one target, one bounded queue, and one dedicated
//! worker thread, isolating that target's slowness or failure from every
//! other target. Records arrive already prepped and shared read-only.

use super::buffer_pool::BufferPool;
use super::error::{EngineError, Result};
use super::filter::Filter;
use super::formatter::Formatter;
use super::hooks::{ErrorSink, TargetQueueFullHook};
use super::metrics::TargetMetrics;
use super::record::Record;
use super::target::Target;
use crossbeam_channel::{bounded, Receiver, Sender, SendTimeoutError, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) enum HostMsg {
    Log(Arc<Record>),
    /// Drain marker: by queue FIFO, every record enqueued before it has
    /// been written once the worker pops it; the worker acks immediately.
    Flush(Sender<()>),
}

/// Outcome of handing a flush marker to a host.
pub(crate) enum FlushSend {
    Sent,
    /// Intake already closed (target removed or shut down).
    Closed,
    TimedOut,
}

pub(crate) struct TargetHost {
    name: String,
    pub(crate) filter: Arc<dyn Filter>,
    formatter_wants_stack: bool,
    capacity: usize,
    enqueue_timeout: Duration,
    on_queue_full: Option<TargetQueueFullHook>,
    errors: ErrorSink,
    metrics: Arc<TargetMetrics>,
    tx: RwLock<Option<Sender<HostMsg>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    abandon: Arc<AtomicBool>,
    shut: AtomicBool,
}

struct WorkerCtx {
    name: String,
    formatter: Arc<dyn Formatter>,
    pool: Arc<BufferPool>,
    metrics: Arc<TargetMetrics>,
    errors: ErrorSink,
    abandon: Arc<AtomicBool>,
}

impl WorkerCtx {
    fn write_record(&self, target: &mut Box<dyn Target>, rec: &Record) {
        let mut buf = self.pool.get();
        match self.formatter.format(rec, &mut buf) {
            Ok(()) => match target.write(&buf, rec) {
                Ok(_) => self.metrics.incr_logged(),
                Err(e) => {
                    self.metrics.incr_errors();
                    self.errors
                        .report(&EngineError::write(self.name.as_str(), e.to_string()));
                }
            },
            Err(e) => {
                self.metrics.incr_errors();
                self.errors
                    .report(&EngineError::format(self.name.as_str(), e.to_string()));
            }
        }
        self.pool.put(buf);
    }
}

fn run_worker(mut target: Box<dyn Target>, rx: Receiver<HostMsg>, ctx: WorkerCtx) {
    loop {
        if ctx.abandon.load(Ordering::Relaxed) {
            break;
        }
        match rx.recv() {
            Ok(HostMsg::Log(rec)) => {
                // A panicking formatter or target must not kill the worker;
                // the record is counted as an error and processing continues.
                let outcome =
                    catch_unwind(AssertUnwindSafe(|| ctx.write_record(&mut target, &rec)));
                if outcome.is_err() {
                    ctx.metrics.incr_errors();
                    ctx.errors.report(&EngineError::other(format!(
                        "target '{}' panicked while writing a record",
                        ctx.name
                    )));
                }
            }
            Ok(HostMsg::Flush(ack)) => {
                let _ = ack.send(());
            }
            // Intake closed and queue drained.
            Err(_) => break,
        }
    }
    if let Err(e) = target.shutdown() {
        ctx.errors
            .report(&EngineError::write(ctx.name.as_str(), e.to_string()));
    }
}

impl TargetHost {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn start(
        name: String,
        target: Box<dyn Target>,
        filter: Arc<dyn Filter>,
        formatter: Arc<dyn Formatter>,
        capacity: usize,
        enqueue_timeout: Duration,
        on_queue_full: Option<TargetQueueFullHook>,
        errors: ErrorSink,
        metrics: Arc<TargetMetrics>,
        pool: Arc<BufferPool>,
    ) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        let abandon = Arc::new(AtomicBool::new(false));
        let formatter_wants_stack = formatter.is_stacktrace_needed();

        let ctx = WorkerCtx {
            name: name.clone(),
            formatter,
            pool,
            metrics: Arc::clone(&metrics),
            errors: errors.clone(),
            abandon: Arc::clone(&abandon),
        };
        let handle = thread::Builder::new()
            .name(format!("logfan-target-{}", name))
            .spawn(move || run_worker(target, rx, ctx))
            .ok();

        Self {
            name,
            filter,
            formatter_wants_stack,
            capacity,
            enqueue_timeout,
            on_queue_full,
            errors,
            metrics,
            tx: RwLock::new(Some(tx)),
            handle: Mutex::new(handle),
            abandon,
            shut: AtomicBool::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Whether this host's formatter renders stack traces.
    pub(crate) fn formatter_wants_stack(&self) -> bool {
        self.formatter_wants_stack
    }

    /// Enqueue a prepped record with the two-stage full-queue policy:
    /// consult the drop hook, else block up to the enqueue timeout, else
    /// report and drop. Scoped per target so one slow sink cannot starve
    /// others.
    pub(crate) fn log(&self, rec: Arc<Record>) {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return; // shut down
        };
        match tx.try_send(HostMsg::Log(rec)) {
            Ok(()) => {}
            Err(TrySendError::Full(HostMsg::Log(rec))) => {
                if let Some(hook) = &self.on_queue_full {
                    if hook(&self.name, &rec, self.capacity) {
                        self.metrics.incr_dropped();
                        return;
                    }
                }
                self.metrics.incr_blocked();
                match tx.send_timeout(HostMsg::Log(rec), self.enqueue_timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.metrics.incr_dropped();
                        self.errors.report(&EngineError::EnqueueTimeout {
                            target: self.name.clone(),
                            capacity: self.capacity,
                            timeout: self.enqueue_timeout,
                        });
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {}
                }
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Send a flush marker; the worker acks on `ack` once everything queued
    /// before the marker has been written.
    pub(crate) fn send_flush(&self, ack: Sender<()>, timeout: Duration) -> FlushSend {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return FlushSend::Closed;
        };
        match tx.send_timeout(HostMsg::Flush(ack), timeout) {
            Ok(()) => FlushSend::Sent,
            Err(SendTimeoutError::Timeout(_)) => FlushSend::TimedOut,
            Err(SendTimeoutError::Disconnected(_)) => FlushSend::Closed,
        }
    }

    pub(crate) fn update_queue_gauge(&self) {
        let len = self.tx.read().as_ref().map(|t| t.len()).unwrap_or(0);
        self.metrics.set_queue_size(len);
    }

    /// Close the intake, let the worker drain best-effort until `deadline`,
    /// then the worker shuts the target down. Returns before the deadline
    /// even if draining is incomplete, reporting a drain timeout.
    pub(crate) fn shutdown(&self, deadline: Instant) -> Result<()> {
        if self.shut.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Dropping the sender closes the channel; recv drains what's left.
        self.tx.write().take();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    // Tell the worker to stop draining; it still calls
                    // Target::shutdown on its way out.
                    self.abandon.store(true, Ordering::Relaxed);
                    return Err(EngineError::TargetDrainTimeout {
                        target: self.name.clone(),
                    });
                }
                thread::sleep(JOIN_POLL_INTERVAL);
            }
        }
        Ok(())
    }
}
