//! Caller-supplied hooks for backpressure and error reporting

use super::error::EngineError;
use super::record::Record;
use std::sync::Arc;

/// Decides whether a record should be dropped when the engine queue is
/// full. Receives the record and the queue capacity; returning `true`
/// drops the record immediately (counted), returning `false` falls back to
/// a bounded blocking enqueue.
pub type QueueFullHook = Arc<dyn Fn(&Record, usize) -> bool + Send + Sync>;

/// Same decision, scoped to one target's queue. Receives the target name,
/// the record, and that target's queue capacity.
pub type TargetQueueFullHook = Arc<dyn Fn(&str, &Record, usize) -> bool + Send + Sync>;

/// Receives every asynchronous-path failure (write errors, format errors,
/// enqueue timeouts). When unset, failures go to stderr.
pub type ErrorHook = Arc<dyn Fn(&EngineError) + Send + Sync>;

/// Routes engine errors to the configured hook, or stderr as a fallback.
#[derive(Clone, Default)]
pub(crate) struct ErrorSink {
    hook: Option<ErrorHook>,
}

impl ErrorSink {
    pub(crate) fn new(hook: Option<ErrorHook>) -> Self {
        Self { hook }
    }

    pub(crate) fn report(&self, err: &EngineError) {
        match &self.hook {
            Some(hook) => hook(err),
            None => eprintln!("[LOGFAN ERROR] {}", err),
        }
    }
}
