//! # Logfan
//!
//! An asynchronous, multi-target log-record dispatch engine. Records are
//! accepted on a bounded queue and fanned out to independent per-target
//! workers, so one slow sink never stalls producers or other targets.
//!
//! ## Features
//!
//! - **Cheap disabled levels**: a memoized enablement cache answers the
//!   fast path without touching any target
//! - **Lazy stack traces**: captured only when some target wants one,
//!   resolved once on the dispatcher
//! - **Bounded everywhere**: two-stage backpressure with drop hooks on the
//!   engine queue and every target queue
//! - **Deterministic flush and shutdown**: markers travel the queues in
//!   FIFO order, so an ack means every earlier record was written

pub mod core;
pub mod formatters;
pub mod global;
pub mod targets;

pub mod prelude {
    pub use crate::core::{
        AtomicMetrics, Builder, Counter, CustomFilter, EngineError, Field, FieldValue, Filter,
        Formatter, Gauge, Level, LevelStatus, Logfan, MetricsCollector, Record, Result, StdFilter,
        Sublogger, Target, TargetConfig, TargetFactory, TargetsConfig, DEFAULT_ENQUEUE_TIMEOUT,
        DEFAULT_MAX_QUEUE_SIZE, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::formatters::{Json, Plain};
    pub use crate::global::{global, set_global};
    pub use crate::targets::{ConsoleTarget, FileTarget, TcpTarget};
}

pub use crate::core::{
    AtomicMetrics, Builder, Counter, CustomFilter, EngineError, Field, FieldValue, Filter,
    Formatter, Gauge, Level, LevelStatus, Logfan, MetricsCollector, Record, Result, StdFilter,
    Sublogger, Target, TargetConfig, TargetFactory, TargetsConfig, DEFAULT_ENQUEUE_TIMEOUT,
    DEFAULT_MAX_QUEUE_SIZE, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::global::{global, set_global};
pub use crate::targets::{ConsoleTarget, FileTarget, TcpTarget};
