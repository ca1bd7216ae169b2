//! Core engine types and traits

pub mod buffer_pool;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod filter;
pub mod formatter;
pub mod hooks;
pub(crate) mod host;
pub mod level;
pub mod level_cache;
pub mod metrics;
pub mod record;
pub mod target;

pub use buffer_pool::DEFAULT_MAX_POOLED_BUFFER;
pub use config::{TargetConfig, TargetFactory, TargetsConfig};
pub use engine::{
    Builder, Logfan, Sublogger, DEFAULT_ENQUEUE_TIMEOUT, DEFAULT_MAX_QUEUE_SIZE,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::{EngineError, Result};
pub use field::{Field, FieldValue};
pub use filter::{CustomFilter, Filter, StdFilter};
pub use formatter::Formatter;
pub use hooks::{ErrorHook, QueueFullHook, TargetQueueFullHook};
pub use level::Level;
pub use level_cache::LevelStatus;
pub use metrics::{
    AtomicMetrics, Counter, Gauge, MetricsCollector, DEFAULT_METRICS_INTERVAL,
    ENGINE_METRICS_NAME, MIN_METRICS_INTERVAL,
};
pub use record::{Frame, Record};
pub use target::Target;
