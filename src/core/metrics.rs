//! Metrics wiring for the engine and each target
//!
//! A `MetricsCollector` hands out counter/gauge handles once at
//! construction; counters are incremented inline on the relevant event and
//! a background ticker updates queue-size gauges. Everything is best-effort:
//! with no collector configured there is zero overhead and no ticker thread.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Name under which the engine's own metrics are registered.
pub const ENGINE_METRICS_NAME: &str = "_engine";

/// Minimum gauge-update interval; shorter configured intervals are clamped
/// so the ticker cannot peg a core.
pub const MIN_METRICS_INTERVAL: Duration = Duration::from_millis(250);

/// Default gauge-update interval.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(1);

pub trait Counter: Send + Sync {
    fn inc(&self);
    fn add(&self, n: u64);
}

pub trait Gauge: Send + Sync {
    fn set(&self, value: f64);
}

/// Factory for per-target metric handles. Implemented by embedders to wire
/// the engine into their metrics system; [`AtomicMetrics`] is an in-crate
/// implementation backed by atomics.
pub trait MetricsCollector: Send + Sync {
    fn queue_size_gauge(&self, target: &str) -> Arc<dyn Gauge>;
    fn logged_counter(&self, target: &str) -> Arc<dyn Counter>;
    fn error_counter(&self, target: &str) -> Arc<dyn Counter>;
    fn dropped_counter(&self, target: &str) -> Arc<dyn Counter>;
    fn blocked_counter(&self, target: &str) -> Arc<dyn Counter>;
}

/// The handles one target (or the engine) holds. A `None` handle is a no-op.
#[derive(Clone, Default)]
pub(crate) struct TargetMetrics {
    logged: Option<Arc<dyn Counter>>,
    errors: Option<Arc<dyn Counter>>,
    dropped: Option<Arc<dyn Counter>>,
    blocked: Option<Arc<dyn Counter>>,
    queue_size: Option<Arc<dyn Gauge>>,
}

impl TargetMetrics {
    pub(crate) fn new(collector: Option<&Arc<dyn MetricsCollector>>, name: &str) -> Self {
        match collector {
            Some(c) => Self {
                logged: Some(c.logged_counter(name)),
                errors: Some(c.error_counter(name)),
                dropped: Some(c.dropped_counter(name)),
                blocked: Some(c.blocked_counter(name)),
                queue_size: Some(c.queue_size_gauge(name)),
            },
            None => Self::default(),
        }
    }

    #[inline]
    pub(crate) fn incr_logged(&self) {
        if let Some(c) = &self.logged {
            c.inc();
        }
    }

    #[inline]
    pub(crate) fn incr_errors(&self) {
        if let Some(c) = &self.errors {
            c.inc();
        }
    }

    #[inline]
    pub(crate) fn incr_dropped(&self) {
        if let Some(c) = &self.dropped {
            c.inc();
        }
    }

    #[inline]
    pub(crate) fn incr_blocked(&self) {
        if let Some(c) = &self.blocked {
            c.inc();
        }
    }

    #[inline]
    pub(crate) fn set_queue_size(&self, len: usize) {
        if let Some(g) = &self.queue_size {
            g.set(len as f64);
        }
    }
}

struct AtomicCounter(AtomicU64);

impl Counter for AtomicCounter {
    fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }
}

struct AtomicGauge(AtomicU64);

impl Gauge for AtomicGauge {
    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Atomic-backed collector, queryable by name. Used by the test suite and
/// handy for embedders without a metrics system.
#[derive(Default)]
pub struct AtomicMetrics {
    counters: RwLock<HashMap<String, Arc<AtomicCounter>>>,
    gauges: RwLock<HashMap<String, Arc<AtomicGauge>>>,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, target: &str, kind: &str) -> Arc<dyn Counter> {
        let key = format!("{}.{}", target, kind);
        if let Some(c) = self.counters.read().get(&key) {
            return c.clone();
        }
        let mut counters = self.counters.write();
        counters
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicCounter(AtomicU64::new(0))))
            .clone()
    }

    /// Current value of a counter, by target name and kind
    /// (`"logged"`, `"errors"`, `"dropped"`, `"blocked"`). Zero if never used.
    pub fn counter_value(&self, target: &str, kind: &str) -> u64 {
        let key = format!("{}.{}", target, kind);
        self.counters
            .read()
            .get(&key)
            .map(|c| c.0.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Last value set on a target's queue-size gauge.
    pub fn gauge_value(&self, target: &str) -> f64 {
        self.gauges
            .read()
            .get(target)
            .map(|g| f64::from_bits(g.0.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }
}

impl MetricsCollector for AtomicMetrics {
    fn queue_size_gauge(&self, target: &str) -> Arc<dyn Gauge> {
        if let Some(g) = self.gauges.read().get(target) {
            return g.clone();
        }
        let mut gauges = self.gauges.write();
        gauges
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(AtomicGauge(AtomicU64::new(0))))
            .clone()
    }

    fn logged_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.counter(target, "logged")
    }

    fn error_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.counter(target, "errors")
    }

    fn dropped_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.counter(target, "dropped")
    }

    fn blocked_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.counter(target, "blocked")
    }
}
