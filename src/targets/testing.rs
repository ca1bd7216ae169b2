//! Support targets for tests
//!
//! `StoringTarget` records every formatted line in memory; `BlockingTarget`
//! stalls in `write` until released, for isolation and backpressure tests.

use crate::core::{Record, Result, Target};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Collects formatted lines in memory. Cloning shares the underlying
/// storage, so tests keep a handle while the engine owns the target.
#[derive(Clone, Default)]
pub struct StoringTarget {
    lines: Arc<Mutex<Vec<String>>>,
}

impl StoringTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Target for StoringTarget {
    fn write(&mut self, buf: &[u8], _record: &Record) -> Result<usize> {
        let line = String::from_utf8_lossy(buf).trim_end().to_string();
        self.lines.lock().push(line);
        Ok(buf.len())
    }
}

/// Blocks inside `write` until released. Counts how many writes were
/// entered so tests can wait for the worker to be stuck.
#[derive(Clone, Default)]
pub struct BlockingTarget {
    entered: Arc<AtomicU64>,
    released: Arc<AtomicBool>,
}

impl BlockingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that have started (not necessarily finished).
    pub fn entered(&self) -> u64 {
        self.entered.load(Ordering::SeqCst)
    }

    /// Let all current and future writes return immediately.
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    /// Spin until at least `n` writes have started, up to `timeout`.
    pub fn wait_entered(&self, n: u64, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.entered() < n {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        true
    }
}

impl Target for BlockingTarget {
    fn write(&mut self, buf: &[u8], _record: &Record) -> Result<usize> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        while !self.released.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(2));
        }
        Ok(buf.len())
    }
}
