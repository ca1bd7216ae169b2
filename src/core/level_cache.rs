//! Level-enablement cache
//!
//! A flat array of bit-packed slots indexed by level id. A populated slot
//! answers "is any target interested in this level, and does any of them
//! want a stack trace" with a single atomic load. The cache is cleared
//! wholesale whenever the target set changes; membership changes are rare
//! and a full reset is cheap relative to log-record volume.

use super::level::MAX_LEVEL_ID;
use std::sync::atomic::{AtomicU8, Ordering};

const POPULATED: u8 = 0b001;
const ENABLED: u8 = 0b010;
const STACKTRACE: u8 = 0b100;

/// The memoized answer for one level id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelStatus {
    pub enabled: bool,
    pub stacktrace: bool,
}

impl LevelStatus {
    pub const DISABLED: LevelStatus = LevelStatus {
        enabled: false,
        stacktrace: false,
    };
}

pub(crate) struct LevelCache {
    slots: Box<[AtomicU8]>,
}

impl LevelCache {
    pub(crate) fn new() -> Self {
        let slots: Vec<AtomicU8> = (0..=MAX_LEVEL_ID as usize)
            .map(|_| AtomicU8::new(0))
            .collect();
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    /// O(1) lookup. `None` on a miss; the caller scans the target filters
    /// and stores the result with [`LevelCache::put`].
    pub(crate) fn get(&self, id: u16) -> Option<LevelStatus> {
        let bits = self.slots[id as usize].load(Ordering::Acquire);
        if bits & POPULATED == 0 {
            return None;
        }
        Some(LevelStatus {
            enabled: bits & ENABLED != 0,
            stacktrace: bits & STACKTRACE != 0,
        })
    }

    pub(crate) fn put(&self, id: u16, status: LevelStatus) {
        let mut bits = POPULATED;
        if status.enabled {
            bits |= ENABLED;
        }
        if status.stacktrace {
            bits |= STACKTRACE;
        }
        self.slots[id as usize].store(bits, Ordering::Release);
    }

    /// Clear every slot. Must run under the same lock that protects the
    /// target-host list so no stale "enabled" answer survives a membership
    /// change.
    pub(crate) fn reset(&self) {
        for slot in self.slots.iter() {
            slot.store(0, Ordering::Release);
        }
    }
}
