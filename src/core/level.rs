//! Log level definitions
//!
//! A `Level` is identified by its numeric id; distinct `Level` values may
//! share an id. Ids are small (`<= u16::MAX`) so the enablement cache can be
//! a flat array indexed by id.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Maximum level id supported by the enablement cache.
pub const MAX_LEVEL_ID: u16 = u16::MAX;

/// A log level with a numeric identity, a display name, and a flag that
/// forces stack capture for records logged at this level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: u16,
    pub name: Cow<'static, str>,
    /// When true, records at this level always capture a stack trace,
    /// regardless of what filters ask for.
    #[serde(default)]
    pub stacktrace: bool,
}

impl Level {
    pub const fn new_static(id: u16, name: &'static str, stacktrace: bool) -> Self {
        Self {
            id,
            name: Cow::Borrowed(name),
            stacktrace,
        }
    }

    pub fn new(id: u16, name: impl Into<String>, stacktrace: bool) -> Self {
        Self {
            id,
            name: Cow::Owned(name.into()),
            stacktrace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Standard levels, ordered by ascending id = descending severity.
///
/// The classic threshold filter enables a level when `id <= threshold.id`,
/// so `PANIC` (id 0) is always the most severe.
pub const PANIC: Level = Level::new_static(0, "panic", true);
pub const FATAL: Level = Level::new_static(1, "fatal", true);
pub const ERROR: Level = Level::new_static(2, "error", false);
pub const WARN: Level = Level::new_static(3, "warn", false);
pub const INFO: Level = Level::new_static(4, "info", false);
pub const DEBUG: Level = Level::new_static(5, "debug", false);
pub const TRACE: Level = Level::new_static(6, "trace", false);

/// Look up a standard level by its name (case-insensitive).
pub fn by_name(name: &str) -> Option<Level> {
    match name.to_ascii_lowercase().as_str() {
        "panic" => Some(PANIC),
        "fatal" => Some(FATAL),
        "error" => Some(ERROR),
        "warn" | "warning" => Some(WARN),
        "info" => Some(INFO),
        "debug" => Some(DEBUG),
        "trace" => Some(TRACE),
        _ => None,
    }
}
