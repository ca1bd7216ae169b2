//! Level filters owned by each target
//!
//! Two filter styles share one trait: the classic ascending-severity
//! threshold ([`StdFilter`]) and an arbitrary discrete level set
//! ([`CustomFilter`]). The engine treats both uniformly.

use super::level::Level;

pub trait Filter: Send + Sync {
    /// Does this target want records at the given level?
    fn is_enabled(&self, level: &Level) -> bool;

    /// Does this target want a stack trace attached at the given level?
    fn is_stacktrace_enabled(&self, level: &Level) -> bool;
}

/// Classic severity-threshold filter: a level is enabled when its id is at
/// or below the threshold id (lower id = more severe).
#[derive(Debug, Clone)]
pub struct StdFilter {
    level: Level,
    stacktrace_level: Option<Level>,
}

impl StdFilter {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            stacktrace_level: None,
        }
    }

    /// Also request stack traces for levels at or above the given severity.
    #[must_use]
    pub fn with_stacktrace_level(mut self, level: Level) -> Self {
        self.stacktrace_level = Some(level);
        self
    }
}

impl Filter for StdFilter {
    fn is_enabled(&self, level: &Level) -> bool {
        level.id <= self.level.id
    }

    fn is_stacktrace_enabled(&self, level: &Level) -> bool {
        match &self.stacktrace_level {
            Some(threshold) => level.id <= threshold.id,
            None => false,
        }
    }
}

/// Discrete-set filter: enabled only for levels whose id is in the set.
/// Stack traces follow each member level's own `stacktrace` flag.
#[derive(Debug, Clone, Default)]
pub struct CustomFilter {
    levels: Vec<Level>,
}

impl CustomFilter {
    pub fn new(levels: Vec<Level>) -> Self {
        Self { levels }
    }

    pub fn add(&mut self, level: Level) {
        if !self.levels.iter().any(|l| l.id == level.id) {
            self.levels.push(level);
        }
    }
}

impl Filter for CustomFilter {
    fn is_enabled(&self, level: &Level) -> bool {
        self.levels.iter().any(|l| l.id == level.id)
    }

    fn is_stacktrace_enabled(&self, level: &Level) -> bool {
        self.levels
            .iter()
            .any(|l| l.id == level.id && l.stacktrace)
    }
}
