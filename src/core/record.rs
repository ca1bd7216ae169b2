//! Log record structure
//!
//! A `Record` is created once per log call by the producer. The expensive
//! work (merging producer fields with call-site fields and resolving the
//! captured stack into frames) is deferred to [`Record::prep`], which the
//! dispatcher invokes exactly once before fan-out. After `prep` the record
//! is read-only and shared across every target worker via `Arc`.

use super::field::Field;
use super::level::Level;
use chrono::{DateTime, Utc};

#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(test)]
pub(crate) static STACK_CAPTURES: AtomicU64 = AtomicU64::new(0);
#[cfg(test)]
pub(crate) static STACK_RESOLVES: AtomicU64 = AtomicU64::new(0);
/// Serializes tests that assert on the counters above; any test that
/// captures a stack must hold this lock.
#[cfg(test)]
pub(crate) static STACK_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

/// One resolved stack frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// Stack capture state. Program counters are captured cheaply at the log
/// site (only when some interested target wants them) and resolved to
/// frames in `prep`.
#[derive(Debug)]
enum StackState {
    None,
    Captured(backtrace::Backtrace),
    Resolved(Vec<Frame>),
}

#[derive(Debug)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub msg: String,
    fields: Vec<Field>,
    producer_fields: Vec<Field>,
    stack: StackState,
    prepped: bool,
}

impl Record {
    /// Sanitize the message to prevent log injection: newlines, carriage
    /// returns, and tabs become escape sequences so an attacker cannot
    /// forge additional log lines.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: Level, message: String, fields: Vec<Field>) -> Self {
        Self {
            time: Utc::now(),
            level,
            msg: Self::sanitize_message(&message),
            fields,
            producer_fields: Vec::new(),
            stack: StackState::None,
            prepped: false,
        }
    }

    /// Attach fields carried by the producer (e.g. a sublogger's bound
    /// fields). Merged ahead of call-site fields in `prep`.
    pub fn with_producer_fields(mut self, fields: Vec<Field>) -> Self {
        self.producer_fields = fields;
        self
    }

    /// Capture the current call stack without resolving symbols.
    ///
    /// Cheap relative to resolution; called at the log site only when the
    /// enablement status says some interested target needs a stack trace.
    pub fn capture_stack(&mut self) {
        #[cfg(test)]
        STACK_CAPTURES.fetch_add(1, Ordering::Relaxed);
        self.stack = StackState::Captured(backtrace::Backtrace::new_unresolved());
    }

    /// Finalize the record: merge producer fields ahead of call-site fields
    /// and resolve captured program counters into frames.
    ///
    /// Invoked exactly once, by the dispatcher, never the producer. A second
    /// call is a no-op.
    pub fn prep(&mut self) {
        if self.prepped {
            return;
        }
        self.prepped = true;

        if !self.producer_fields.is_empty() {
            let mut merged =
                Vec::with_capacity(self.producer_fields.len() + self.fields.len());
            merged.append(&mut self.producer_fields);
            merged.append(&mut self.fields);
            self.fields = merged;
        }

        if let StackState::Captured(bt) = &mut self.stack {
            #[cfg(test)]
            STACK_RESOLVES.fetch_add(1, Ordering::Relaxed);
            bt.resolve();
            let frames = bt
                .frames()
                .iter()
                .flat_map(|f| f.symbols())
                .map(|sym| Frame {
                    function: sym.name().map(|n| n.to_string()).unwrap_or_default(),
                    file: sym
                        .filename()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    line: sym.lineno().unwrap_or(0),
                })
                .collect();
            self.stack = StackState::Resolved(frames);
        }
    }

    pub fn is_prepped(&self) -> bool {
        self.prepped
    }

    /// All fields, producer fields first. Complete only after `prep`.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Resolved stack frames, if a stack was captured. `None` before `prep`
    /// or when no capture happened.
    pub fn stack_frames(&self) -> Option<&[Frame]> {
        match &self.stack {
            StackState::Resolved(frames) => Some(frames),
            _ => None,
        }
    }

    pub fn has_captured_stack(&self) -> bool {
        matches!(self.stack, StackState::Captured(_) | StackState::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level;

    #[test]
    fn test_message_sanitized() {
        let rec = Record::new(
            level::INFO,
            "line1\nFAKE error\tentry\r".to_string(),
            Vec::new(),
        );
        assert_eq!(rec.msg, "line1\\nFAKE error\\tentry\\r");
    }

    #[test]
    fn test_prep_merges_producer_fields_first() {
        let mut rec = Record::new(
            level::INFO,
            "msg".to_string(),
            vec![Field::int("call", 1)],
        )
        .with_producer_fields(vec![Field::string("service", "api")]);

        rec.prep();

        let keys: Vec<&str> = rec.fields().iter().map(|f| f.key.as_ref()).collect();
        assert_eq!(keys, vec!["service", "call"]);
    }

    #[test]
    fn test_prep_is_idempotent() {
        let mut rec = Record::new(level::INFO, "msg".to_string(), vec![Field::int("n", 1)])
            .with_producer_fields(vec![Field::int("p", 2)]);
        assert!(!rec.is_prepped());
        rec.prep();
        assert!(rec.is_prepped());
        rec.prep();
        assert_eq!(rec.fields().len(), 2);
    }

    #[test]
    fn test_stack_resolution_deferred_to_prep() {
        let _guard = STACK_TEST_LOCK.lock();
        let mut rec = Record::new(level::ERROR, "boom".to_string(), Vec::new());
        rec.capture_stack();
        assert!(rec.has_captured_stack());
        assert!(rec.stack_frames().is_none());

        let before = STACK_RESOLVES.load(Ordering::Relaxed);
        rec.prep();
        assert!(STACK_RESOLVES.load(Ordering::Relaxed) > before);
        assert!(rec.stack_frames().is_some());
    }

    #[test]
    fn test_no_capture_no_resolution() {
        let _guard = STACK_TEST_LOCK.lock();
        let mut rec = Record::new(level::INFO, "quiet".to_string(), Vec::new());
        let before = STACK_RESOLVES.load(Ordering::Relaxed);
        rec.prep();
        assert_eq!(STACK_RESOLVES.load(Ordering::Relaxed), before);
        assert!(rec.stack_frames().is_none());
    }
}
