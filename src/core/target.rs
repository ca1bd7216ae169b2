//! Target trait for log output sinks
//!
//! A target is a concrete sink (console, file, network). `write` is always
//! called from exactly one thread, the owning host's worker, so
//! implementations need no internal locking for it; `init` and `shutdown`
//! are serialized against in-flight use by the host lifecycle.

use super::{error::Result, record::Record};

pub trait Target: Send {
    /// One-time setup before any write. Errors surface synchronously to the
    /// caller of `add_target`.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write pre-formatted bytes for the given record. Returns the number
    /// of bytes written.
    fn write(&mut self, buf: &[u8], record: &Record) -> Result<usize>;

    /// Release resources. Called once, after the host's queue has drained
    /// (or the drain deadline passed).
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
