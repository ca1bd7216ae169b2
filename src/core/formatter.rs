//! Formatter trait: converts a record into sink-specific bytes

use super::{error::Result, record::Record};

pub trait Formatter: Send + Sync {
    /// Whether this formatter renders stack traces. Lets the engine skip
    /// stack capture when nothing downstream would use it.
    fn is_stacktrace_needed(&self) -> bool {
        false
    }

    /// Render the record into `buf`. The buffer comes from the host's pool
    /// and may contain leftover capacity but no leftover bytes.
    fn format(&self, record: &Record, buf: &mut Vec<u8>) -> Result<()>;
}
