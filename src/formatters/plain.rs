//! Delimited text formatter

use crate::core::{Formatter, Record, Result};
use std::io::Write;

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Human-readable text: timestamp, level, message, then `key=value` fields,
/// one record per line, with optional color and stack traces.
pub struct Plain {
    delim: String,
    timestamp_format: String,
    use_color: bool,
    stacktrace: bool,
}

impl Plain {
    pub fn new() -> Self {
        Self {
            delim: " ".to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            use_color: false,
            stacktrace: false,
        }
    }

    #[must_use]
    pub fn with_delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    /// Set a strftime-compatible timestamp format string.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Colorize the level name by severity (requires the `console` feature;
    /// a no-op without it).
    #[must_use]
    pub fn with_color(mut self, enable: bool) -> Self {
        self.use_color = enable;
        self
    }

    /// Render resolved stack frames under the record line. Also signals the
    /// engine that stack capture is worthwhile for this target.
    #[must_use]
    pub fn with_stacktrace(mut self, enable: bool) -> Self {
        self.stacktrace = enable;
        self
    }

    #[cfg(feature = "console")]
    fn level_label(&self, name: &str, id: u16) -> String {
        use colored::Colorize;
        if !self.use_color {
            return name.to_string();
        }
        match id {
            0..=1 => name.bright_red().to_string(),
            2 => name.red().to_string(),
            3 => name.yellow().to_string(),
            4 => name.green().to_string(),
            5 => name.blue().to_string(),
            _ => name.bright_black().to_string(),
        }
    }

    #[cfg(not(feature = "console"))]
    fn level_label(&self, name: &str, _id: u16) -> String {
        name.to_string()
    }
}

impl Default for Plain {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for Plain {
    fn is_stacktrace_needed(&self) -> bool {
        self.stacktrace
    }

    fn format(&self, record: &Record, buf: &mut Vec<u8>) -> Result<()> {
        let timestamp = record.time.format(&self.timestamp_format);
        let label = self.level_label(&record.level.name, record.level.id);
        write!(buf, "[{}]{}[{:<5}]{}{}", timestamp, self.delim, label, self.delim, record.msg)?;
        for field in record.fields() {
            write!(buf, "{}{}", self.delim, field)?;
        }
        if self.stacktrace {
            if let Some(frames) = record.stack_frames() {
                for frame in frames {
                    write!(buf, "\n  at {} ({}:{})", frame.function, frame.file, frame.line)?;
                }
            }
        }
        buf.push(b'\n');
        Ok(())
    }
}
