//! JSON line formatter

use crate::core::{Formatter, Record, Result};
use chrono::SecondsFormat;
use serde_json::{Map, Value};

/// One JSON object per line: `timestamp`, `level`, `msg`, a `fields`
/// object, and optionally a `stacktrace` array of frames.
pub struct Json {
    stacktrace: bool,
}

impl Json {
    pub fn new() -> Self {
        Self { stacktrace: false }
    }

    /// Include resolved stack frames. Also signals the engine that stack
    /// capture is worthwhile for this target.
    #[must_use]
    pub fn with_stacktrace(mut self, enable: bool) -> Self {
        self.stacktrace = enable;
        self
    }
}

impl Default for Json {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for Json {
    fn is_stacktrace_needed(&self) -> bool {
        self.stacktrace
    }

    fn format(&self, record: &Record, buf: &mut Vec<u8>) -> Result<()> {
        let mut obj = Map::new();
        obj.insert(
            "timestamp".to_string(),
            Value::String(record.time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        obj.insert(
            "level".to_string(),
            Value::String(record.level.name.to_string()),
        );
        obj.insert("msg".to_string(), Value::String(record.msg.clone()));

        if !record.fields().is_empty() {
            let mut fields = Map::new();
            for field in record.fields() {
                fields.insert(field.key.to_string(), field.value.to_json_value());
            }
            obj.insert("fields".to_string(), Value::Object(fields));
        }

        if self.stacktrace {
            if let Some(frames) = record.stack_frames() {
                let frames: Vec<Value> = frames
                    .iter()
                    .map(|f| {
                        let mut frame = Map::new();
                        frame.insert("function".to_string(), Value::String(f.function.clone()));
                        frame.insert("file".to_string(), Value::String(f.file.clone()));
                        frame.insert("line".to_string(), Value::Number(f.line.into()));
                        Value::Object(frame)
                    })
                    .collect();
                obj.insert("stacktrace".to_string(), Value::Array(frames));
            }
        }

        serde_json::to_writer(&mut *buf, &Value::Object(obj))?;
        buf.push(b'\n');
        Ok(())
    }
}
