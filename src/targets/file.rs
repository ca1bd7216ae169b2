//! File target

use crate::core::{EngineError, Record, Result, Target};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends formatted records to a file. The file is opened in `init`, so a
/// bad path surfaces synchronously from `add_target`. Each write is flushed
/// through to the OS so a flush marker ack means the bytes left the
/// process.
pub struct FileTarget {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileTarget {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }
}

impl Target for FileTarget {
    fn init(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn write(&mut self, buf: &[u8], _record: &Record) -> Result<usize> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            EngineError::write(
                self.path.display().to_string(),
                "file target not initialized",
            )
        })?;
        writer.write_all(buf)?;
        writer.flush()?;
        Ok(buf.len())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
