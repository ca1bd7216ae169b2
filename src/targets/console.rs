//! Console target

use crate::core::{Record, Result, Target};
use serde::Deserialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

pub struct ConsoleTarget {
    stream: ConsoleStream,
}

impl ConsoleTarget {
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleStream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleStream::Stderr)
    }
}

impl Target for ConsoleTarget {
    fn write(&mut self, buf: &[u8], _record: &Record) -> Result<usize> {
        match self.stream {
            ConsoleStream::Stdout => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                lock.write_all(buf)?;
            }
            ConsoleStream::Stderr => {
                let stderr = std::io::stderr();
                let mut lock = stderr.lock();
                lock.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().flush()?,
            ConsoleStream::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }
}
