//! TCP target for remote logging
//!
//! Dials lazily on the first write and reconnects with exponential backoff
//! capped at a maximum, so a down collector costs one cheap clock check per
//! record instead of a connect attempt.

use crate::core::{EngineError, Record, Result, Target};
use std::io::Write;
use std::net::TcpStream;
use std::time::{Duration, Instant};

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TcpTarget {
    addr: String,
    stream: Option<TcpStream>,
    reconnect_delay: Duration,
    max_reconnect_delay: Duration,
    next_attempt: Option<Instant>,
}

impl TcpTarget {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            reconnect_delay: INITIAL_RECONNECT_DELAY,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
            next_attempt: None,
        }
    }

    /// Cap on the exponential reconnect backoff.
    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(&self.addr)?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        self.reconnect_delay = INITIAL_RECONNECT_DELAY;
        self.next_attempt = None;
        Ok(())
    }

    fn schedule_retry(&mut self) {
        self.next_attempt = Some(Instant::now() + self.reconnect_delay);
        self.reconnect_delay = (self.reconnect_delay * 2).min(self.max_reconnect_delay);
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        if let Some(at) = self.next_attempt {
            if Instant::now() < at {
                return Err(EngineError::write(
                    self.addr.as_str(),
                    "connection down, waiting out reconnect backoff",
                ));
            }
        }
        self.connect().map_err(|e| {
            self.schedule_retry();
            EngineError::write(
                self.addr.as_str(),
                format!("connect failed: {}", e),
            )
        })
    }
}

impl Target for TcpTarget {
    // Lazy dial: init never blocks on the network.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8], _record: &Record) -> Result<usize> {
        self.ensure_connected()?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| EngineError::write(self.addr.as_str(), "not connected"))?;

        if let Err(first) = stream.write_all(buf) {
            // One immediate reconnect-and-resend; a dropped connection often
            // only surfaces on the next write.
            self.stream = None;
            match self.connect() {
                Ok(()) => {
                    if let Some(stream) = self.stream.as_mut() {
                        stream.write_all(buf)?;
                    }
                }
                Err(reconnect) => {
                    self.schedule_retry();
                    return Err(EngineError::write(
                        self.addr.as_str(),
                        format!("send failed: {} (reconnect: {})", first, reconnect),
                    ));
                }
            }
        }
        Ok(buf.len())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush()?;
        }
        Ok(())
    }
}
