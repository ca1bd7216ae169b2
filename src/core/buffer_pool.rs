//! Concurrency-safe free list of formatting buffers
//!
//! Target workers borrow a buffer per record and return it after the write.
//! Buffers that grew beyond the retention cap are not returned, bounding
//! worst-case memory held by one oversized record.

use parking_lot::Mutex;

/// Default retention cap for returned buffers (1 MiB).
pub const DEFAULT_MAX_POOLED_BUFFER: usize = 1024 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 512;
const MAX_POOLED_BUFFERS: usize = 64;

pub(crate) struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
}

impl BufferPool {
    pub(crate) fn new(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    pub(crate) fn get(&self) -> Vec<u8> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_BUFFER_CAPACITY))
    }

    pub(crate) fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_retained {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < MAX_POOLED_BUFFERS {
            free.push(buf);
        }
    }
}
