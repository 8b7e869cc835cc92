//! Destination for downloaded bytes.
//!
//! Workers write whole chunks at their offsets from many threads at once; a
//! sink must accept concurrent writes to disjoint ranges.

use std::io;
use std::sync::{Mutex, PoisonError};

pub trait ByteSink: Send + Sync {
    /// Called once per session with the discovered content length, before
    /// any worker starts. Default: nothing.
    fn prepare(&self, _content_length: u64) -> io::Result<()> {
        Ok(())
    }

    /// Place all of `data` starting at `offset`.
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()>;
}

/// Sink that assembles the object in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Mutex<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ByteSink for MemorySink {
    fn prepare(&self, content_length: u64) -> io::Result<()> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        if (buf.len() as u64) < content_length {
            buf.resize(content_length as usize, 0);
        }
        Ok(())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        let start = offset as usize;
        let end = start + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        Ok(())
    }
}
