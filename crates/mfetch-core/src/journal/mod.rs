//! Append-only journal of chunk commit/undo events.
//!
//! The file is a flat sequence of fixed-width records (see [`Record`]); there
//! is no header, checksum or separator and end of file is the only
//! terminator. Every append is one `write_all` followed by `sync_data`, so a
//! record is durable before the queue state it describes changes.
//!
//! Replay folds the records into per-chunk state, last writer wins.

mod error;
mod record;

pub use error::JournalError;
pub use record::{Record, RECORD_LEN};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::queue::ChunkState;

/// What replay does with a partial record at the end of the file
/// (a crash between `write` and `sync_data`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailPolicy {
    /// Fail with [`JournalError::TruncatedTail`].
    #[default]
    Strict,
    /// Cut the partial record off the file and continue.
    Truncate,
}

/// Handle to an open journal file. Appends from many workers are serialized
/// by an internal mutex.
#[derive(Debug)]
pub struct Journal {
    file: Mutex<File>,
}

impl Journal {
    /// Wrap a file the caller opened. It must be readable for replay and
    /// writable for appends.
    pub fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    /// Open (or create) a journal at `path` for read + append.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let file = File::options()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        Ok(Self::new(file))
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one record and flush it to stable storage.
    pub fn append(&self, record: Record) -> Result<(), JournalError> {
        let buf = record.encode();
        let mut file = self.lock();
        file.seek(SeekFrom::End(0))?;
        file.write_all(&buf)?;
        file.sync_data()?;
        Ok(())
    }

    /// Record that `chunk` was committed.
    pub fn commit(&self, chunk: u64) -> Result<(), JournalError> {
        self.append(Record::commit(chunk))
    }

    /// Record that a claim on `chunk` was undone.
    pub fn undo(&self, chunk: u64) -> Result<(), JournalError> {
        self.append(Record::undo(chunk))
    }

    /// Read every record from the start of the file and fold them into the
    /// state of `chunk_count` chunks. Chunks never mentioned are pending.
    pub fn replay(
        &self,
        chunk_count: u64,
        tail: TailPolicy,
    ) -> Result<Vec<ChunkState>, JournalError> {
        let mut file = self.lock();
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut states = vec![ChunkState::Pending; chunk_count as usize];
        let whole = bytes.len() - bytes.len() % RECORD_LEN;
        for (n, raw) in bytes[..whole].chunks_exact(RECORD_LEN).enumerate() {
            let offset = (n * RECORD_LEN) as u64;
            let record =
                Record::decode(raw).map_err(|reason| JournalError::Corrupt { offset, reason })?;
            if record.chunk >= chunk_count {
                return Err(JournalError::Corrupt {
                    offset,
                    reason: format!("chunk {} outside of {} chunks", record.chunk, chunk_count),
                });
            }
            states[record.chunk as usize] = if record.committed {
                ChunkState::Committed
            } else {
                ChunkState::Pending
            };
        }

        if whole < bytes.len() {
            let partial = bytes.len() - whole;
            match tail {
                TailPolicy::Strict => {
                    return Err(JournalError::TruncatedTail {
                        offset: whole as u64,
                        len: partial,
                    });
                }
                TailPolicy::Truncate => {
                    tracing::warn!(
                        offset = whole,
                        len = partial,
                        "dropping partial record at end of journal"
                    );
                    file.set_len(whole as u64)?;
                    file.sync_all()?;
                }
            }
        }
        file.seek(SeekFrom::End(0))?;
        Ok(states)
    }
}
