//! Chunk work queue: claim / release / acknowledge.
//!
//! Every chunk is `Pending`, `Claimed` (in flight in exactly one worker) or
//! `Committed`. Claims scan forward from a cursor; a release puts the chunk
//! back and rewinds the cursor to 0 so the next claim finds it again.
//!
//! With a journal attached, release and acknowledge append an undo/commit
//! record before the in-memory transition. Journal I/O never happens under
//! the queue mutex: only the claimant moves a chunk out of `Claimed`, and it
//! stays `Claimed` until its record is durable, so per-chunk journal order
//! matches per-chunk transition order.

mod error;

pub use error::QueueError;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::journal::{Journal, JournalError, TailPolicy};

/// State of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Claimed,
    Committed,
}

#[derive(Debug)]
struct Inner {
    states: Vec<ChunkState>,
    cursor: usize,
}

/// Shared queue of chunk indices. Safe to use from many worker threads.
#[derive(Debug)]
pub struct WorkQueue {
    inner: Mutex<Inner>,
    journal: Option<Journal>,
}

impl WorkQueue {
    /// Fresh queue with every chunk pending and no journal.
    pub fn new(chunk_count: u64) -> Self {
        Self::from_states(vec![ChunkState::Pending; chunk_count as usize], None)
    }

    /// Fresh queue that records commits and undos in `journal`.
    /// The journal is assumed to be empty.
    pub fn with_journal(chunk_count: u64, journal: Journal) -> Self {
        Self::from_states(vec![ChunkState::Pending; chunk_count as usize], Some(journal))
    }

    /// Restore a queue by replaying `journal`. Committed chunks stay committed;
    /// everything else is pending. The cursor starts at the first pending chunk.
    pub fn from_journal(
        journal: Journal,
        chunk_count: u64,
        tail: TailPolicy,
    ) -> Result<Self, JournalError> {
        let states = journal.replay(chunk_count, tail)?;
        Ok(Self::from_states(states, Some(journal)))
    }

    fn from_states(states: Vec<ChunkState>, journal: Option<Journal>) -> Self {
        let cursor = states
            .iter()
            .position(|s| *s == ChunkState::Pending)
            .unwrap_or(states.len());
        Self {
            inner: Mutex::new(Inner { states, cursor }),
            journal,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total number of chunks.
    pub fn len(&self) -> u64 {
        self.lock().states.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim the next pending chunk, or `None` once nothing is pending.
    pub fn claim(&self) -> Option<u64> {
        let mut inner = self.lock();
        let start = inner.cursor;
        let found = inner.states[start..]
            .iter()
            .position(|s| *s == ChunkState::Pending)?
            + start;
        inner.states[found] = ChunkState::Claimed;
        inner.cursor = found + 1;
        Some(found as u64)
    }

    /// Put a claimed chunk back so any worker can claim it again.
    ///
    /// If the undo record cannot be written the chunk stays claimed.
    pub fn release(&self, index: u64) -> Result<(), QueueError> {
        let slot = self.ensure_claimed(index)?;
        if let Some(journal) = &self.journal {
            journal.undo(index)?;
        }
        let mut inner = self.lock();
        inner.states[slot] = ChunkState::Pending;
        inner.cursor = 0;
        Ok(())
    }

    /// Commit a claimed chunk.
    ///
    /// If the commit record cannot be written the chunk stays claimed and is
    /// fetched again by a future session replaying the same journal.
    pub fn acknowledge(&self, index: u64) -> Result<(), QueueError> {
        let slot = self.ensure_claimed(index)?;
        if let Some(journal) = &self.journal {
            journal.commit(index)?;
        }
        self.lock().states[slot] = ChunkState::Committed;
        Ok(())
    }

    fn ensure_claimed(&self, index: u64) -> Result<usize, QueueError> {
        let inner = self.lock();
        let len = inner.states.len() as u64;
        if index >= len {
            return Err(QueueError::OutOfBounds { index, len });
        }
        match inner.states[index as usize] {
            ChunkState::Claimed => Ok(index as usize),
            state => Err(QueueError::NotClaimed { index, state }),
        }
    }

    /// Copy of the current per-chunk state.
    pub fn snapshot(&self) -> Vec<ChunkState> {
        self.lock().states.clone()
    }

    /// Number of chunks not yet committed (pending or in flight).
    pub fn outstanding(&self) -> u64 {
        self.count(|s| s != ChunkState::Committed)
    }

    pub fn pending(&self) -> u64 {
        self.count(|s| s == ChunkState::Pending)
    }

    pub fn committed(&self) -> u64 {
        self.count(|s| s == ChunkState::Committed)
    }

    fn count(&self, pred: impl Fn(ChunkState) -> bool) -> u64 {
        self.lock().states.iter().filter(|s| pred(**s)).count() as u64
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.lock().cursor
    }
}
