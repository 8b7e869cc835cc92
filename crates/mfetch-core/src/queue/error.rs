use super::ChunkState;
use crate::journal::JournalError;

/// Error from a queue transition.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("chunk {index} out of bounds (queue has {len} chunks)")]
    OutOfBounds { index: u64, len: u64 },
    /// Release and acknowledge are only valid for a chunk the caller claimed.
    #[error("chunk {index} is {state:?}, not claimed")]
    NotClaimed { index: u64, state: ChunkState },
    #[error(transparent)]
    Journal(#[from] JournalError),
}
