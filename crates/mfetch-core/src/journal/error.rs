//! Journal errors.

/// Failure to append to or replay a journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal I/O: {0}")]
    Io(#[from] std::io::Error),
    /// A complete record could not be decoded or names a chunk that does not exist.
    #[error("corrupt journal record at byte {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
    /// The file ends in the middle of a record.
    #[error("journal ends with a partial record ({len} bytes at byte {offset})")]
    TruncatedTail { offset: u64, len: usize },
}
