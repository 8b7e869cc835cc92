//! Session-level errors.

use std::io;

use crate::journal::JournalError;
use crate::transport::FetchError;

/// Why a session did not complete. Validation and reachability errors are
/// raised before any HTTP request is made.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no mirrors configured")]
    NoMirrors,
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("only GET is supported, {url} uses {method}")]
    UnsupportedMethod { url: String, method: String },
    #[error("invalid mirror URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("size probe of {url} failed: {source}")]
    Probe {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("{url} did not report a content length")]
    MissingLength { url: String },
    #[error(
        "mirrors disagree on content length: {first_host} reports {first}, {host} reports {length}"
    )]
    LengthMismatch {
        first_host: String,
        first: u64,
        host: String,
        length: u64,
    },
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("cannot prepare output: {0}")]
    Sink(#[source] io::Error),
    #[error("cannot start workers: {0}")]
    Spawn(#[source] io::Error),
    #[error(
        "all {workers} workers failed with {committed}/{total} chunks committed (last error: {last_error})"
    )]
    AllWorkersFailed {
        workers: usize,
        committed: u64,
        total: u64,
        last_error: String,
    },
    /// Workers drained the queue but some chunks never got committed.
    #[error("queue drained with {outstanding} chunks still uncommitted")]
    Incomplete { outstanding: u64 },
    #[error("download cancelled")]
    Cancelled,
}
