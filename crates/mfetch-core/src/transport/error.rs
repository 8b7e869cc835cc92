//! Error type for a single probe or chunk fetch.

use std::fmt;

/// Why one probe or ranged GET failed. Any of these stops the worker that
/// hit it; the chunk goes back to the queue for the remaining workers.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection refused, DNS, ...).
    Curl(curl::Error),
    /// The response status was not accepted (200/206 for GETs, 2xx for HEAD).
    Http(u32),
    /// The body length did not match the requested range.
    BodyLength { expected: u64, received: u64 },
    /// The byte sink refused the chunk.
    Sink(std::io::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Curl(e) if e.is_operation_timedout())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::BodyLength { expected, received } => {
                write!(f, "body length mismatch: expected {} bytes, got {}", expected, received)
            }
            FetchError::Sink(e) => write!(f, "sink: {}", e),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Sink(e) => Some(e),
            FetchError::Http(_) | FetchError::BodyLength { .. } => None,
        }
    }
}
