//! HTTP transport: HEAD probe and ranged GET.
//!
//! The session only talks to the [`Transport`] trait; [`CurlTransport`] is
//! the libcurl implementation used by the CLI. Tests substitute scripted
//! transports.

mod easy;
mod error;
mod parse;

pub use easy::{CurlTransport, TransportOptions};
pub use error::FetchError;

use crate::request::MirrorRequest;

/// Metadata returned by a HEAD probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

/// Blocking HTTP operations used by the session. Implementations are shared
/// by all worker threads.
pub trait Transport: Send + Sync {
    /// HEAD the mirror and report its content length.
    fn probe(&self, request: &MirrorRequest) -> Result<ProbeResult, FetchError>;

    /// GET bytes `start..=end` with a `Range` header. Only 200 and 206 are
    /// successful responses; the body must be exactly the requested length.
    fn fetch_range(
        &self,
        request: &MirrorRequest,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, FetchError>;
}
