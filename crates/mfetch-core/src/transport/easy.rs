//! libcurl transport: one `Easy` handle per probe or chunk attempt.

use std::str;
use std::time::Duration;

use super::parse::parse_headers;
use super::{FetchError, ProbeResult, Transport};
use crate::request::MirrorRequest;

/// Timeouts and identification for [`CurlTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// Wall-clock limit for one probe or one chunk fetch. Expiry fails that
    /// attempt only.
    pub attempt_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            attempt_timeout: Duration::from_secs(30),
            user_agent: concat!("mfetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: TransportOptions,
}

impl CurlTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    fn easy_for(&self, request: &MirrorRequest) -> Result<curl::easy::Easy, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.attempt_timeout)?;
        easy.useragent(&self.options.user_agent)?;

        if !request.headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (k, v) in &request.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl Transport for CurlTransport {
    fn probe(&self, request: &MirrorRequest) -> Result<ProbeResult, FetchError> {
        let mut headers: Vec<String> = Vec::new();
        let mut easy = self.easy_for(request).map_err(FetchError::Curl)?;
        easy.nobody(true).map_err(FetchError::Curl)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        headers.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(FetchError::Curl)?;
            transfer.perform().map_err(FetchError::Curl)?;
        }

        let code = easy.response_code().map_err(FetchError::Curl)?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(parse_headers(&headers))
    }

    fn fetch_range(
        &self,
        request: &MirrorRequest,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, FetchError> {
        let expected = end - start + 1;
        let mut body: Vec<u8> = Vec::with_capacity(expected as usize);
        let mut received = 0u64;

        let mut easy = self.easy_for(request).map_err(FetchError::Curl)?;
        // Range: curl expects "start-end" (inclusive), not "bytes=start-end"
        easy.range(&format!("{}-{}", start, end))
            .map_err(FetchError::Curl)?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    received += data.len() as u64;
                    if received > expected {
                        // Server ignored the range; stop instead of buffering the whole object.
                        return Ok(0);
                    }
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(FetchError::Curl)?;
            transfer.perform()
        };

        let overflowed = received > expected;
        if let Err(e) = performed {
            if !(e.is_write_error() && overflowed) {
                return Err(FetchError::Curl(e));
            }
        }

        let code = easy.response_code().map_err(FetchError::Curl)?;
        if code != 200 && code != 206 {
            return Err(FetchError::Http(code));
        }
        if received != expected {
            return Err(FetchError::BodyLength { expected, received });
        }
        Ok(body)
    }
}
