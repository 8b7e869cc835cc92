//! Minimal HTTP/1.1 mirror for integration tests.
//!
//! Serves one static body: HEAD answers with Content-Length, GET with a
//! `Range: bytes=a-b` header answers 206. Every request is logged so tests
//! can count fetches per range start.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct MirrorBehavior {
    /// Report this length on HEAD instead of the body's.
    pub content_length: Option<u64>,
    /// Omit `Accept-Ranges: bytes`.
    pub hide_ranges: bool,
    /// Answer 500 to every GET.
    pub fail_all: bool,
    /// Answer 500 to the first GET of each listed range start.
    pub fail_once_at: Vec<u64>,
}

/// One request seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub method: String,
    pub range_start: Option<u64>,
}

pub struct RangeServer {
    pub url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl RangeServer {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn gets_of(&self, start: u64) -> usize {
        self.hits()
            .iter()
            .filter(|h| h.method == "GET" && h.range_start == Some(start))
            .count()
    }

    pub fn get_count(&self) -> usize {
        self.hits().iter().filter(|h| h.method == "GET").count()
    }
}

/// Serve `body` with default behavior until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with(body, MirrorBehavior::default())
}

pub fn start_with(body: Vec<u8>, behavior: MirrorBehavior) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(Mutex::new(Vec::new()));
    let state = Arc::new(State {
        body,
        behavior,
        failed: Mutex::new(HashSet::new()),
        hits: Arc::clone(&hits),
    });
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&state);
            thread::spawn(move || state.handle(stream));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/object.bin", port),
        hits,
    }
}

struct State {
    body: Vec<u8>,
    behavior: MirrorBehavior,
    failed: Mutex<HashSet<u64>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl State {
    fn handle(&self, mut stream: TcpStream) {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
        let mut buf = [0u8; 8192];
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let Ok(request) = std::str::from_utf8(&buf[..n]) else {
            return;
        };
        let (method, range) = parse_request(request);
        self.hits.lock().unwrap().push(Hit {
            method: method.to_string(),
            range_start: range.map(|(s, _)| s),
        });

        let total = self.body.len() as u64;
        let accept_ranges = if self.behavior.hide_ranges {
            ""
        } else {
            "Accept-Ranges: bytes\r\n"
        };

        if method.eq_ignore_ascii_case("HEAD") {
            let length = self.behavior.content_length.unwrap_or(total);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}\r\n",
                length, accept_ranges
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        if !method.eq_ignore_ascii_case("GET") {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
            return;
        }

        if self.should_fail(range.map(|(s, _)| s)) {
            let _ = stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");
            return;
        }

        let (status, content_range, slice) = match range {
            Some((start, end_incl)) if start < total => {
                let end_excl = end_incl.saturating_add(1).min(total);
                (
                    "206 Partial Content",
                    format!("bytes {}-{}/{}", start, end_excl - 1, total),
                    &self.body[start as usize..end_excl as usize],
                )
            }
            Some(_) => ("416 Range Not Satisfiable", format!("bytes */{}", total), &self.body[0..0]),
            None => (
                "200 OK",
                format!("bytes 0-{}/{}", total.saturating_sub(1), total),
                &self.body[..],
            ),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n{}\r\n",
            status,
            slice.len(),
            content_range,
            accept_ranges
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
    }

    fn should_fail(&self, start: Option<u64>) -> bool {
        if self.behavior.fail_all {
            return true;
        }
        match start {
            Some(s) if self.behavior.fail_once_at.contains(&s) => self.failed.lock().unwrap().insert(s),
            _ => false,
        }
    }
}

/// Returns (method, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .unwrap_or("");
    let range = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .and_then(|(_, value)| {
            let spec = value.trim().strip_prefix("bytes=")?;
            let (a, b) = spec.split_once('-')?;
            let start = a.trim().parse().ok()?;
            let end = match b.trim() {
                "" => u64::MAX,
                b => b.parse().ok()?,
            };
            Some((start, end))
        });
    (method, range)
}
