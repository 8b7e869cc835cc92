//! Session events for progress display.
//!
//! Callbacks run synchronously on the thread that produced the event (the
//! session thread for probe events, a worker thread for chunk and stop
//! events). A slow observer slows that worker; forward into a channel if the
//! consumer can block.

use std::time::Duration;

/// A mirror answered the size probe.
#[derive(Debug, Clone)]
pub struct MirrorProbe {
    pub host: String,
    pub latency: Duration,
    pub content_length: u64,
}

/// A worker committed a chunk.
#[derive(Debug, Clone)]
pub struct ChunkProgress {
    /// Worker name, `<host>#<replica>`.
    pub worker: String,
    pub chunk: u64,
    /// Bytes this worker has committed so far.
    pub worker_bytes: u64,
    /// Bytes committed by all workers this session.
    pub total_bytes: u64,
    /// Claim-to-commit time of this chunk.
    pub duration: Duration,
    /// Session throughput estimate after this chunk, bytes per second.
    pub speed: f64,
}

pub trait SessionObserver: Send + Sync {
    fn on_mirror_probed(&self, _probe: &MirrorProbe) {}

    /// All mirrors have been probed (emitted once, whatever the result).
    fn on_probe_complete(&self) {}

    fn on_chunk_progress(&self, _progress: &ChunkProgress) {}

    /// A worker gave up (fetch failure, commit failure or cancellation).
    fn on_worker_stopped(&self, _worker: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
