//! One worker: a single mirror connection that claims, fetches, writes and
//! commits chunks until the queue runs dry or something goes wrong.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::completion::Outcome;
use crate::chunk::ChunkLayout;
use crate::control::CancelToken;
use crate::observer::{ChunkProgress, SessionObserver};
use crate::queue::WorkQueue;
use crate::request::MirrorRequest;
use crate::sink::ByteSink;
use crate::speed::SpeedEstimator;
use crate::transport::{FetchError, Transport};

/// State shared by every worker of one session run.
pub(super) struct Shared {
    pub(super) queue: WorkQueue,
    pub(super) layout: ChunkLayout,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) sink: Arc<dyn ByteSink>,
    pub(super) observer: Arc<dyn SessionObserver>,
    pub(super) written: Arc<AtomicU64>,
    pub(super) speed: Arc<Mutex<SpeedEstimator>>,
    pub(super) cancel: Option<CancelToken>,
}

impl Shared {
    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

pub(super) struct Worker {
    name: String,
    request: MirrorRequest,
    committed_bytes: u64,
}

impl Worker {
    pub(super) fn new(host: &str, replica: usize, request: MirrorRequest) -> Self {
        Self {
            name: format!("{host}#{replica}"),
            request,
            committed_bytes: 0,
        }
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    /// Work until the queue is drained or a step fails. Every exit sends
    /// exactly one `Exhausted` or `Failed`.
    pub(super) fn run(mut self, shared: &Shared, outcomes: &Sender<Outcome>) {
        tracing::debug!(worker = %self.name, "worker started");
        loop {
            if shared.cancelled() {
                self.stop(shared, outcomes, "cancelled".to_string());
                return;
            }
            let Some(index) = shared.queue.claim() else {
                tracing::debug!(worker = %self.name, bytes = self.committed_bytes, "nothing left to claim");
                let _ = outcomes.send(Outcome::Exhausted);
                return;
            };

            let started = Instant::now();
            let len = match self.fetch(shared, index) {
                Ok(len) => len,
                Err(e) => {
                    tracing::warn!(worker = %self.name, chunk = index, error = %e, "chunk failed, worker stopping");
                    if let Err(release) = shared.queue.release(index) {
                        tracing::error!(worker = %self.name, chunk = index, error = %release, "chunk release failed");
                    }
                    self.stop(shared, outcomes, e.to_string());
                    return;
                }
            };
            if let Err(e) = shared.queue.acknowledge(index) {
                tracing::error!(worker = %self.name, chunk = index, error = %e, "chunk commit failed, worker stopping");
                self.stop(shared, outcomes, e.to_string());
                return;
            }
            let duration = started.elapsed();

            self.committed_bytes += len;
            let total_bytes = shared.written.fetch_add(len, Ordering::Relaxed) + len;
            let speed = {
                let mut estimator = shared.speed.lock().unwrap_or_else(PoisonError::into_inner);
                estimator.add(duration);
                estimator.speed()
            };
            tracing::trace!(worker = %self.name, chunk = index, bytes = len, ?duration, "chunk committed");
            shared.observer.on_chunk_progress(&ChunkProgress {
                worker: self.name.clone(),
                chunk: index,
                worker_bytes: self.committed_bytes,
                total_bytes,
                duration,
                speed,
            });
            let _ = outcomes.send(Outcome::Committed);
        }
    }

    /// Fetch chunk `index` and write it to the sink. Returns its length.
    fn fetch(&self, shared: &Shared, index: u64) -> Result<u64, FetchError> {
        let range = shared.layout.range(index);
        let body = shared
            .transport
            .fetch_range(&self.request, range.start, range.end)?;
        let received = body.len() as u64;
        if received != range.len() {
            return Err(FetchError::BodyLength {
                expected: range.len(),
                received,
            });
        }
        shared
            .sink
            .write_at(range.start, &body)
            .map_err(FetchError::Sink)?;
        Ok(received)
    }

    fn stop(&self, shared: &Shared, outcomes: &Sender<Outcome>, error: String) {
        shared.observer.on_worker_stopped(&self.name);
        let _ = outcomes.send(Outcome::Failed {
            worker: self.name.clone(),
            error,
        });
    }
}
