//! Multi-mirror download session.
//!
//! A run goes through four phases:
//!
//! 1. **Pre-flight**: validate options and mirrors, resolve every host.
//! 2. **Probe**: HEAD every mirror and settle on one content length.
//! 3. **Plan**: split the object into chunks and build the work queue,
//!    restoring committed chunks from the journal when one is given.
//! 4. **Transfer**: `multiplicity` worker threads per mirror pull chunks
//!    from the shared queue; a collector folds their outcomes into a
//!    [`Verdict`].
//!
//! A worker that fails a chunk releases it and exits; the other workers
//! pick the chunk up again. There is no per-chunk retry count: a chunk is
//! retried for as long as some worker is alive.

mod completion;
mod error;
mod options;
mod preflight;
mod probe;
mod worker;


pub use completion::Verdict;
pub use error::SessionError;
pub use options::{LengthPolicy, SessionOptions, DEFAULT_CHUNK_SIZE, DEFAULT_MULTIPLICITY};

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::chunk::ChunkLayout;
use crate::control::CancelToken;
use crate::journal::Journal;
use crate::observer::{NoopObserver, SessionObserver};
use crate::queue::WorkQueue;
use crate::request::MirrorRequest;
use crate::sink::ByteSink;
use crate::speed::SpeedEstimator;
use crate::transport::Transport;

use completion::CompletionTracker;
use worker::{Shared, Worker};

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub content_length: u64,
    pub chunk_count: u64,
    /// Chunks already committed in the journal when the run started.
    pub resumed_chunks: u64,
    /// Chunks committed by this run.
    pub committed_chunks: u64,
    /// Bytes fetched and written by this run.
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub verdict: Verdict,
}

pub struct DownloadSession {
    mirrors: Vec<MirrorRequest>,
    options: SessionOptions,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ByteSink>,
    observer: Arc<dyn SessionObserver>,
    written: Arc<AtomicU64>,
    speed: Arc<Mutex<SpeedEstimator>>,
}

impl DownloadSession {
    pub fn new(
        mirrors: Vec<MirrorRequest>,
        options: SessionOptions,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ByteSink>,
    ) -> Self {
        let speed = SpeedEstimator::with_age(options.chunk_size, options.ewma_age);
        Self {
            mirrors,
            options,
            transport,
            sink,
            observer: Arc::new(NoopObserver),
            written: Arc::new(AtomicU64::new(0)),
            speed: Arc::new(Mutex::new(speed)),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Bytes committed so far by the current (or last) run.
    pub fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Smoothed throughput in bytes per second; 0.0 before the first chunk.
    pub fn speed(&self) -> f64 {
        self.speed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .speed()
    }

    /// Download the object into the sink. With a journal, chunks it records
    /// as committed are skipped and every new commit is appended to it.
    pub fn run(&self, journal: Option<Journal>) -> Result<SessionReport, SessionError> {
        let started = Instant::now();
        self.written.store(0, Ordering::Relaxed);

        let hosts = preflight::check(&self.mirrors, &self.options)?;
        let content_length = probe::discover_length(
            self.transport.as_ref(),
            &self.mirrors,
            &hosts,
            self.options.length_policy,
            self.observer.as_ref(),
        )?;

        let layout = ChunkLayout::new(content_length, self.options.chunk_size);
        let queue = match journal {
            Some(journal) => WorkQueue::from_journal(journal, layout.count(), self.options.journal_tail)?,
            None => WorkQueue::new(layout.count()),
        };
        let outstanding = queue.outstanding();
        let resumed_chunks = queue.committed();
        tracing::info!(
            content_length,
            chunk_size = self.options.chunk_size,
            chunks = layout.count(),
            resumed = resumed_chunks,
            mirrors = self.mirrors.len(),
            multiplicity = self.options.multiplicity,
            "download planned"
        );
        self.sink.prepare(content_length).map_err(SessionError::Sink)?;

        let shared = Arc::new(Shared {
            queue,
            layout,
            transport: Arc::clone(&self.transport),
            sink: Arc::clone(&self.sink),
            observer: Arc::clone(&self.observer),
            written: Arc::clone(&self.written),
            speed: Arc::clone(&self.speed),
            cancel: self.options.cancel.clone(),
        });

        let verdict = if outstanding == 0 {
            Verdict::AllCommitted
        } else {
            let (verdict, tracker) = self.transfer(&shared, &hosts, outstanding)?;
            settle(verdict, &tracker, &shared.queue, self.options.cancel.as_ref())?
        };

        let report = SessionReport {
            content_length,
            chunk_count: layout.count(),
            resumed_chunks,
            committed_chunks: shared.queue.committed() - resumed_chunks,
            bytes_written: self.bytes_written(),
            elapsed: started.elapsed(),
            verdict,
        };
        tracing::info!(
            bytes = report.bytes_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            ?verdict,
            "download complete"
        );
        Ok(report)
    }

    /// Start the workers, collect outcomes until a verdict, then join them.
    fn transfer(
        &self,
        shared: &Arc<Shared>,
        hosts: &[String],
        outstanding: u64,
    ) -> Result<(Verdict, CompletionTracker), SessionError> {
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::new();
        let mut spawn_error = None;

        for (mirror, host) in self.mirrors.iter().zip(hosts) {
            for replica in 0..self.options.multiplicity {
                let worker = Worker::new(host, replica, mirror.clone());
                let name = worker.name().to_string();
                let shared = Arc::clone(shared);
                let tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || worker.run(&shared, &tx));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        tracing::warn!(worker = %name, error = %e, "could not start worker");
                        spawn_error = Some(e);
                    }
                }
            }
        }
        drop(tx);

        if handles.is_empty() {
            return Err(SessionError::Spawn(
                spawn_error.unwrap_or_else(|| io::Error::other("no workers started")),
            ));
        }
        tracing::debug!(workers = handles.len(), outstanding, "workers started");

        let mut tracker = CompletionTracker::new(outstanding, handles.len());
        let verdict = loop {
            match rx.recv() {
                Ok(outcome) => {
                    if let Some(verdict) = tracker.observe(outcome) {
                        break verdict;
                    }
                }
                Err(_) => break tracker.finish(),
            }
        };
        drop(rx);

        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
        Ok((verdict, tracker))
    }
}

/// Turn the collector's verdict into the run's result. Exhaustion is only a
/// success if the queue agrees that nothing is left: the last worker can find
/// nothing to claim while a chunk is stuck claimed after a failed commit.
fn settle(
    verdict: Verdict,
    tracker: &CompletionTracker,
    queue: &WorkQueue,
    cancel: Option<&CancelToken>,
) -> Result<Verdict, SessionError> {
    let outstanding = queue.outstanding();
    if verdict != Verdict::AllFailed && outstanding == 0 {
        return Ok(verdict);
    }
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(SessionError::Cancelled);
    }
    match verdict {
        Verdict::AllFailed => Err(SessionError::AllWorkersFailed {
            workers: tracker.workers(),
            committed: queue.committed(),
            total: queue.len(),
            last_error: tracker.last_error().unwrap_or("unknown").to_string(),
        }),
        _ => Err(SessionError::Incomplete { outstanding }),
    }
}
