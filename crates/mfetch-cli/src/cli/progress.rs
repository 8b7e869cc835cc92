//! Bridge from session callbacks (worker threads) to an async progress
//! printer.

use std::time::{Duration, Instant};

use mfetch_core::observer::{ChunkProgress, MirrorProbe, SessionObserver};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const MIB: f64 = 1_048_576.0;

#[derive(Debug)]
pub enum Event {
    Probed(MirrorProbe),
    ProbeDone,
    Chunk(ChunkProgress),
    WorkerStopped(String),
}

/// Forwards events without blocking workers; chunk events are dropped while
/// the printer lags behind.
pub struct ChannelObserver {
    tx: mpsc::Sender<Event>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_mirror_probed(&self, probe: &MirrorProbe) {
        let _ = self.tx.try_send(Event::Probed(probe.clone()));
    }

    fn on_probe_complete(&self) {
        let _ = self.tx.try_send(Event::ProbeDone);
    }

    fn on_chunk_progress(&self, progress: &ChunkProgress) {
        let _ = self.tx.try_send(Event::Chunk(progress.clone()));
    }

    fn on_worker_stopped(&self, worker: &str) {
        let _ = self.tx.try_send(Event::WorkerStopped(worker.to_string()));
    }
}

/// Print events to stderr until every sender is dropped.
pub fn spawn_printer(mut rx: mpsc::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut total: Option<u64> = None;
        let mut last_print: Option<Instant> = None;
        let mut printed_progress = false;
        while let Some(event) = rx.recv().await {
            match event {
                Event::Probed(p) => {
                    total.get_or_insert(p.content_length);
                    eprintln!(
                        "  {}: {} bytes ({} ms)",
                        p.host,
                        p.content_length,
                        p.latency.as_millis()
                    );
                }
                Event::ProbeDone => {}
                Event::WorkerStopped(worker) => {
                    if printed_progress {
                        eprintln!();
                        printed_progress = false;
                    }
                    eprintln!("  worker {} stopped", worker);
                }
                Event::Chunk(c) => {
                    let now = Instant::now();
                    if last_print.is_some_and(|t| now.duration_since(t) < PROGRESS_INTERVAL) {
                        continue;
                    }
                    eprint!("\r  {}  ", progress_line(&c, total));
                    printed_progress = true;
                    last_print = Some(now);
                }
            }
        }
        if printed_progress {
            eprintln!();
        }
    })
}

fn progress_line(c: &ChunkProgress, total: Option<u64>) -> String {
    let done = c.total_bytes as f64 / MIB;
    let rate = c.speed / MIB;
    match total {
        Some(t) if t > 0 => format!(
            "{:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s",
            done,
            t as f64 / MIB,
            c.total_bytes as f64 * 100.0 / t as f64,
            rate
        ),
        _ => format!("{:.1} MiB  {:.2} MiB/s", done, rate),
    }
}
