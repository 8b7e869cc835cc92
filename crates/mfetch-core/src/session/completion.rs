//! Session termination rules, fed by worker outcomes.

/// What a worker reports to the collector after each step.
#[derive(Debug)]
pub(super) enum Outcome {
    /// One chunk fetched, written and committed.
    Committed,
    /// The worker found nothing left to claim and exited.
    Exhausted,
    /// The worker hit an error and exited.
    Failed { worker: String, error: String },
}

/// How the collector decided the session was over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every outstanding chunk was committed.
    AllCommitted,
    /// Every worker has exited and the last one left because nothing was
    /// left to claim.
    QueueExhausted,
    /// Every worker has exited and the last one left with an error.
    AllFailed,
}

#[derive(Debug)]
pub(super) struct CompletionTracker {
    remaining: u64,
    live: usize,
    workers: usize,
    last_error: Option<String>,
}

impl CompletionTracker {
    pub(super) fn new(outstanding: u64, workers: usize) -> Self {
        Self {
            remaining: outstanding,
            live: workers,
            workers,
            last_error: None,
        }
    }

    /// Fold one outcome; `Some` once the session is over.
    pub(super) fn observe(&mut self, outcome: Outcome) -> Option<Verdict> {
        match outcome {
            Outcome::Committed => {
                self.remaining = self.remaining.saturating_sub(1);
                (self.remaining == 0).then_some(Verdict::AllCommitted)
            }
            Outcome::Exhausted => self.leave(Verdict::QueueExhausted),
            Outcome::Failed { worker, error } => {
                tracing::debug!(%worker, %error, live = self.live.saturating_sub(1), "worker stopped");
                self.last_error = Some(format!("{worker}: {error}"));
                self.leave(Verdict::AllFailed)
            }
        }
    }

    /// One worker exited; the last one to go decides the verdict.
    fn leave(&mut self, verdict: Verdict) -> Option<Verdict> {
        self.live = self.live.saturating_sub(1);
        (self.live == 0).then_some(verdict)
    }

    /// Verdict when every sender is gone without one being reached. Only a
    /// panicking worker gets here.
    pub(super) fn finish(&mut self) -> Verdict {
        self.last_error
            .get_or_insert_with(|| "worker thread panicked".to_string());
        Verdict::AllFailed
    }

    pub(super) fn workers(&self) -> usize {
        self.workers
    }

    pub(super) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
