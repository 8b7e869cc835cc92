//! Per-session settings.

use serde::{Deserialize, Serialize};

use crate::control::CancelToken;
use crate::journal::TailPolicy;
use crate::speed;

pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;
pub const DEFAULT_MULTIPLICITY: usize = 3;

/// How the probe phase settles on one content length when several mirrors
/// are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Every mirror must answer the probe and report the same length.
    #[default]
    Unanimous,
    /// The first mirror (in configuration order) that reports a length wins;
    /// mirrors that fail the probe are skipped.
    FirstSuccess,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bytes per chunk; must be non-zero.
    pub chunk_size: u64,
    /// Concurrent workers per mirror; must be non-zero.
    pub multiplicity: usize,
    pub length_policy: LengthPolicy,
    /// Replay behavior for a partial record at the end of the journal.
    pub journal_tail: TailPolicy,
    /// EWMA age (samples) of the speed estimator.
    pub ewma_age: f64,
    pub cancel: Option<CancelToken>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            multiplicity: DEFAULT_MULTIPLICITY,
            length_policy: LengthPolicy::default(),
            journal_tail: TailPolicy::default(),
            ewma_age: speed::DEFAULT_AGE,
            cancel: None,
        }
    }
}
