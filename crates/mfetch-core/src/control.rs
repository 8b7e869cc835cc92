//! Session cancellation.
//!
//! A [`CancelToken`] is shared between the caller (e.g. a Ctrl-C handler)
//! and every worker. Workers check it before each claim; a fetch already in
//! flight runs to completion or to its attempt timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker of the session to stop before its next claim.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
