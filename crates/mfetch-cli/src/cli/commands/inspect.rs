//! `mfetch inspect` – replay a journal and summarize it.

use anyhow::{bail, Context, Result};
use mfetch_core::journal::{Journal, TailPolicy};
use mfetch_core::queue::{ChunkState, WorkQueue};
use std::path::Path;

pub fn run_inspect(path: &Path, chunks: u64) -> Result<()> {
    if !path.exists() {
        bail!("journal {} does not exist", path.display());
    }
    let journal = Journal::open(path)?;
    let queue = WorkQueue::from_journal(journal, chunks, TailPolicy::Strict)
        .with_context(|| format!("failed to replay {}", path.display()))?;

    println!(
        "{}: {}/{} chunks committed, {} pending",
        path.display(),
        queue.committed(),
        queue.len(),
        queue.pending()
    );
    let committed = committed_ranges(&queue.snapshot());
    if !committed.is_empty() {
        println!("committed: {}", committed);
    }
    Ok(())
}

/// Committed chunk indices as compact ranges, e.g. `0-3, 5, 8-9`.
fn committed_ranges(states: &[ChunkState]) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut start: Option<usize> = None;
    for i in 0..=states.len() {
        let committed = states.get(i) == Some(&ChunkState::Committed);
        match (start, committed) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                out.push(if s + 1 == i {
                    s.to_string()
                } else {
                    format!("{}-{}", s, i - 1)
                });
                start = None;
            }
            _ => {}
        }
    }
    out.join(", ")
}
