//! Output file lifecycle.
//!
//! Downloads land in a `.part` file that is preallocated once the content
//! length is known, written at chunk offsets from many workers (pwrite), and
//! atomically renamed to the final name when the session succeeds.

mod writer;

pub use writer::StorageWriter;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Suffix of the journal kept next to the output while a download is unfinished.
pub const JOURNAL_SUFFIX: &str = ".journal";

fn with_suffix(final_path: &Path, suffix: &str) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(suffix);
    PathBuf::from(o)
}

/// Path for the temp file: `file.iso` → `file.iso.part`.
pub fn temp_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, TEMP_SUFFIX)
}

/// Default journal path: `file.iso` → `file.iso.journal`.
pub fn journal_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, JOURNAL_SUFFIX)
}
