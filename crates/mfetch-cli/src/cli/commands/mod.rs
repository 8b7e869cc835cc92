//! CLI command handlers. Each command is in its own file.

mod completions;
mod get;
mod inspect;

pub use completions::run_completions;
pub use get::run_get;
pub use inspect::run_inspect;
