//! CLI for the mfetch multi-mirror downloader.

mod commands;
mod progress;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use mfetch_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_get, run_inspect};

/// Top-level CLI for mfetch.
#[derive(Debug, Parser)]
#[command(name = "mfetch", version)]
#[command(about = "mfetch: resumable chunked downloads from several mirrors at once", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one object from one or more mirrors.
    Get(GetArgs),

    /// Show which chunks a journal records as committed.
    Inspect {
        /// Path to the journal file.
        journal: PathBuf,
        /// Number of chunks in the download the journal belongs to.
        #[arg(long, value_name = "N")]
        chunks: u64,
    },

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Mirror URLs serving identical bytes.
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Output file.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Chunk size in bytes; accepts K, M and G suffixes (binary).
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<u64>,

    /// Concurrent connections per mirror.
    #[arg(short, long, value_name = "N")]
    pub multiplicity: Option<usize>,

    /// Per-chunk fetch timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra request header, e.g. "Authorization: Bearer xyz". Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Journal path (default: <OUTPUT>.journal).
    #[arg(long, value_name = "PATH", conflicts_with = "no_journal")]
    pub journal: Option<PathBuf>,

    /// Do not keep a journal; an interrupted download starts over.
    #[arg(long)]
    pub no_journal: bool,

    /// Take the first mirror's length instead of requiring all to agree.
    #[arg(long)]
    pub first_success: bool,

    /// Drop a partial record at the end of the journal instead of refusing it.
    #[arg(long)]
    pub truncate_torn_tail: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Get(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_get(&cfg, args).await?;
            }
            CliCommand::Inspect { journal, chunks } => run_inspect(&journal, chunks)?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

/// Parse `4194304`, `512K`, `4M`, `4MiB` or `1G`.
pub(crate) fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, unit) = s.split_at(digits_end);
    if number.is_empty() {
        bail!("invalid size {:?}", s);
    }
    let n: u64 = number.parse()?;
    let shift = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        other => bail!("unknown size unit {:?}", other),
    };
    let size = n
        .checked_mul(1 << shift)
        .ok_or_else(|| anyhow::anyhow!("size {:?} too large", s))?;
    if size == 0 {
        bail!("size must be non-zero");
    }
    Ok(size)
}

/// Parse `Name: value`.
pub(crate) fn parse_header(s: &str) -> Result<(String, String)> {
    match s.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("header must look like \"Name: value\""),
    }
}

#[cfg(test)]
mod tests;
