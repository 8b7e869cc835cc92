//! `mfetch get` – download one object from a set of mirrors.

use anyhow::{Context, Result};
use mfetch_core::config::MfetchConfig;
use mfetch_core::control::CancelToken;
use mfetch_core::journal::{Journal, TailPolicy};
use mfetch_core::request::MirrorRequest;
use mfetch_core::session::LengthPolicy;
use mfetch_core::storage::{self, StorageWriter};
use mfetch_core::transport::{CurlTransport, TransportOptions};
use mfetch_core::{DownloadSession, SessionError, SessionOptions};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cli::progress::{self, ChannelObserver};
use crate::cli::GetArgs;

pub async fn run_get(cfg: &MfetchConfig, args: GetArgs) -> Result<()> {
    let cancel = CancelToken::new();
    let options = session_options(cfg, &args, cancel.clone());
    let transport = transport_options(cfg, &args);
    let mirrors = mirror_requests(&args);
    let journal_path = (!args.no_journal).then(|| {
        args.journal
            .clone()
            .unwrap_or_else(|| storage::journal_path(&args.output))
    });

    let (writer, journal) = open_outputs(&args.output, journal_path.as_deref())?;

    let (tx, rx) = mpsc::channel(64);
    let printer = progress::spawn_printer(rx);
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n  interrupted, stopping after in-flight chunks");
                cancel.cancel();
            }
        }
    });

    eprintln!("mfetch: {} mirror(s) -> {}", mirrors.len(), args.output.display());
    let session = DownloadSession::new(
        mirrors,
        options,
        Arc::new(CurlTransport::new(transport)),
        Arc::new(writer.clone()),
    )
    .with_observer(Arc::new(ChannelObserver::new(tx)));
    let result = tokio::task::spawn_blocking(move || session.run(journal))
        .await
        .context("download task failed")?;
    ctrl_c.abort();
    let _ = printer.await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(path) = &journal_path {
                if !matches!(e, SessionError::NoMirrors | SessionError::InvalidOption(_)) {
                    eprintln!(
                        "mfetch: progress kept in {}; rerun the same command to resume",
                        path.display()
                    );
                }
            }
            return Err(e.into());
        }
    };

    writer.sync()?;
    writer.finalize(&args.output)?;
    if let Some(path) = &journal_path {
        remove_if_exists(path)
            .with_context(|| format!("failed to remove journal {}", path.display()))?;
    }

    let secs = report.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        report.bytes_written as f64 / secs / 1_048_576.0
    } else {
        0.0
    };
    println!(
        "{}: {} bytes, {} chunks ({} resumed) in {:.1}s, {:.2} MiB/s",
        args.output.display(),
        report.content_length,
        report.chunk_count,
        report.resumed_chunks,
        secs,
        rate
    );
    tracing::info!(output = %args.output.display(), ?report, "get finished");
    Ok(())
}

fn session_options(cfg: &MfetchConfig, args: &GetArgs, cancel: CancelToken) -> SessionOptions {
    let mut options = cfg.session_options();
    if let Some(size) = args.chunk_size {
        options.chunk_size = size;
    }
    if let Some(m) = args.multiplicity {
        options.multiplicity = m;
    }
    if args.first_success {
        options.length_policy = LengthPolicy::FirstSuccess;
    }
    if args.truncate_torn_tail {
        options.journal_tail = TailPolicy::Truncate;
    }
    options.cancel = Some(cancel);
    options
}

fn transport_options(cfg: &MfetchConfig, args: &GetArgs) -> TransportOptions {
    let mut options = cfg.transport_options();
    if let Some(secs) = args.timeout {
        options.attempt_timeout = Duration::from_secs(secs);
    }
    options
}

fn mirror_requests(args: &GetArgs) -> Vec<MirrorRequest> {
    args.urls
        .iter()
        .map(|url| {
            args.headers
                .iter()
                .fold(MirrorRequest::get(url), |req, (name, value)| {
                    req.with_header(name, value)
                })
        })
        .collect()
}

/// Open the `.part` file and the journal. An existing `.part` is reused only
/// together with its journal; otherwise both start empty.
fn open_outputs(output: &Path, journal_path: Option<&Path>) -> Result<(StorageWriter, Option<Journal>)> {
    let temp = storage::temp_path(output);
    let resumable = journal_path.is_some_and(Path::exists) && temp.exists();

    let writer = if resumable {
        tracing::info!(part = %temp.display(), "resuming partial download");
        eprintln!("mfetch: resuming {}", temp.display());
        StorageWriter::open_existing(&temp)?
    } else {
        StorageWriter::create(&temp)?
    };

    let journal = match journal_path {
        Some(path) => {
            if !resumable {
                remove_if_exists(path)
                    .with_context(|| format!("failed to remove stale journal {}", path.display()))?;
            }
            Some(Journal::open(path).with_context(|| format!("failed to open journal {}", path.display()))?)
        }
        None => None,
    };
    Ok((writer, journal))
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, CliCommand};

    fn get_args(args: &[&str]) -> GetArgs {
        match Cli::try_parse_from(args).unwrap().command {
            CliCommand::Get(a) => a,
            other => panic!("expected Get, got {:?}", other),
        }
    }

    #[test]
    fn flags_override_config() {
        let cfg = MfetchConfig::default();
        let args = get_args(&[
            "mfetch", "get", "http://a/x", "-o", "x", "--chunk-size", "1M", "-m", "5",
            "--timeout", "9", "--first-success", "--truncate-torn-tail",
        ]);
        let o = session_options(&cfg, &args, CancelToken::new());
        assert_eq!(o.chunk_size, 1 << 20);
        assert_eq!(o.multiplicity, 5);
        assert_eq!(o.length_policy, LengthPolicy::FirstSuccess);
        assert_eq!(o.journal_tail, TailPolicy::Truncate);
        assert!(o.cancel.is_some());
        assert_eq!(transport_options(&cfg, &args).attempt_timeout, Duration::from_secs(9));
    }

    #[test]
    fn config_used_without_flags() {
        let cfg = MfetchConfig {
            multiplicity: 7,
            ..MfetchConfig::default()
        };
        let args = get_args(&["mfetch", "get", "http://a/x", "-o", "x"]);
        let o = session_options(&cfg, &args, CancelToken::new());
        assert_eq!(o.multiplicity, 7);
        assert_eq!(o.length_policy, LengthPolicy::Unanimous);
    }

    #[test]
    fn headers_apply_to_every_mirror() {
        let args = get_args(&[
            "mfetch", "get", "http://a/x", "http://b/x", "-o", "x", "-H", "X-Token: abc",
        ]);
        let mirrors = mirror_requests(&args);
        assert_eq!(mirrors.len(), 2);
        assert!(mirrors.iter().all(|m| m.headers.get("X-Token").map(String::as_str) == Some("abc")));
    }

    #[test]
    fn stale_journal_without_part_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bin");
        let journal_path = storage::journal_path(&output);
        Journal::open(&journal_path).unwrap().commit(0).unwrap();

        let (_writer, journal) = open_outputs(&output, Some(&journal_path)).unwrap();
        assert!(journal.is_some());
        assert_eq!(fs::metadata(&journal_path).unwrap().len(), 0);
        assert!(storage::temp_path(&output).exists());
    }

    #[test]
    fn part_file_and_journal_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bin");
        let journal_path = storage::journal_path(&output);
        fs::write(storage::temp_path(&output), b"partial").unwrap();
        Journal::open(&journal_path).unwrap().commit(0).unwrap();

        let (_writer, _journal) = open_outputs(&output, Some(&journal_path)).unwrap();
        assert_eq!(fs::read(storage::temp_path(&output)).unwrap(), b"partial");
        assert_eq!(fs::metadata(&journal_path).unwrap().len(), 9);
    }
}
