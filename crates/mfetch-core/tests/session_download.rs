//! End-to-end downloads over real HTTP against local range servers, using
//! the curl transport, a `.part` file and an on-disk journal.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::range_server::{self, MirrorBehavior};
use mfetch_core::journal::Journal;
use mfetch_core::request::MirrorRequest;
use mfetch_core::session::{LengthPolicy, Verdict};
use mfetch_core::sink::ByteSink;
use mfetch_core::storage::{self, StorageWriter};
use mfetch_core::transport::{CurlTransport, Transport, TransportOptions};
use mfetch_core::{DownloadSession, SessionError, SessionOptions};
use tempfile::tempdir;

fn body(len: usize) -> Vec<u8> {
    (0u8..=250).cycle().take(len).collect()
}

fn transport() -> Arc<dyn Transport> {
    Arc::new(CurlTransport::new(TransportOptions {
        connect_timeout: Duration::from_secs(5),
        attempt_timeout: Duration::from_secs(10),
        ..TransportOptions::default()
    }))
}

fn options(chunk_size: u64, multiplicity: usize) -> SessionOptions {
    SessionOptions {
        chunk_size,
        multiplicity,
        ..SessionOptions::default()
    }
}

fn mirrors(urls: &[&str]) -> Vec<MirrorRequest> {
    urls.iter().map(|u| MirrorRequest::get(*u)).collect()
}

#[test]
fn two_mirrors_download_into_part_file() {
    let data = body(64 * 1024 + 123);
    let a = range_server::start(data.clone());
    let b = range_server::start(data.clone());

    let dir = tempdir().unwrap();
    let final_path = dir.path().join("object.bin");
    let writer = StorageWriter::create(&storage::temp_path(&final_path)).unwrap();
    let journal = Journal::open(&storage::journal_path(&final_path)).unwrap();

    let session = DownloadSession::new(
        mirrors(&[a.url.as_str(), b.url.as_str()]),
        options(4096, 2),
        transport(),
        Arc::new(writer.clone()) as Arc<dyn ByteSink>,
    );
    let report = session.run(Some(journal)).unwrap();
    assert_eq!(report.verdict, Verdict::AllCommitted);
    assert_eq!(report.chunk_count, 17);
    assert_eq!(report.bytes_written, data.len() as u64);

    writer.finalize(&final_path).unwrap();
    assert_eq!(std::fs::read(&final_path).unwrap(), data);
    // Each chunk fetched exactly once across both mirrors.
    assert_eq!(a.get_count() + b.get_count(), 17);
}

#[test]
fn interrupted_download_resumes_from_journal() {
    let data = body(10_000);
    let flaky = range_server::start_with(
        data.clone(),
        MirrorBehavior {
            fail_all: true,
            ..MirrorBehavior::default()
        },
    );
    let dir = tempdir().unwrap();
    let final_path = dir.path().join("object.bin");
    let journal_path = storage::journal_path(&final_path);
    let temp = storage::temp_path(&final_path);

    // Commit chunks 0 and 1 by hand, as a previous run would have.
    {
        let writer = StorageWriter::create(&temp).unwrap();
        writer.prepare(data.len() as u64).unwrap();
        writer.write_at(0, &data[..2000]).unwrap();
        let journal = Journal::open(&journal_path).unwrap();
        journal.commit(0).unwrap();
        journal.commit(1).unwrap();
    }

    // A mirror that fails everything leaves the journal untouched.
    let writer = StorageWriter::open_existing(&temp).unwrap();
    let session = DownloadSession::new(
        mirrors(&[flaky.url.as_str()]),
        options(1000, 2),
        transport(),
        Arc::new(writer) as Arc<dyn ByteSink>,
    );
    let err = session.run(Some(Journal::open(&journal_path).unwrap())).unwrap_err();
    assert!(matches!(err, SessionError::AllWorkersFailed { committed: 2, total: 10, .. }), "{err}");
    assert_eq!(flaky.gets_of(0), 0);
    assert_eq!(flaky.gets_of(1000), 0);

    let good = range_server::start(data.clone());
    let writer = StorageWriter::open_existing(&temp).unwrap();
    let session = DownloadSession::new(
        mirrors(&[good.url.as_str()]),
        options(1000, 2),
        transport(),
        Arc::new(writer.clone()) as Arc<dyn ByteSink>,
    );
    let report = session.run(Some(Journal::open(&journal_path).unwrap())).unwrap();
    assert_eq!(report.resumed_chunks, 2);
    assert_eq!(report.committed_chunks, 8);
    assert_eq!(good.get_count(), 8);
    assert_eq!(good.gets_of(0), 0);

    writer.finalize(&final_path).unwrap();
    assert_eq!(std::fs::read(&final_path).unwrap(), data);
}

#[test]
fn server_error_on_one_chunk_is_retried() {
    let data = body(8000);
    let server = range_server::start_with(
        data.clone(),
        MirrorBehavior {
            fail_once_at: vec![0],
            ..MirrorBehavior::default()
        },
    );
    let sink = Arc::new(mfetch_core::sink::MemorySink::new());
    let session = DownloadSession::new(
        mirrors(&[server.url.as_str()]),
        options(1000, 3),
        transport(),
        Arc::clone(&sink) as Arc<dyn ByteSink>,
    );
    session.run(None).unwrap();
    assert_eq!(sink.contents(), data);
    assert_eq!(server.gets_of(0), 2);
}

#[test]
fn disagreeing_mirrors() {
    let data = body(5000);
    let a = range_server::start(data.clone());
    let b = range_server::start_with(
        data.clone(),
        MirrorBehavior {
            content_length: Some(4999),
            ..MirrorBehavior::default()
        },
    );
    let sink = Arc::new(mfetch_core::sink::MemorySink::new());

    let session = DownloadSession::new(
        mirrors(&[a.url.as_str(), b.url.as_str()]),
        options(1000, 1),
        transport(),
        Arc::clone(&sink) as Arc<dyn ByteSink>,
    );
    match session.run(None) {
        Err(SessionError::LengthMismatch { first, length, .. }) => assert_eq!((first, length), (5000, 4999)),
        other => panic!("expected LengthMismatch, got {:?}", other),
    }
    assert_eq!(a.get_count() + b.get_count(), 0);

    let lenient = SessionOptions {
        length_policy: LengthPolicy::FirstSuccess,
        ..options(1000, 1)
    };
    let session = DownloadSession::new(
        mirrors(&[a.url.as_str(), b.url.as_str()]),
        lenient,
        transport(),
        Arc::clone(&sink) as Arc<dyn ByteSink>,
    );
    let report = session.run(None).unwrap();
    assert_eq!(report.content_length, 5000);
    assert_eq!(sink.contents(), data);
}

#[test]
fn missing_range_support_is_tolerated() {
    let data = body(3000);
    let server = range_server::start_with(
        data.clone(),
        MirrorBehavior {
            hide_ranges: true,
            ..MirrorBehavior::default()
        },
    );
    let sink = Arc::new(mfetch_core::sink::MemorySink::new());
    let session = DownloadSession::new(
        mirrors(&[server.url.as_str()]),
        options(1024, 1),
        transport(),
        Arc::clone(&sink) as Arc<dyn ByteSink>,
    );
    session.run(None).unwrap();
    assert_eq!(sink.contents(), data);
    assert_eq!(server.hits().iter().filter(|h| h.method == "HEAD").count(), 1);
}
