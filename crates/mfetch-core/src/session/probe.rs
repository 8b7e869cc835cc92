//! Size discovery: HEAD every mirror and agree on one content length.

use std::thread;
use std::time::{Duration, Instant};

use super::{LengthPolicy, SessionError};
use crate::observer::{MirrorProbe, SessionObserver};
use crate::request::MirrorRequest;
use crate::transport::{FetchError, ProbeResult, Transport};

struct Answer<'a> {
    mirror: &'a MirrorRequest,
    host: &'a str,
    latency: Duration,
    result: Result<ProbeResult, FetchError>,
}

/// Probe all mirrors concurrently and apply `policy` to their answers in
/// configuration order. `on_probe_complete` fires exactly once, before this
/// returns, whatever the outcome.
pub(super) fn discover_length(
    transport: &dyn Transport,
    mirrors: &[MirrorRequest],
    hosts: &[String],
    policy: LengthPolicy,
    observer: &dyn SessionObserver,
) -> Result<u64, SessionError> {
    let answers: Vec<Answer<'_>> = thread::scope(|scope| {
        let handles: Vec<_> = mirrors
            .iter()
            .zip(hosts)
            .map(|(mirror, host)| {
                scope.spawn(move || {
                    let started = Instant::now();
                    let result = transport.probe(mirror);
                    let latency = started.elapsed();
                    if let Ok(ProbeResult {
                        content_length: Some(content_length),
                        ..
                    }) = result
                    {
                        observer.on_mirror_probed(&MirrorProbe {
                            host: host.clone(),
                            latency,
                            content_length,
                        });
                    }
                    Answer {
                        mirror,
                        host: host.as_str(),
                        latency,
                        result,
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
            .collect()
    });
    observer.on_probe_complete();

    for answer in &answers {
        match &answer.result {
            Ok(probe) => {
                tracing::info!(
                    host = %answer.host,
                    latency_ms = answer.latency.as_millis() as u64,
                    content_length = ?probe.content_length,
                    "mirror probed"
                );
                if !probe.accept_ranges {
                    tracing::warn!(host = %answer.host, "mirror does not advertise byte ranges");
                }
            }
            Err(e) => tracing::warn!(host = %answer.host, error = %e, "mirror probe failed"),
        }
    }

    match policy {
        LengthPolicy::Unanimous => unanimous(answers),
        LengthPolicy::FirstSuccess => first_success(answers),
    }
}

fn unanimous(answers: Vec<Answer<'_>>) -> Result<u64, SessionError> {
    let mut agreed: Option<(&str, u64)> = None;
    for answer in answers {
        let probe = answer.result.map_err(|source| SessionError::Probe {
            url: answer.mirror.url.clone(),
            source,
        })?;
        let length = probe.content_length.ok_or_else(|| SessionError::MissingLength {
            url: answer.mirror.url.clone(),
        })?;
        match agreed {
            None => agreed = Some((answer.host, length)),
            Some((first_host, first)) if first != length => {
                return Err(SessionError::LengthMismatch {
                    first_host: first_host.to_string(),
                    first,
                    host: answer.host.to_string(),
                    length,
                });
            }
            Some(_) => {}
        }
    }
    agreed.map(|(_, length)| length).ok_or(SessionError::NoMirrors)
}

fn first_success(answers: Vec<Answer<'_>>) -> Result<u64, SessionError> {
    let mut chosen: Option<(&str, u64)> = None;
    let mut last_error = None;
    for answer in answers {
        match (answer.result, chosen) {
            (Ok(ProbeResult { content_length: Some(length), .. }), None) => {
                chosen = Some((answer.host, length));
            }
            (Ok(ProbeResult { content_length: Some(length), .. }), Some((host, first)))
                if length != first =>
            {
                tracing::warn!(
                    host = %answer.host,
                    length,
                    chosen_host = %host,
                    chosen = first,
                    "mirror reports a different length, keeping the first"
                );
            }
            (Ok(ProbeResult { content_length: None, .. }), _) => {
                last_error = Some(SessionError::MissingLength {
                    url: answer.mirror.url.clone(),
                });
            }
            (Err(source), _) => {
                last_error = Some(SessionError::Probe {
                    url: answer.mirror.url.clone(),
                    source,
                });
            }
            _ => {}
        }
    }
    match chosen {
        Some((_, length)) => Ok(length),
        None => Err(last_error.unwrap_or(SessionError::NoMirrors)),
    }
}
