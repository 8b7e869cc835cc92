//! Checks that run before any HTTP traffic: options, methods, URLs, DNS.

use std::net::ToSocketAddrs;

use super::{SessionError, SessionOptions};
use crate::request::MirrorRequest;

struct Target {
    host: String,
    port: u16,
}

/// Validate every mirror, then resolve every host. Returns the display host
/// of each mirror, in order. Any failure fails the whole session.
pub(super) fn check(
    mirrors: &[MirrorRequest],
    options: &SessionOptions,
) -> Result<Vec<String>, SessionError> {
    let targets = validate(mirrors, options)?;
    for target in &targets {
        let addrs: Vec<_> = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|source| SessionError::Resolve {
                host: target.host.clone(),
                source,
            })?
            .collect();
        tracing::debug!(host = %target.host, ?addrs, "resolved mirror");
    }
    Ok(mirrors
        .iter()
        .zip(&targets)
        .map(|(m, t)| m.host().unwrap_or_else(|| t.host.clone()))
        .collect())
}

fn validate(
    mirrors: &[MirrorRequest],
    options: &SessionOptions,
) -> Result<Vec<Target>, SessionError> {
    if options.chunk_size == 0 {
        return Err(SessionError::InvalidOption("chunk size must be non-zero".into()));
    }
    if options.multiplicity == 0 {
        return Err(SessionError::InvalidOption("multiplicity must be non-zero".into()));
    }
    if mirrors.is_empty() {
        return Err(SessionError::NoMirrors);
    }

    mirrors
        .iter()
        .map(|m| {
            if m.method != "GET" {
                return Err(SessionError::UnsupportedMethod {
                    url: m.url.clone(),
                    method: m.method.clone(),
                });
            }
            let invalid = |reason: &str| SessionError::InvalidUrl {
                url: m.url.clone(),
                reason: reason.to_string(),
            };
            let url = url::Url::parse(&m.url).map_err(|e| invalid(&e.to_string()))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(invalid("scheme must be http or https"));
            }
            let host = match url.host() {
                Some(url::Host::Domain(d)) => d.to_string(),
                Some(url::Host::Ipv4(ip)) => ip.to_string(),
                Some(url::Host::Ipv6(ip)) => ip.to_string(),
                None => return Err(invalid("missing host")),
            };
            let port = url.port_or_known_default().unwrap_or(80);
            Ok(Target { host, port })
        })
        .collect()
}
