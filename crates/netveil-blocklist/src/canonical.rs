//! Canonical URL and host forms.
//!
//! Block-list entries and request URLs both pass through here, so a URL
//! line always matches a request for that same URL.
//!
//! A canonical URL is `scheme://host[:port]/path`. Query, fragment and
//! credentials are dropped, a port equal to the scheme default is dropped,
//! scheme and host are lowercased, an empty path becomes `/` and the path
//! is percent-encoded. IPv6 hosts keep their brackets inside a URL but not
//! in the bare host form.

use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    #[error("{0}")]
    Parse(#[from] url::ParseError),

    #[error("no host")]
    NoHost,
}

fn parse_with_host(raw: &str) -> Result<Url, CanonicalError> {
    let parsed = Url::parse(raw.trim())?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(CanonicalError::NoHost),
    }
}

/// Reduce `raw` to the form the URL set stores and looks up.
pub fn canonical_url(raw: &str) -> Result<String, CanonicalError> {
    let parsed = parse_with_host(raw)?;
    let host = parsed.host_str().ok_or(CanonicalError::NoHost)?;

    let mut canonical = String::with_capacity(raw.len());
    canonical.push_str(parsed.scheme());
    canonical.push_str("://");
    canonical.push_str(host);
    if let Some(port) = parsed.port() {
        canonical.push(':');
        canonical.push_str(&port.to_string());
    }
    canonical.push_str(parsed.path());
    Ok(canonical)
}

/// Host of `raw` in the form DNS and socket call sites pass it.
pub fn canonical_host(raw: &str) -> Result<String, CanonicalError> {
    let parsed = parse_with_host(raw)?;
    match parsed.host() {
        Some(Host::Domain(domain)) => Ok(domain.to_string()),
        Some(Host::Ipv4(addr)) => Ok(addr.to_string()),
        Some(Host::Ipv6(addr)) => Ok(addr.to_string()),
        None => Err(CanonicalError::NoHost),
    }
}
