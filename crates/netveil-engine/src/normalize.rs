//! URL normalization for the full-URL tier.
//!
//! Request URLs are reduced with the same canonical form the block list
//! applies to its URL entries: `scheme://host[:port]/path` with query,
//! fragment, credentials and default ports dropped.

use netveil_blocklist::{canonical_host, canonical_url};
use thiserror::Error;

/// Errors on the classification path. Never surfaced to the host process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("Malformed target '{target}': {reason}")]
    MalformedTarget { target: String, reason: String },
}

fn malformed(target: &str, reason: impl ToString) -> ClassifyError {
    ClassifyError::MalformedTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}

/// Reduce `raw` to the form stored in the URL block list.
pub fn normalize_url(raw: &str) -> Result<String, ClassifyError> {
    canonical_url(raw).map_err(|e| malformed(raw, e))
}

/// Host component of `raw`, as the host tier sees it. IPv6 hosts come back
/// without brackets.
pub fn url_host(raw: &str) -> Result<String, ClassifyError> {
    canonical_host(raw).map_err(|e| malformed(raw, e))
}
