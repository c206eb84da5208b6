//! netveil Block Lists
//!
//! Two write-once sets of blocked entries (hostnames and normalized URLs),
//! loaded in parallel from line-oriented sources at process start.
//!
//! Readers never see a half-loaded list as "not blocked": every lookup is
//! gated on a two-count readiness latch that each load pipeline releases
//! exactly once, whether it succeeded or not.

mod canonical;
mod gate;
mod source;
mod store;

pub use canonical::{canonical_host, canonical_url, CanonicalError};
pub use gate::ReadinessGate;
pub use source::{BlockListError, FileSource, InlineSource, ListSource};
pub use store::{BlockListStore, LoadReport};
