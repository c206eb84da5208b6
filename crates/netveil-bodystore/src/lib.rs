//! netveil Ephemeral Body Store
//!
//! Holds response bodies too large for the interception channel and hands
//! back an opaque id. Consumers read them whole, or stream them through a
//! pipe fed by a dedicated writer thread.
//!
//! Entries are never evicted: whoever inserts is responsible for deleting.

mod provider;
mod store;
mod stream;

pub use provider::{BodyProvider, BodyRecord, BodyUri, BodyValues, BODY_PATH, DEFAULT_AUTHORITY};
pub use store::{BodyStoreError, EphemeralBodyStore, StoredBody, DEFAULT_MIME_TYPE};
pub use stream::{BodyStream, CHUNK_SIZE};
