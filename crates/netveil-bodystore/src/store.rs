//! UUID-keyed body storage.

use crate::stream::BodyStream;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// MIME type recorded when the inserter does not name one
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Process-wide store, created on first use
static GLOBAL_STORE: Lazy<EphemeralBodyStore> = Lazy::new(EphemeralBodyStore::new);

/// Body store errors
#[derive(Debug, Error)]
pub enum BodyStoreError {
    #[error("No body stored under {0}")]
    NotFound(Uuid),

    #[error("Unknown body URI: {0}")]
    UnknownUri(String),

    #[error("Unsupported open mode {0:?}, only \"r\" is allowed")]
    UnsupportedMode(String),

    #[error("Missing value: {0}")]
    MissingValue(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One stored response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBody {
    pub id: Uuid,
    pub content: Arc<str>,
    pub mime_type: String,
}

/// Concurrent map of bodies with no eviction.
///
/// Entries live until deleted or the process exits.
#[derive(Debug, Default)]
pub struct EphemeralBodyStore {
    entries: DashMap<Uuid, StoredBody>,
}

impl EphemeralBodyStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// The shared process-wide instance
    pub fn global() -> &'static EphemeralBodyStore {
        &GLOBAL_STORE
    }

    /// Store `content` as plain text and return its id.
    pub fn insert(&self, content: impl Into<Arc<str>>) -> Uuid {
        self.insert_with_mime(content, DEFAULT_MIME_TYPE)
    }

    /// Store `content` under a fresh id, tagged with `mime_type`.
    pub fn insert_with_mime(&self, content: impl Into<Arc<str>>, mime_type: impl Into<String>) -> Uuid {
        let content = content.into();
        let mime_type = mime_type.into();

        loop {
            let id = Uuid::new_v4();
            // Retry on the rare v4 collision
            if let Entry::Vacant(slot) = self.entries.entry(id) {
                debug!("Stored body {} ({} bytes, {})", id, content.len(), mime_type);
                slot.insert(StoredBody {
                    id,
                    content,
                    mime_type,
                });
                return id;
            }
        }
    }

    /// Content stored under `id`. The entry stays in place.
    pub fn read(&self, id: &Uuid) -> Result<Arc<str>, BodyStoreError> {
        self.entries
            .get(id)
            .map(|body| body.content.clone())
            .ok_or(BodyStoreError::NotFound(*id))
    }

    /// Full record stored under `id`
    pub fn get(&self, id: &Uuid) -> Result<StoredBody, BodyStoreError> {
        self.entries
            .get(id)
            .map(|body| body.value().clone())
            .ok_or(BodyStoreError::NotFound(*id))
    }

    /// MIME type of the body stored under `id`
    pub fn content_type(&self, id: &Uuid) -> Option<String> {
        self.entries.get(id).map(|body| body.mime_type.clone())
    }

    /// Open a UTF-8 byte stream over the body stored under `id`.
    ///
    /// The body is written on its own thread; the caller reads at its own pace.
    pub fn open_stream(&self, id: &Uuid) -> Result<BodyStream, BodyStoreError> {
        // Clone the Arc so the map shard is not held while the writer runs
        let content = self.read(id)?;
        let stream = BodyStream::spawn(content, format!("body {}", id))?;
        Ok(stream)
    }

    /// Remove one body. Returns whether it existed.
    pub fn delete(&self, id: &Uuid) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            debug!("Deleted body {}", id);
        }
        removed
    }

    /// Remove every body and return how many there were.
    pub fn delete_all(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, _| {
            removed += 1;
            false
        });
        debug!("Cleared {} stored bodies", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Read;
    use std::thread;

    #[test]
    fn test_insert_and_read() {
        let store = EphemeralBodyStore::new();
        let id = store.insert("{\"ok\":true}");
        assert_eq!(&*store.read(&id).unwrap(), "{\"ok\":true}");
        // Reading does not consume
        assert!(store.read(&id).is_ok());
        assert_eq!(store.content_type(&id).as_deref(), Some(DEFAULT_MIME_TYPE));
    }

    #[test]
    fn test_empty_body() {
        let store = EphemeralBodyStore::new();
        let id = store.insert("");
        assert_eq!(&*store.read(&id).unwrap(), "");

        let mut out = Vec::new();
        store.open_stream(&id).unwrap().read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_large_body_streams_intact() {
        let store = EphemeralBodyStore::new();
        let body = "line of response text ✓\n".repeat(200_000);
        let id = store.insert(body.as_str());

        let mut out = String::new();
        store.open_stream(&id).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn test_custom_mime() {
        let store = EphemeralBodyStore::new();
        let id = store.insert_with_mime("<p>hi</p>", "text/html");
        assert_eq!(store.content_type(&id).as_deref(), Some("text/html"));
        assert_eq!(store.get(&id).unwrap().mime_type, "text/html");
    }

    #[test]
    fn test_delete_then_not_found() {
        let store = EphemeralBodyStore::new();
        let id = store.insert("gone soon");

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(matches!(store.read(&id), Err(BodyStoreError::NotFound(missing)) if missing == id));
        assert!(matches!(store.open_stream(&id), Err(BodyStoreError::NotFound(_))));
        assert!(store.content_type(&id).is_none());
    }

    #[test]
    fn test_delete_all_counts() {
        let store = EphemeralBodyStore::new();
        for i in 0..5 {
            store.insert(format!("body {}", i));
        }
        assert_eq!(store.len(), 5);
        assert_eq!(store.delete_all(), 5);
        assert!(store.is_empty());
        assert_eq!(store.delete_all(), 0);
    }

    #[test]
    fn test_concurrent_inserts_are_unique() {
        let store = Arc::new(EphemeralBodyStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..250)
                        .map(|i| store.insert(format!("{}-{}", t, i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 2000);
        assert_eq!(store.len(), 2000);
    }

    #[test]
    fn test_global_is_shared() {
        let id = EphemeralBodyStore::global().insert("shared");
        assert_eq!(&*EphemeralBodyStore::global().read(&id).unwrap(), "shared");
        assert!(EphemeralBodyStore::global().delete(&id));
    }
}
