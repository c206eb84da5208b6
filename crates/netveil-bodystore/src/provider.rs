//! Body Provider
//!
//! URI-addressed request/response surface over an [`EphemeralBodyStore`]:
//!
//! - `content://<authority>/response_bodies`        the collection
//! - `content://<authority>/response_bodies/<uuid>` one stored body
//!
//! Consumers that can only pass strings around (an IPC layer, a UI list
//! row) use these URIs instead of holding ids or store handles.

use crate::store::{BodyStoreError, EphemeralBodyStore, DEFAULT_MIME_TYPE};
use crate::stream::BodyStream;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Authority used when the host does not configure one
pub const DEFAULT_AUTHORITY: &str = "netveil.bodystore";

/// Path segment naming the body collection
pub const BODY_PATH: &str = "response_bodies";

const URI_SCHEME: &str = "content";

/// A parsed provider URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyUri {
    Collection,
    Item(Uuid),
}

/// Values supplied to [`BodyProvider::insert`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyValues {
    pub content: Option<String>,
    /// Falls back to `text/plain`
    pub mime_type: Option<String>,
}

impl BodyValues {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Row returned by [`BodyProvider::query`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRecord {
    pub content: Arc<str>,
    pub mime_type: String,
}

/// URI front end for a body store
#[derive(Debug, Clone)]
pub struct BodyProvider<'s> {
    store: &'s EphemeralBodyStore,
    authority: String,
    collection: Url,
}

impl BodyProvider<'static> {
    /// Provider over the process-wide store
    pub fn global(authority: &str) -> Result<Self, BodyStoreError> {
        BodyProvider::new(EphemeralBodyStore::global(), authority)
    }
}

impl<'s> BodyProvider<'s> {
    pub fn new(store: &'s EphemeralBodyStore, authority: &str) -> Result<Self, BodyStoreError> {
        let raw = format!("{}://{}/{}", URI_SCHEME, authority, BODY_PATH);
        let collection =
            Url::parse(&raw).map_err(|e| BodyStoreError::UnknownUri(format!("{}: {}", raw, e)))?;
        if authority.is_empty() || collection.host_str() != Some(authority) {
            return Err(BodyStoreError::UnknownUri(raw));
        }

        Ok(Self {
            store,
            authority: authority.to_string(),
            collection,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// URI of the whole collection
    pub fn collection_uri(&self) -> &Url {
        &self.collection
    }

    /// URI addressing the body stored under `id`
    pub fn item_uri(&self, id: &Uuid) -> Url {
        let mut uri = self.collection.clone();
        // The collection URI always has a hierarchical path
        if let Ok(mut segments) = uri.path_segments_mut() {
            segments.push(&id.to_string());
        }
        uri
    }

    /// Match `uri` against this provider's authority and paths.
    pub fn parse(&self, uri: &str) -> Result<BodyUri, BodyStoreError> {
        let unknown = || BodyStoreError::UnknownUri(uri.to_string());

        let parsed = Url::parse(uri).map_err(|_| unknown())?;
        if parsed.scheme() != URI_SCHEME || parsed.host_str() != Some(self.authority.as_str()) {
            return Err(unknown());
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .ok_or_else(unknown)?
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [collection] if *collection == BODY_PATH => Ok(BodyUri::Collection),
            [collection, id] if *collection == BODY_PATH => {
                Uuid::parse_str(id).map(BodyUri::Item).map_err(|_| unknown())
            }
            _ => Err(unknown()),
        }
    }

    /// Store a body posted to the collection URI and return its item URI.
    pub fn insert(&self, uri: &str, values: BodyValues) -> Result<Url, BodyStoreError> {
        if self.parse(uri)? != BodyUri::Collection {
            return Err(BodyStoreError::UnknownUri(uri.to_string()));
        }

        let content = values.content.ok_or(BodyStoreError::MissingValue("content"))?;
        let mime_type = values
            .mime_type
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let id = self.store.insert_with_mime(content, mime_type);
        let item = self.item_uri(&id);
        debug!("Inserted body at {}", item);
        Ok(item)
    }

    /// Look up the body an item URI names.
    ///
    /// `Ok(None)` for a missing body and for the collection, which cannot
    /// be listed.
    pub fn query(&self, uri: &str) -> Result<Option<BodyRecord>, BodyStoreError> {
        match self.parse(uri)? {
            BodyUri::Collection => {
                warn!("Querying {} without an id is not supported", uri);
                Ok(None)
            }
            BodyUri::Item(id) => match self.store.get(&id) {
                Ok(body) => Ok(Some(BodyRecord {
                    content: body.content,
                    mime_type: body.mime_type,
                })),
                Err(BodyStoreError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    /// Open the body an item URI names for streaming. Only mode `"r"` is accepted.
    pub fn open_file(&self, uri: &str, mode: &str) -> Result<BodyStream, BodyStoreError> {
        if mode != "r" {
            return Err(BodyStoreError::UnsupportedMode(mode.to_string()));
        }
        match self.parse(uri)? {
            BodyUri::Item(id) => self.store.open_stream(&id),
            BodyUri::Collection => Err(BodyStoreError::UnknownUri(uri.to_string())),
        }
    }

    /// MIME type of the body an item URI names
    pub fn get_type(&self, uri: &str) -> Result<Option<String>, BodyStoreError> {
        match self.parse(uri)? {
            BodyUri::Item(id) => Ok(self.store.content_type(&id)),
            BodyUri::Collection => Ok(None),
        }
    }

    /// Delete one body (returns 0 or 1) or, for the collection URI, all of them.
    pub fn delete(&self, uri: &str) -> Result<usize, BodyStoreError> {
        match self.parse(uri)? {
            BodyUri::Item(id) => Ok(usize::from(self.store.delete(&id))),
            BodyUri::Collection => Ok(self.store.delete_all()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn create_test_provider(store: &EphemeralBodyStore) -> BodyProvider<'_> {
        BodyProvider::new(store, DEFAULT_AUTHORITY).unwrap()
    }

    #[test]
    fn test_uri_shapes() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);

        assert_eq!(
            provider.collection_uri().as_str(),
            "content://netveil.bodystore/response_bodies"
        );
        let id = Uuid::new_v4();
        let item = provider.item_uri(&id);
        assert_eq!(item.as_str(), format!("content://netveil.bodystore/response_bodies/{}", id));
        assert_eq!(provider.parse(item.as_str()).unwrap(), BodyUri::Item(id));
        assert_eq!(
            provider.parse("content://netveil.bodystore/response_bodies/").unwrap(),
            BodyUri::Collection
        );
    }

    #[test]
    fn test_unknown_uris() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);

        for uri in [
            "content://other.authority/response_bodies",
            "https://netveil.bodystore/response_bodies",
            "content://netveil.bodystore/temporary_files",
            "content://netveil.bodystore/response_bodies/not-a-uuid",
            "content://netveil.bodystore/response_bodies/a/b",
            "not a uri",
        ] {
            assert!(
                matches!(provider.parse(uri), Err(BodyStoreError::UnknownUri(_))),
                "{} should be rejected",
                uri
            );
        }
    }

    #[test]
    fn test_invalid_authority() {
        let store = EphemeralBodyStore::new();
        assert!(BodyProvider::new(&store, "").is_err());
        assert!(BodyProvider::new(&store, "bad authority").is_err());
    }

    #[test]
    fn test_insert_query_round_trip() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);
        let collection = provider.collection_uri().to_string();

        let item = provider
            .insert(&collection, BodyValues::new("{\"a\":1}").with_mime_type("application/json"))
            .unwrap();
        let record = provider.query(item.as_str()).unwrap().unwrap();
        assert_eq!(&*record.content, "{\"a\":1}");
        assert_eq!(record.mime_type, "application/json");
        assert_eq!(
            provider.get_type(item.as_str()).unwrap().as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_insert_rules() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);
        let collection = provider.collection_uri().to_string();

        assert!(matches!(
            provider.insert(&collection, BodyValues::default()),
            Err(BodyStoreError::MissingValue("content"))
        ));

        let item = provider.insert(&collection, BodyValues::new("x")).unwrap();
        assert_eq!(provider.get_type(item.as_str()).unwrap().as_deref(), Some(DEFAULT_MIME_TYPE));
        // Items are not insert targets
        assert!(matches!(
            provider.insert(item.as_str(), BodyValues::new("y")),
            Err(BodyStoreError::UnknownUri(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_query_collection_and_missing() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);

        assert_eq!(provider.query(provider.collection_uri().as_str()).unwrap(), None);
        let missing = provider.item_uri(&Uuid::new_v4());
        assert_eq!(provider.query(missing.as_str()).unwrap(), None);
        assert_eq!(provider.get_type(missing.as_str()).unwrap(), None);
    }

    #[test]
    fn test_open_file() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);
        let item = provider
            .insert(provider.collection_uri().as_str(), BodyValues::new("streamed body"))
            .unwrap();

        let mut out = String::new();
        provider
            .open_file(item.as_str(), "r")
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "streamed body");

        assert!(matches!(
            provider.open_file(item.as_str(), "rw"),
            Err(BodyStoreError::UnsupportedMode(mode)) if mode == "rw"
        ));
        assert!(matches!(
            provider.open_file(provider.collection_uri().as_str(), "r"),
            Err(BodyStoreError::UnknownUri(_))
        ));
        let missing = provider.item_uri(&Uuid::new_v4());
        assert!(matches!(
            provider.open_file(missing.as_str(), "r"),
            Err(BodyStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_item_and_collection() {
        let store = EphemeralBodyStore::new();
        let provider = create_test_provider(&store);
        let collection = provider.collection_uri().to_string();

        let first = provider.insert(&collection, BodyValues::new("1")).unwrap();
        provider.insert(&collection, BodyValues::new("2")).unwrap();
        provider.insert(&collection, BodyValues::new("3")).unwrap();

        assert_eq!(provider.delete(first.as_str()).unwrap(), 1);
        assert_eq!(provider.delete(first.as_str()).unwrap(), 0);
        assert_eq!(provider.delete(&collection).unwrap(), 2);
        assert!(store.is_empty());
    }
}
