//! Response-body offloading.
//!
//! Bodies are too large for the event channel, so the reporter hands them to
//! a [`BodySink`] and events carry the URI it returns instead.

use netveil_bodystore::{BodyProvider, BodyStoreError, BodyValues};

/// Somewhere to park a response body and get back a URI for it.
pub trait BodySink: Send + Sync {
    fn store_body(&self, content: String, content_type: Option<&str>) -> Result<String, BodyStoreError>;
}

impl BodySink for BodyProvider<'static> {
    fn store_body(&self, content: String, content_type: Option<&str>) -> Result<String, BodyStoreError> {
        let mut values = BodyValues::new(content);
        values.mime_type = content_type.map(str::to_string);
        let uri = self.insert(self.collection_uri().as_str(), values)?;
        Ok(uri.to_string())
    }
}
