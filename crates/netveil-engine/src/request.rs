//! Request descriptors: one per intercepted network attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Which classification path a request takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    /// Name resolution for a host
    Dns,
    /// Host-only HTTPS check (socket connects land here too)
    HttpsHost,
    /// Full URL check, host tier first
    HttpsFull,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS"),
            Self::HttpsHost => write!(f, "HTTPS_HOST"),
            Self::HttpsFull => write!(f, "HTTPS_FULL"),
        }
    }
}

/// The kind of call the host process was making
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallSite {
    Dns,
    Socket,
    Http,
    WebView,
}

impl CallSite {
    /// Short label appended to the caller's display name in events
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dns => "DNS",
            Self::Socket => "SOCKET",
            Self::Http => "HTTP",
            Self::WebView => "WEBVIEW",
        }
    }
}

/// The application that made the request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerApp {
    pub package_name: String,
    pub display_name: String,
}

impl CallerApp {
    pub fn new(package_name: &str, display_name: &str) -> Self {
        Self {
            package_name: package_name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Request/response detail the call site may have captured.
///
/// Classification never reads it. Events carry it with the response body
/// swapped for a body-store URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetails {
    pub method: Option<String>,
    pub url_string: Option<String>,
    pub request_headers: Option<String>,
    pub response_code: Option<u16>,
    pub response_message: Option<String>,
    pub response_headers: Option<String>,
    pub stack: Option<String>,
    pub dns_host: Option<String>,
    pub full_address: Option<String>,
    /// Raw response body; never sent inside an event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body_content_type: Option<String>,
    /// Where the body was stored, once offloaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body_uri: Option<String>,
}

/// One evaluable network attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub kind: RequestKind,
    /// Required for `Dns` and `HttpsHost`
    pub host: Option<String>,
    /// Required for `HttpsFull`
    pub raw_url: Option<String>,
    pub caller: CallerApp,
    pub call_site: CallSite,
    pub details: Option<RequestDetails>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl RequestDescriptor {
    fn with_kind(kind: RequestKind, call_site: CallSite) -> Self {
        Self {
            kind,
            host: None,
            raw_url: None,
            caller: CallerApp::default(),
            call_site,
            details: None,
            timestamp: now_millis(),
        }
    }

    /// A DNS lookup for `host`
    pub fn dns(host: impl Into<String>) -> Self {
        let mut desc = Self::with_kind(RequestKind::Dns, CallSite::Dns);
        desc.host = Some(host.into());
        desc
    }

    /// A host-only HTTPS check for `host`
    pub fn https_host(host: impl Into<String>) -> Self {
        let mut desc = Self::with_kind(RequestKind::HttpsHost, CallSite::Socket);
        desc.host = Some(host.into());
        desc
    }

    /// A full-URL HTTPS check for `url`
    pub fn https_full(url: impl Into<String>) -> Self {
        let mut desc = Self::with_kind(RequestKind::HttpsFull, CallSite::Http);
        desc.raw_url = Some(url.into());
        desc
    }

    pub fn with_caller(mut self, caller: CallerApp) -> Self {
        self.caller = caller;
        self
    }

    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = call_site;
        self
    }

    pub fn with_details(mut self, details: RequestDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_fill_required_fields() {
        let dns = RequestDescriptor::dns("ads.example.com");
        assert_eq!(dns.kind, RequestKind::Dns);
        assert_eq!(dns.host.as_deref(), Some("ads.example.com"));
        assert!(dns.raw_url.is_none());

        let full = RequestDescriptor::https_full("https://cdn.example.com/track?x=1");
        assert_eq!(full.kind, RequestKind::HttpsFull);
        assert!(full.host.is_none());
        assert_eq!(full.call_site, CallSite::Http);
        assert!(full.timestamp > 0);
    }

    #[test]
    fn test_builder_methods() {
        let desc = RequestDescriptor::https_host("ads.example.com")
            .with_caller(CallerApp::new("com.example.app", "Example"))
            .with_call_site(CallSite::WebView)
            .with_details(RequestDetails {
                method: Some("GET".into()),
                ..Default::default()
            });

        assert_eq!(desc.caller.package_name, "com.example.app");
        assert_eq!(desc.call_site, CallSite::WebView);
        assert_eq!(desc.details.unwrap().method.as_deref(), Some("GET"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RequestKind::HttpsFull.to_string(), "HTTPS_FULL");
        assert_eq!(CallSite::Socket.label(), "SOCKET");
    }
}
