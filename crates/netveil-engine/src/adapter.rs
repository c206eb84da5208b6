//! Interception Adapter
//!
//! The contract between the engine and whatever installs the interception
//! points in the host process. One method per call-site kind; each returns
//! either `Proceed` (run the real call unmodified) or a substitute result
//! that is indistinguishable from an ordinary network failure:
//!
//! - DNS lookup      → empty address list
//! - socket connect  → connection refused
//! - HTTP fetch      → 403 Forbidden, empty body, no connection made
//! - WebView load    → navigation suppressed

use crate::guard::TrafficGuard;
use crate::request::{CallSite, CallerApp, RequestDescriptor, RequestDetails};
use hyper::body::Bytes;
use hyper::{HeaderMap, StatusCode};
use std::io;
use std::net::IpAddr;

/// What the call site should do
#[derive(Debug)]
pub enum Decision<T> {
    /// Perform the real operation
    Proceed,
    /// Skip it and hand this back instead
    Substitute(T),
}

impl<T> Decision<T> {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Substitute(_))
    }

    pub fn into_substitute(self) -> Option<T> {
        match self {
            Self::Proceed => None,
            Self::Substitute(value) => Some(value),
        }
    }
}

/// Resolution result for a blocked host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsSubstitute {
    /// Always empty
    pub addresses: Vec<IpAddr>,
}

/// Response fabricated for a blocked HTTP fetch
#[derive(Debug, Clone)]
pub struct SyntheticResponse {
    pub status: StatusCode,
    pub reason: &'static str,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl SyntheticResponse {
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            reason: "Forbidden",
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// Marker: the navigation was swallowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationSuppressed;

pub type DnsDecision = Decision<DnsSubstitute>;
pub type ConnectDecision = Decision<io::Error>;
pub type FetchDecision = Decision<SyntheticResponse>;
pub type NavigationDecision = Decision<NavigationSuppressed>;

/// Per-call-site decision surface the host's hooks call into.
pub trait InterceptionAdapter: Send + Sync {
    fn on_dns_lookup(&self, caller: &CallerApp, host: &str) -> DnsDecision;

    fn on_socket_connect(&self, caller: &CallerApp, host: &str, port: u16) -> ConnectDecision;

    fn on_http_fetch(
        &self,
        caller: &CallerApp,
        url: &str,
        details: Option<RequestDetails>,
    ) -> FetchDecision;

    fn on_webview_navigate(&self, caller: &CallerApp, url: &str) -> NavigationDecision;
}

/// [`InterceptionAdapter`] backed by a [`TrafficGuard`]
#[derive(Debug, Clone)]
pub struct GuardAdapter {
    guard: TrafficGuard,
}

impl GuardAdapter {
    pub fn new(guard: TrafficGuard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &TrafficGuard {
        &self.guard
    }
}

impl InterceptionAdapter for GuardAdapter {
    fn on_dns_lookup(&self, caller: &CallerApp, host: &str) -> DnsDecision {
        let desc = RequestDescriptor::dns(host).with_caller(caller.clone());
        if self.guard.evaluate(&desc).matched {
            Decision::Substitute(DnsSubstitute::default())
        } else {
            Decision::Proceed
        }
    }

    fn on_socket_connect(&self, caller: &CallerApp, host: &str, port: u16) -> ConnectDecision {
        let desc = RequestDescriptor::https_host(host)
            .with_caller(caller.clone())
            .with_call_site(CallSite::Socket)
            .with_details(RequestDetails {
                full_address: Some(format!("{}:{}", host, port)),
                ..Default::default()
            });
        if self.guard.evaluate(&desc).matched {
            Decision::Substitute(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("Connection refused: {}:{}", host, port),
            ))
        } else {
            Decision::Proceed
        }
    }

    fn on_http_fetch(
        &self,
        caller: &CallerApp,
        url: &str,
        details: Option<RequestDetails>,
    ) -> FetchDecision {
        let mut desc = RequestDescriptor::https_full(url)
            .with_caller(caller.clone())
            .with_call_site(CallSite::Http);
        desc.details = details;
        if self.guard.evaluate(&desc).matched {
            Decision::Substitute(SyntheticResponse::forbidden())
        } else {
            Decision::Proceed
        }
    }

    fn on_webview_navigate(&self, caller: &CallerApp, url: &str) -> NavigationDecision {
        let desc = RequestDescriptor::https_full(url)
            .with_caller(caller.clone())
            .with_call_site(CallSite::WebView);
        if self.guard.evaluate(&desc).matched {
            Decision::Substitute(NavigationSuppressed)
        } else {
            Decision::Proceed
        }
    }
}
