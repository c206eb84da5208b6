//! Tiered classifier.
//!
//! Tiers, short-circuiting in order:
//! 1. Host set (DNS and HTTPS host requests, and the host of every full URL)
//! 2. URL set, against the normalized `scheme://host[:port]/path`
//!
//! Each lookup waits on the store's readiness gate. Anything that cannot be
//! evaluated passes.

use crate::normalize::{normalize_url, url_host};
use crate::request::{RequestDescriptor, RequestKind};
use crate::verdict::{Tier, Verdict};
use netveil_blocklist::BlockListStore;
use tracing::{debug, trace};

/// Pure decision logic over a [`BlockListStore`]
#[derive(Debug, Clone)]
pub struct Classifier {
    store: BlockListStore,
}

impl Classifier {
    pub fn new(store: BlockListStore) -> Self {
        Self { store }
    }

    /// The store lookups go through
    pub fn store(&self) -> &BlockListStore {
        &self.store
    }

    /// Produce a verdict for `desc`.
    pub fn classify(&self, desc: &RequestDescriptor) -> Verdict {
        match desc.kind {
            RequestKind::Dns => self.check_host(desc.host.as_deref(), Tier::Dns),
            RequestKind::HttpsHost => self.check_host(desc.host.as_deref(), Tier::Host),
            RequestKind::HttpsFull => self.check_full_url(desc.raw_url.as_deref()),
        }
    }

    fn check_host(&self, host: Option<&str>, tier: Tier) -> Verdict {
        let Some(host) = host.filter(|h| !h.is_empty()) else {
            return Verdict::pass();
        };

        if self.store.contains_host(host) {
            trace!("Host tier match: {}", host);
            Verdict::blocked(tier, host)
        } else {
            Verdict::pass()
        }
    }

    fn check_full_url(&self, raw: Option<&str>) -> Verdict {
        let Some(raw) = raw.filter(|u| !u.is_empty()) else {
            return Verdict::pass();
        };

        // A full-URL request is always a host request as well
        let host = match url_host(raw) {
            Ok(host) => host,
            Err(e) => {
                debug!("Passing unclassifiable request: {}", e);
                return Verdict::pass();
            }
        };
        let by_host = self.check_host(Some(&host), Tier::Host);
        if by_host.matched {
            return by_host;
        }

        let normalized = match normalize_url(raw) {
            Ok(normalized) => normalized,
            Err(e) => {
                debug!("Passing unclassifiable request: {}", e);
                return Verdict::pass();
            }
        };
        if self.store.contains_url(&normalized) {
            trace!("Full URL tier match: {}", normalized);
            Verdict::blocked(Tier::FullUrl, normalized)
        } else {
            Verdict::pass()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_classifier() -> Classifier {
        let store = BlockListStore::from_entries(
            ["ads.example.com", "tracker.net"],
            ["https://cdn.example.com/track", "http://media.example.org:8080/pixel.gif"],
        );
        Classifier::new(store)
    }

    #[test]
    fn test_host_tiers() {
        let classifier = create_test_classifier();

        let dns = classifier.classify(&RequestDescriptor::dns("ads.example.com"));
        assert_eq!(dns, Verdict::blocked(Tier::Dns, "ads.example.com"));

        let host = classifier.classify(&RequestDescriptor::https_host("ads.example.com"));
        assert_eq!(host, Verdict::blocked(Tier::Host, "ads.example.com"));

        let safe = classifier.classify(&RequestDescriptor::https_host("safe.example.com"));
        assert_eq!(safe, Verdict::pass());
        assert!(!classifier.classify(&RequestDescriptor::dns("safe.example.com")).matched);
    }

    #[test]
    fn test_full_url_strips_query() {
        let classifier = create_test_classifier();
        let verdict = classifier.classify(&RequestDescriptor::https_full(
            "https://cdn.example.com/track?uid=123",
        ));
        assert!(verdict.matched);
        assert_eq!(verdict.tier, Tier::FullUrl);
        assert_eq!(verdict.rule.as_deref(), Some("https://cdn.example.com/track"));
    }

    #[test]
    fn test_full_url_matches_without_host_entry() {
        let classifier = create_test_classifier();
        assert!(!classifier.store().contains_host("media.example.org"));

        let verdict = classifier.classify(&RequestDescriptor::https_full(
            "http://media.example.org:8080/pixel.gif#frag",
        ));
        assert_eq!(verdict.tier, Tier::FullUrl);
    }

    #[test]
    fn test_full_url_host_short_circuits() {
        let classifier = create_test_classifier();
        let verdict = classifier.classify(&RequestDescriptor::https_full(
            "https://tracker.net/anything?at=all",
        ));
        assert_eq!(verdict, Verdict::blocked(Tier::Host, "tracker.net"));
    }

    #[test]
    fn test_other_paths_pass() {
        let classifier = create_test_classifier();
        let verdict = classifier.classify(&RequestDescriptor::https_full(
            "https://cdn.example.com/tracking",
        ));
        assert_eq!(verdict, Verdict::pass());
    }

    #[test]
    fn test_malformed_url_fails_open() {
        let classifier = create_test_classifier();
        assert_eq!(
            classifier.classify(&RequestDescriptor::https_full("ht!tp://bad")),
            Verdict::pass()
        );
    }

    #[test]
    fn test_missing_or_empty_host_never_matches() {
        // An unloaded store would block forever if these touched it
        let classifier = Classifier::new(BlockListStore::new());

        let mut desc = RequestDescriptor::dns("");
        assert_eq!(classifier.classify(&desc), Verdict::pass());

        desc.host = None;
        assert_eq!(classifier.classify(&desc), Verdict::pass());

        let mut full = RequestDescriptor::https_full("");
        assert_eq!(classifier.classify(&full), Verdict::pass());
        full.raw_url = None;
        assert_eq!(classifier.classify(&full), Verdict::pass());
    }

    #[test]
    fn test_idempotent() {
        let classifier = create_test_classifier();
        let desc = RequestDescriptor::https_full("https://cdn.example.com/track?a=b");
        assert_eq!(classifier.classify(&desc), classifier.classify(&desc));
    }

    #[test]
    fn test_url_entries_match_themselves() {
        let entries = [
            "https://cdn.example.com",
            "https://cdn.example.com:443/track",
            "https://CDN.example.com/pixel",
            "https://cdn.example.com/a b",
        ];
        let classifier = Classifier::new(BlockListStore::from_entries(Vec::<String>::new(), entries));

        for entry in entries {
            let verdict = classifier.classify(&RequestDescriptor::https_full(entry));
            assert!(verdict.matched, "{} should match its own entry", entry);
            assert_eq!(verdict.tier, Tier::FullUrl);
        }
    }

    #[test]
    fn test_ipv6_url_host_matches_bare_entry() {
        let classifier = Classifier::new(BlockListStore::from_entries(["::1"], Vec::<String>::new()));

        let verdict = classifier.classify(&RequestDescriptor::https_full("http://[::1]:8080/x"));
        assert_eq!(verdict, Verdict::blocked(Tier::Host, "::1"));
        assert!(classifier.classify(&RequestDescriptor::dns("::1")).matched);
    }
}
