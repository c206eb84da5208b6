//! Traffic Guard
//!
//! Runs one classification end to end:
//! 1. Response body (if captured) moved to the body sink
//! 2. ALL event, before the lookup
//! 3. Tiered classification (may wait for the block lists to finish loading)
//! 4. BLOCKED or PASSED event, once the verdict is known
//!
//! Safe to call from any number of threads at once.

use crate::body::BodySink;
use crate::classifier::Classifier;
use crate::event::EventSink;
use crate::reporter::EventReporter;
use crate::request::RequestDescriptor;
use crate::verdict::Verdict;
use netveil_blocklist::BlockListStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

/// Classification statistics
#[derive(Debug, Default)]
pub struct InterceptorStats {
    pub total_requests: AtomicU64,
    pub blocked_requests: AtomicU64,
    pub total_check_time_ns: AtomicU64,
}

/// Classifier and reporter wired together
#[derive(Debug, Clone)]
pub struct TrafficGuard {
    classifier: Classifier,
    reporter: EventReporter,
    stats: Arc<InterceptorStats>,
}

impl TrafficGuard {
    pub fn new(store: BlockListStore, sink: Arc<dyn EventSink>) -> Self {
        Self {
            classifier: Classifier::new(store),
            reporter: EventReporter::new(sink),
            stats: Arc::new(InterceptorStats::default()),
        }
    }

    /// Offload captured response bodies to `bodies`.
    pub fn with_body_sink(mut self, bodies: Arc<dyn BodySink>) -> Self {
        self.reporter = self.reporter.with_body_sink(bodies);
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classify `desc` and report it.
    ///
    /// Emits exactly one ALL event and exactly one BLOCKED or PASSED event.
    pub fn evaluate(&self, desc: &RequestDescriptor) -> Verdict {
        let offloaded = self.reporter.offload_body(desc);
        let desc: &RequestDescriptor = &offloaded;
        self.reporter.report_attempt(desc);

        let start = Instant::now();
        let verdict = self.classifier.classify(desc);
        let elapsed = start.elapsed().as_nanos() as u64;

        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        self.stats.total_check_time_ns.fetch_add(elapsed, Ordering::Relaxed);
        if verdict.matched {
            self.stats.blocked_requests.fetch_add(1, Ordering::Relaxed);
            debug!("Blocked {} request ({}): {:?}", desc.kind, verdict.tier, verdict.rule);
        }

        self.reporter.report_outcome(desc, &verdict);
        verdict
    }

    /// (total, blocked, total check time in ns)
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.total_requests.load(Ordering::Relaxed),
            self.stats.blocked_requests.load(Ordering::Relaxed),
            self.stats.total_check_time_ns.load(Ordering::Relaxed),
        )
    }

    /// Average classification time in nanoseconds, including any wait for readiness
    pub fn avg_check_time_ns(&self) -> u64 {
        let total = self.stats.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }
        self.stats.total_check_time_ns.load(Ordering::Relaxed) / total
    }
}
