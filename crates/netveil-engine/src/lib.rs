//! netveil Traffic Classification Engine
//!
//! Decides, for every outbound network attempt made by a host process,
//! whether to let it through or to fabricate a blocked result.
//!
//! Architecture:
//! 1. Call site builds a `RequestDescriptor`
//! 2. `TrafficGuard` offloads any captured response body, then emits an
//!    ALL event before any lookup
//! 3. `Classifier` runs the tiers: host, then normalized full URL
//! 4. `TrafficGuard` emits exactly one BLOCKED or PASSED event
//! 5. `InterceptionAdapter` turns the verdict into a substitute result
//!
//! Every internal failure on this path fails open.

mod adapter;
mod body;
mod classifier;
mod event;
mod guard;
mod normalize;
mod reporter;
mod request;
mod verdict;

pub use adapter::{
    ConnectDecision, Decision, DnsDecision, DnsSubstitute, FetchDecision, GuardAdapter,
    InterceptionAdapter, NavigationDecision, NavigationSuppressed, SyntheticResponse,
};
pub use body::BodySink;
pub use classifier::Classifier;
pub use event::{CategoryFilter, EventBus, EventCategory, EventSink, NullSink, SinkError, TrafficEvent};
pub use guard::{InterceptorStats, TrafficGuard};
pub use normalize::{normalize_url, url_host, ClassifyError};
pub use reporter::EventReporter;
pub use request::{CallSite, CallerApp, RequestDescriptor, RequestDetails, RequestKind};
pub use verdict::{Tier, Verdict};
