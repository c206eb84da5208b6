//! Traffic events and the sinks that receive them.
//!
//! Every classification produces two events: an ALL event before the lookup
//! and one BLOCKED or PASSED event after it. Delivery is fire-and-forget.

use crate::request::{CallSite, RequestDetails, RequestKind};
use crate::verdict::Tier;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::trace;

/// Event delivery errors. Never raised to the intercepted call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("No observer registered for {0:?} events")]
    SinkUnavailable(EventCategory),
}

/// Which stream an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// Every attempt, emitted before the lookup
    All,
    Blocked,
    Passed,
}

/// One reported network attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEvent {
    pub category: EventCategory,
    pub request_kind: RequestKind,
    /// `None` only for [`EventCategory::All`]
    pub blocked: Option<bool>,
    /// Host, or normalized URL for full-URL requests
    pub target: String,
    /// Caller display name with the call-site label appended
    pub caller_app: String,
    pub package_name: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub call_site: CallSite,
    /// Tier that blocked the request; BLOCKED events only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Block-list entry that matched; BLOCKED events only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<RequestDetails>,
    /// Body-store URI of the response body, when one was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body_content_type: Option<String>,
}

/// Where the reporter hands events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TrafficEvent) -> Result<(), SinkError>;
}

/// Sink for hosts with no traffic observer
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, event: TrafficEvent) -> Result<(), SinkError> {
        Err(SinkError::SinkUnavailable(event.category))
    }
}

/// Which categories a subscriber wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    Any,
    Only(EventCategory),
}

impl CategoryFilter {
    fn accepts(&self, category: EventCategory) -> bool {
        match self {
            Self::Any => true,
            Self::Only(c) => *c == category,
        }
    }
}

struct Subscriber {
    filter: CategoryFilter,
    tx: Sender<TrafficEvent>,
}

/// In-process publish/subscribe sink.
///
/// Subscribers get a channel receiver; dropping it unsubscribes. A full
/// bounded subscriber misses events rather than stalling the publisher.
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    /// Per-subscriber queue bound; `None` for unbounded
    capacity: Option<usize>,
}

impl EventBus {
    /// Bus with unbounded subscriber queues
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: None,
        }
    }

    /// Bus whose subscriber queues hold at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    /// Register an observer for the categories `filter` accepts.
    pub fn subscribe(&self, filter: CategoryFilter) -> Receiver<TrafficEvent> {
        let (tx, rx) = match self.capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { filter, tx });
        rx
    }

    /// Live subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: TrafficEvent) -> Result<(), SinkError> {
        let category = event.category;
        let mut delivered = 0usize;

        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sub| {
            if !sub.filter.accepts(category) {
                return true;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    trace!("Subscriber queue full, dropping {:?} event", category);
                    true
                }
                // Receiver dropped: unsubscribe
                Err(TrySendError::Disconnected(_)) => false,
            }
        });

        if delivered == 0 {
            return Err(SinkError::SinkUnavailable(category));
        }
        Ok(())
    }
}
