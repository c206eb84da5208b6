//! Event reporter: turns descriptors and verdicts into [`TrafficEvent`]s.

use crate::body::BodySink;
use crate::event::{EventCategory, EventSink, TrafficEvent};
use crate::normalize::normalize_url;
use crate::request::{RequestDescriptor, RequestKind};
use crate::verdict::Verdict;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{trace, warn};

/// Builds events and hands them to a sink without ever failing the caller.
#[derive(Clone)]
pub struct EventReporter {
    sink: Arc<dyn EventSink>,
    bodies: Option<Arc<dyn BodySink>>,
}

impl EventReporter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink, bodies: None }
    }

    /// Store captured response bodies in `bodies` and reference them by URI.
    pub fn with_body_sink(mut self, bodies: Arc<dyn BodySink>) -> Self {
        self.bodies = Some(bodies);
        self
    }

    /// Move a captured response body out of `desc` and into the body sink.
    ///
    /// Call once per classification, before reporting. The returned
    /// descriptor never carries the raw body; without a body sink the body
    /// is dropped.
    pub fn offload_body<'a>(&self, desc: &'a RequestDescriptor) -> Cow<'a, RequestDescriptor> {
        let has_body = desc
            .details
            .as_ref()
            .is_some_and(|details| details.response_body.is_some());
        if !has_body {
            return Cow::Borrowed(desc);
        }

        let mut owned = desc.clone();
        let Some(details) = owned.details.as_mut() else {
            return Cow::Owned(owned);
        };
        let Some(body) = details.response_body.take() else {
            return Cow::Owned(owned);
        };

        match &self.bodies {
            Some(bodies) => {
                match bodies.store_body(body, details.response_body_content_type.as_deref()) {
                    Ok(uri) => details.response_body_uri = Some(uri),
                    Err(e) => warn!("Failed to store response body: {}", e),
                }
            }
            None => trace!("No body sink, dropping response body"),
        }
        Cow::Owned(owned)
    }

    /// Emit the unconditional ALL event for `desc`.
    pub fn report_attempt(&self, desc: &RequestDescriptor) {
        let event = build_event(desc, EventCategory::All, None);
        self.deliver(event);
    }

    /// Emit exactly one BLOCKED or PASSED event for `desc`.
    pub fn report_outcome(&self, desc: &RequestDescriptor, verdict: &Verdict) {
        let category = if verdict.matched {
            EventCategory::Blocked
        } else {
            EventCategory::Passed
        };
        let event = build_event(desc, category, Some(verdict));
        self.deliver(event);
    }

    fn deliver(&self, event: TrafficEvent) {
        if let Err(e) = self.sink.publish(event) {
            trace!("Event dropped: {}", e);
        }
    }
}

impl std::fmt::Debug for EventReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReporter")
            .field("offloads_bodies", &self.bodies.is_some())
            .finish_non_exhaustive()
    }
}

/// What the event names as the request target
fn event_target(desc: &RequestDescriptor) -> String {
    match desc.kind {
        RequestKind::Dns | RequestKind::HttpsHost => desc.host.clone().unwrap_or_default(),
        RequestKind::HttpsFull => {
            let raw = desc.raw_url.as_deref().unwrap_or_default();
            normalize_url(raw).unwrap_or_else(|_| raw.to_string())
        }
    }
}

fn build_event(
    desc: &RequestDescriptor,
    category: EventCategory,
    verdict: Option<&Verdict>,
) -> TrafficEvent {
    let blocked_verdict = verdict.filter(|v| v.matched);
    let body_uri = desc
        .details
        .as_ref()
        .and_then(|details| details.response_body_uri.clone());
    let body_content_type = body_uri.as_ref().and_then(|_| {
        desc.details
            .as_ref()
            .and_then(|details| details.response_body_content_type.clone())
    });
    TrafficEvent {
        category,
        request_kind: desc.kind,
        blocked: verdict.map(|v| v.matched),
        target: event_target(desc),
        caller_app: format!("{} {}", desc.caller.display_name, desc.call_site.label())
            .trim_start()
            .to_string(),
        package_name: desc.caller.package_name.clone(),
        timestamp: desc.timestamp,
        call_site: desc.call_site,
        tier: blocked_verdict.map(|v| v.tier),
        rule: blocked_verdict.and_then(|v| v.rule.clone()),
        details: desc.details.clone(),
        response_body_uri: body_uri,
        response_body_content_type: body_content_type,
    }
}
