//! The span record and the shared handle over an open span.

use crate::context::{ExecutionContext, SpanId, TraceId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Completion status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// The span is still open.
    Unset,
    /// The primitive completed successfully.
    Ok,
    /// The primitive failed.
    Error {
        /// The failure message.
        message: String,
    },
}

impl SpanStatus {
    /// Check if the status is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// A timestamped event attached to a span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    /// Event name (e.g. "exception", "retrying").
    pub name: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Free-form event attributes.
    pub attributes: HashMap<String, Value>,
}

impl SpanEvent {
    /// Create an event stamped with the current time.
    pub fn new(name: impl Into<String>, attributes: HashMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            attributes,
        }
    }
}

/// The record of one primitive invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Span name (the primitive's declared name).
    pub name: String,
    /// The primitive variant (e.g. "sequential", "retry", "cache").
    pub primitive_type: String,
    /// Trace this span belongs to.
    pub trace_id: TraceId,
    /// This span's identifier.
    pub span_id: SpanId,
    /// The parent span, absent only for the workflow root.
    pub parent_span_id: Option<SpanId>,
    /// Correlation ID linking the span to external log lines.
    pub correlation_id: String,
    /// When the primitive entered.
    pub started_at: DateTime<Utc>,
    /// When the primitive exited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Wall-clock duration, present once the span is finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Completion status.
    pub status: SpanStatus,
    /// Span attributes.
    pub attributes: HashMap<String, Value>,
    /// Ordered span events.
    pub events: Vec<SpanEvent>,
}

impl SpanRecord {
    /// Open a span for the primitive executing under `ctx`.
    ///
    /// The record takes its identifier triple and correlation ID from the
    /// context, which the instrumentation layer has already derived.
    pub fn start(
        name: impl Into<String>,
        primitive_type: impl Into<String>,
        ctx: &ExecutionContext,
    ) -> Self {
        Self {
            name: name.into(),
            primitive_type: primitive_type.into(),
            trace_id: ctx.trace_id(),
            span_id: ctx.span_id(),
            parent_span_id: ctx.parent_span_id(),
            correlation_id: ctx.correlation_id().to_string(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            status: SpanStatus::Unset,
            attributes: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Check whether this is the root span of its trace.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Attach an attribute.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Append an event.
    pub fn add_event(&mut self, event: SpanEvent) {
        self.events.push(event);
    }

    /// Close the span with success status.
    pub fn finish_ok(&mut self) {
        self.finish(SpanStatus::Ok);
    }

    /// Close the span with error status.
    pub fn finish_error(&mut self, message: impl Into<String>) {
        self.finish(SpanStatus::Error {
            message: message.into(),
        });
    }

    fn finish(&mut self, status: SpanStatus) {
        let now = Utc::now();
        self.status = status;
        self.ended_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
    }
}

/// Shared mutable handle over an open span.
///
/// The instrumentation layer creates the handle and installs it in the
/// derived context. Primitives reach it only through
/// [`ExecutionContext::record_attribute`] and
/// [`ExecutionContext::record_event`] — they never see the record itself.
#[derive(Clone)]
pub struct SpanHandle {
    inner: Arc<Mutex<SpanRecord>>,
}

impl SpanHandle {
    /// Wrap an open span record.
    #[must_use]
    pub fn new(record: SpanRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(record)),
        }
    }

    /// Attach an attribute to the span.
    pub fn add_attribute(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.lock().add_attribute(key, value);
    }

    /// Append an event to the span.
    pub fn add_event(&self, name: impl Into<String>, attributes: HashMap<String, Value>) {
        self.inner.lock().add_event(SpanEvent::new(name, attributes));
    }

    /// Close the span with success status.
    pub fn finish_ok(&self) {
        self.inner.lock().finish_ok();
    }

    /// Close the span with error status.
    pub fn finish_error(&self, message: impl Into<String>) {
        self.inner.lock().finish_error(message);
    }

    /// Extract the record, consuming the handle.
    #[must_use]
    pub fn into_record(self) -> SpanRecord {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner(),
            Err(arc) => arc.lock().clone(),
        }
    }
}

impl std::fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let record = self.inner.lock();
        f.debug_struct("SpanHandle")
            .field("name", &record.name)
            .field("span_id", &record.span_id)
            .finish()
    }
}

/// Check that a set of spans forms a single rooted tree.
///
/// This is the central correctness property of the instrumentation layer:
/// all spans share one `trace_id`, exactly one span has no parent, and every
/// other span's parent is present in the set.
pub fn validate_trace_tree(spans: &[SpanRecord]) -> std::result::Result<(), String> {
    if spans.is_empty() {
        return Err("no spans recorded".to_string());
    }

    let trace_id = spans[0].trace_id;
    if let Some(stray) = spans.iter().find(|s| s.trace_id != trace_id) {
        return Err(format!(
            "span '{}' belongs to trace {} but expected {}",
            stray.name, stray.trace_id, trace_id
        ));
    }

    let roots: Vec<&SpanRecord> = spans.iter().filter(|s| s.is_root()).collect();
    if roots.len() != 1 {
        return Err(format!("expected exactly one root span, found {}", roots.len()));
    }

    let ids: std::collections::HashSet<SpanId> = spans.iter().map(|s| s.span_id).collect();
    for span in spans {
        if let Some(parent) = span.parent_span_id {
            if !ids.contains(&parent) {
                return Err(format!(
                    "span '{}' has parent {} which is not in the recorded set",
                    span.name, parent
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::root()
    }

    #[test]
    fn start_takes_ids_from_context() {
        let ctx = ctx();
        let span = SpanRecord::start("fetch", "leaf", &ctx);

        assert_eq!(span.trace_id, ctx.trace_id());
        assert_eq!(span.span_id, ctx.span_id());
        assert_eq!(span.parent_span_id, None);
        assert_eq!(span.status, SpanStatus::Unset);
        assert!(span.is_root());
    }

    #[test]
    fn finish_ok_sets_duration() {
        let mut span = SpanRecord::start("fetch", "leaf", &ctx());
        span.finish_ok();

        assert_eq!(span.status, SpanStatus::Ok);
        assert!(span.ended_at.is_some());
        assert!(span.duration_ms.is_some());
    }

    #[test]
    fn finish_error_keeps_message() {
        let mut span = SpanRecord::start("fetch", "leaf", &ctx());
        span.finish_error("connection reset");

        assert!(span.status.is_error());
        match span.status {
            SpanStatus::Error { message } => assert_eq!(message, "connection reset"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn handle_records_attributes_and_events() {
        let handle = SpanHandle::new(SpanRecord::start("fetch", "leaf", &ctx()));
        handle.add_attribute("input.size", 42);
        handle.add_event("retrying", HashMap::new());
        handle.finish_ok();

        let record = handle.into_record();
        assert_eq!(record.attributes.get("input.size"), Some(&Value::from(42)));
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].name, "retrying");
    }

    #[test]
    fn record_roundtrips_through_json() {
        let mut span = SpanRecord::start("fetch", "leaf", &ctx());
        span.add_attribute("cache.hit", true);
        span.finish_ok();

        let json = serde_json::to_string(&span).unwrap();
        let parsed: SpanRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.span_id, span.span_id);
        assert_eq!(parsed.status, SpanStatus::Ok);
    }

    #[test]
    fn tree_validation_accepts_parent_chain() {
        let root_ctx = ctx();
        let child_ctx = root_ctx.child();
        let grandchild_ctx = child_ctx.child();

        let mut spans = vec![
            SpanRecord::start("root", "workflow", &root_ctx),
            SpanRecord::start("child", "sequential", &child_ctx),
            SpanRecord::start("grandchild", "leaf", &grandchild_ctx),
        ];
        for span in &mut spans {
            span.finish_ok();
        }

        assert!(validate_trace_tree(&spans).is_ok());
    }

    #[test]
    fn tree_validation_rejects_missing_parent() {
        let root_ctx = ctx();
        let orphan_ctx = root_ctx.child().child();

        let spans = vec![
            SpanRecord::start("root", "workflow", &root_ctx),
            SpanRecord::start("orphan", "leaf", &orphan_ctx),
        ];

        assert!(validate_trace_tree(&spans).is_err());
    }

    #[test]
    fn tree_validation_rejects_two_roots() {
        let spans = vec![
            SpanRecord::start("a", "workflow", &ctx()),
            SpanRecord::start("b", "workflow", &ctx()),
        ];
        assert!(validate_trace_tree(&spans).is_err());
    }
}
