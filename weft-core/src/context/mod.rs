//! Execution context propagated through a workflow.
//!
//! The context is an immutable-with-copy value object: derivation methods
//! (`child`, `with_baggage`, `with_metadata`, `with_cancel`) return new
//! contexts and never mutate the receiver. Identifiers follow W3C Trace
//! Context semantics so that exported spans link up in external backends.
//!
//! # Invariant
//!
//! Every derived context has `parent_span_id == Some(parent.span_id)` and
//! inherits `trace_id`, `correlation_id`, `baggage`, and `state` from its
//! parent; `span_id` is freshly generated per derivation. Primitives receive
//! a context and may read baggage/metadata and write workflow state, but
//! cannot alter the identifier triple they were given.

mod ids;
mod state;

pub use ids::{SpanId, TraceId};
pub use state::{CompensationEntry, UndoAction, WorkflowState, SAGA_LOG_KEY};

use crate::span::SpanHandle;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Execution context carried through every primitive invocation.
///
/// Cloning is cheap: baggage and metadata are shared behind `Arc` and
/// workflow state is shared by reference by design.
#[derive(Clone)]
pub struct ExecutionContext {
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    correlation_id: Arc<str>,
    baggage: Arc<BTreeMap<String, String>>,
    metadata: Arc<HashMap<String, Value>>,
    state: WorkflowState,
    cancel: CancellationToken,
    span: Option<SpanHandle>,
}

impl ExecutionContext {
    /// Create a root context with a generated correlation ID.
    ///
    /// The caller owns the root context for the lifetime of the workflow.
    #[must_use]
    pub fn root() -> Self {
        Self::root_with_correlation(Uuid::new_v4().to_string())
    }

    /// Create a root context with a caller-supplied correlation ID.
    #[must_use]
    pub fn root_with_correlation(correlation_id: impl Into<String>) -> Self {
        Self {
            trace_id: TraceId::new(),
            span_id: SpanId::new(),
            parent_span_id: None,
            correlation_id: Arc::from(correlation_id.into()),
            baggage: Arc::new(BTreeMap::new()),
            metadata: Arc::new(HashMap::new()),
            state: WorkflowState::new(),
            cancel: CancellationToken::new(),
            span: None,
        }
    }

    /// Derive a child context for a nested primitive invocation.
    ///
    /// The child gets a fresh `span_id`, a `parent_span_id` pointing at this
    /// context, a child cancellation token, and shares everything else.
    /// The span handle is cleared; the instrumentation layer installs the
    /// child's own handle.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: SpanId::new(),
            parent_span_id: Some(self.span_id),
            correlation_id: Arc::clone(&self.correlation_id),
            baggage: Arc::clone(&self.baggage),
            metadata: Arc::clone(&self.metadata),
            state: self.state.clone(),
            cancel: self.cancel.child_token(),
            span: None,
        }
    }

    /// Return a copy with one baggage entry added.
    ///
    /// Baggage is copy-on-write: the receiver and any previously derived
    /// contexts are unaffected.
    #[must_use]
    pub fn with_baggage(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut baggage = (*self.baggage).clone();
        baggage.insert(key.into(), value.into());
        Self {
            baggage: Arc::new(baggage),
            ..self.clone()
        }
    }

    /// Return a copy with one metadata entry added.
    #[must_use]
    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut metadata = (*self.metadata).clone();
        metadata.insert(key.into(), value.into());
        Self {
            metadata: Arc::new(metadata),
            ..self.clone()
        }
    }

    /// Return a copy governed by a different cancellation token.
    ///
    /// Used by primitives that manage a cancellation scope for a subtree
    /// (timeout deadlines, fail-fast parallel branches).
    #[must_use]
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// Return a copy with a span handle installed.
    ///
    /// Called by the instrumentation layer only.
    #[must_use]
    pub fn with_span(&self, span: SpanHandle) -> Self {
        Self {
            span: Some(span),
            ..self.clone()
        }
    }

    /// The trace identifier.
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// This context's span identifier.
    #[must_use]
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The parent span identifier, absent at the workflow root.
    #[must_use]
    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    /// The correlation ID linking this workflow to external log lines.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// The full baggage map.
    #[must_use]
    pub fn baggage(&self) -> &BTreeMap<String, String> {
        &self.baggage
    }

    /// Look up one baggage entry.
    #[must_use]
    pub fn baggage_get(&self, key: &str) -> Option<&str> {
        self.baggage.get(key).map(String::as_str)
    }

    /// Look up one metadata entry.
    #[must_use]
    pub fn metadata_get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// The shared workflow state.
    #[must_use]
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// The cancellation token governing this context.
    #[must_use]
    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record an attribute on the current span, if one is open.
    ///
    /// No-op outside instrumented execution.
    pub fn record_attribute(&self, key: impl Into<String>, value: impl Into<Value>) {
        if let Some(span) = &self.span {
            span.add_attribute(key, value);
        }
    }

    /// Record an event on the current span, if one is open.
    pub fn record_event(&self, name: impl Into<String>, attributes: HashMap<String, Value>) {
        if let Some(span) = &self.span {
            span.add_event(name, attributes);
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("trace_id", &self.trace_id)
            .field("span_id", &self.span_id)
            .field("parent_span_id", &self.parent_span_id)
            .field("correlation_id", &self.correlation_id)
            .field("baggage", &self.baggage.len())
            .finish()
    }
}
