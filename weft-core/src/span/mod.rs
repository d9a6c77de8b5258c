//! Span records and sinks for workflow instrumentation.
//!
//! A [`SpanRecord`] is the timed, attributed record of one primitive
//! invocation, linked to its parent through `parent_span_id`. Records are
//! owned by the instrumentation layer: primitive authors never construct
//! them. Finished records flow into a [`SpanSink`] — a bounded in-memory
//! buffer by default, or an exporter-backed sink in production.

mod record;
mod sink;

pub use record::{
    validate_trace_tree, SpanEvent, SpanHandle, SpanRecord, SpanStatus,
};
pub use sink::{BufferedSpanSink, MultiSink, NullSink, SpanSink, DEFAULT_SPAN_CAPACITY};
