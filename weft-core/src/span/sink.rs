//! Destinations for finished span records.

use super::record::SpanRecord;
use crate::context::TraceId;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default capacity of the buffered sink's ring buffer.
pub const DEFAULT_SPAN_CAPACITY: usize = 10_000;

/// A destination for finished span records.
pub trait SpanSink: Send + Sync {
    /// Record a finished span.
    fn record(&self, span: SpanRecord);

    /// Number of spans currently retained by the sink.
    ///
    /// Exporter-backed sinks that do not retain spans report zero.
    fn len(&self) -> usize;

    /// Check if the sink retains no spans.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe span sink with a bounded ring buffer.
///
/// Retains the most recent spans for inspection; the primary sink for tests
/// and for in-process trace queries.
pub struct BufferedSpanSink {
    buffer: RwLock<VecDeque<SpanRecord>>,
    capacity: usize,
}

impl BufferedSpanSink {
    /// Create a sink with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Create a sink with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_SPAN_CAPACITY)
    }

    /// All spans belonging to one trace, in recording order.
    #[must_use]
    pub fn by_trace(&self, trace_id: TraceId) -> Vec<SpanRecord> {
        self.buffer
            .read()
            .iter()
            .filter(|s| s.trace_id == trace_id)
            .cloned()
            .collect()
    }

    /// The most recent `limit` spans, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<SpanRecord> {
        self.buffer.read().iter().rev().take(limit).cloned().collect()
    }

    /// A copy of every retained span, in recording order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SpanRecord> {
        self.buffer.read().iter().cloned().collect()
    }

    /// Remove and return every retained span.
    pub fn drain(&self) -> Vec<SpanRecord> {
        self.buffer.write().drain(..).collect()
    }
}

impl SpanSink for BufferedSpanSink {
    fn record(&self, span: SpanRecord) {
        let mut buffer = self.buffer.write();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(span);
    }

    fn len(&self) -> usize {
        self.buffer.read().len()
    }
}

/// Sink that discards every span.
pub struct NullSink;

impl SpanSink for NullSink {
    fn record(&self, _span: SpanRecord) {}

    fn len(&self) -> usize {
        0
    }
}

/// Sink that fans every span out to multiple sinks.
pub struct MultiSink {
    sinks: Vec<Arc<dyn SpanSink>>,
}

impl MultiSink {
    /// Create a fan-out over the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn SpanSink>>) -> Self {
        Self { sinks }
    }
}

impl SpanSink for MultiSink {
    fn record(&self, span: SpanRecord) {
        for sink in &self.sinks {
            sink.record(span.clone());
        }
    }

    fn len(&self) -> usize {
        self.sinks.iter().map(|s| s.len()).sum()
    }
}
