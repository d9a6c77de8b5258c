//! Convenience re-exports for primitive authors.

pub use crate::context::{ExecutionContext, SpanId, TraceId, WorkflowState};
pub use crate::error::{ErrorKind, Result, WeftError};
pub use crate::payload::Payload;
pub use crate::primitive::{
    BoxPrimitive, FnPrimitive, Primitive, PrimitiveFuture, PrimitiveInfo,
};
pub use crate::retry::RetryStrategy;
pub use crate::span::{
    validate_trace_tree, BufferedSpanSink, SpanRecord, SpanSink, SpanStatus,
};
