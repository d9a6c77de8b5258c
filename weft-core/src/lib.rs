//! WEFT Core Library
//!
//! Foundational types for the WEFT workflow-primitive runtime: the execution
//! context with W3C-compatible trace identifiers, the `Primitive` trait, span
//! records and sinks, the error taxonomy, and retry strategy configuration.
//!
//! # Overview
//!
//! WEFT executes a single logical workflow instance within one process.
//! Workflows are built by composing primitives — typed execution units with
//! one operation — and every execution automatically produces a connected
//! span tree plus metrics (the composition operators and the instrumentation
//! layer live in `weft-runtime`).
//!
//! # Key Components
//!
//! - **ExecutionContext**: immutable-with-copy context carrying trace/span
//!   identifiers, correlation ID, baggage, metadata, shared workflow state,
//!   and a cooperative cancellation token
//! - **Primitive**: the single trait every execution unit implements
//! - **Span**: instrumentation-owned records of each invocation, collected
//!   into pluggable sinks
//! - **WeftError**: the typed failure taxonomy recovery primitives act on

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod payload;
pub mod prelude;
pub mod primitive;
pub mod retry;
pub mod span;

// Re-export key types at crate root for convenience
pub use context::{ExecutionContext, SpanId, TraceId, WorkflowState};
pub use error::{ErrorKind, Result, WeftError};
pub use payload::Payload;
pub use primitive::{BoxPrimitive, FnPrimitive, Primitive, PrimitiveFuture, PrimitiveInfo};
pub use retry::RetryStrategy;
pub use span::{BufferedSpanSink, SpanRecord, SpanSink, SpanStatus};
