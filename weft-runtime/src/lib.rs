//! WEFT Runtime
//!
//! The instrumented workflow-primitive runtime: composition operators,
//! recovery primitives, the cache primitive, the instrumentation layer, and
//! the metric/trace exporters.
//!
//! # Overview
//!
//! Workflows are assembled from primitives (`weft-core`) wrapped by the
//! [`instrument::Instrumentation`] layer and executed through a
//! [`runner::WorkflowRunner`]. Every invocation records a span; spans of one
//! workflow form a single rooted tree under the runner's root span, and each
//! execution increments Prometheus counters and latency histograms.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use weft_core::prelude::*;
//! use weft_runtime::prelude::*;
//!
//! let metrics = Arc::new(WorkflowMetrics::new());
//! let sink = Arc::new(BufferedSpanSink::with_default_capacity());
//! let instr = Instrumentation::new(Arc::clone(&metrics), sink.clone());
//! let runner = WorkflowRunner::new(instr.clone());
//!
//! let fetch = instr.wrap(FnPrimitive::new("fetch", |id: i64, _| async move { Ok(id * 10) }));
//! let enrich = instr.wrap(FnPrimitive::new("enrich", |v: i64, _| async move { Ok(v + 1) }));
//! let pipeline = instr.instrument(Sequential::from_stages("pipeline", vec![fetch, enrich]));
//!
//! let (trace_id, result) = runner.run("ingest", &pipeline, 4).await;
//! assert_eq!(result.unwrap(), 41);
//! assert!(weft_core::span::validate_trace_tree(&sink.by_trace(trace_id)).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod compose;
pub mod exporter;
pub mod instrument;
pub mod metrics;
pub mod observability;
pub mod prelude;
pub mod recovery;
pub mod runner;
pub mod testing;

// Re-export key types at crate root for convenience
pub use cache::Cache;
pub use compose::{Aggregate, Parallel, Router, Sequential};
pub use instrument::{Instrumentation, Instrumented};
pub use metrics::WorkflowMetrics;
pub use recovery::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Compensated, Fallback, Retry, Timeout,
};
pub use runner::WorkflowRunner;
