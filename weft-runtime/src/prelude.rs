//! Convenience re-exports for workflow authors.

pub use crate::cache::Cache;
pub use crate::compose::{Aggregate, BranchResults, Parallel, Router, Sequential};
pub use crate::exporter::{MetricsServer, ServerConfig};
pub use crate::instrument::{Instrumentation, Instrumented};
pub use crate::metrics::WorkflowMetrics;
pub use crate::observability::{init_tracing, LogFormat, TracingConfig};
pub use crate::recovery::{
    BreakerCore, CircuitBreaker, CircuitBreakerConfig, CircuitState, Compensated, Fallback, Retry,
    Timeout,
};
pub use crate::runner::WorkflowRunner;
