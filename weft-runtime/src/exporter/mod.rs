//! External sinks for metrics and traces.
//!
//! - [`MetricsServer`]: a pull-based HTTP endpoint serving the Prometheus
//!   text exposition format on `/metrics`.
//! - `OtlpSpanSink` (behind the `otel` feature): pushes finished span
//!   records to an OTLP collector, preserving the
//!   `trace_id`/`span_id`/`parent_span_id` triple so external backends
//!   reconstruct the workflow's span tree.

mod server;

pub use server::{MetricsServer, ServerConfig};

#[cfg(feature = "otel")]
mod otlp;

#[cfg(feature = "otel")]
pub use otlp::{shutdown_otlp, OtlpSpanSink};
