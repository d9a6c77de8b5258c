//! Logging and tracing setup.
//!
//! - Structured logging via `tracing` with JSON, pretty, or compact output
//! - Optional OpenTelemetry layer (requires the `otel` feature) so log spans
//!   export alongside the primitive span records
//!
//! # Configuration
//!
//! Log format is controlled via the `WEFT_LOG_FORMAT` env var:
//! - `json` - Structured JSON output (for ELK/Loki)
//! - `pretty` - Human-readable colored output (default for TTY)
//! - `compact` - Compact single-line format (default for non-TTY)
//!
//! OpenTelemetry is controlled via:
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint (e.g. http://localhost:4317)
//! - `OTEL_SERVICE_NAME` - Service name (defaults to "weft")
//! - `OTEL_ENABLED` - Set to "true" to enable (disabled by default)
//!
//! # Example
//!
//! ```ignore
//! use weft_runtime::observability::{init_tracing, TracingConfig};
//!
//! let _guard = init_tracing(TracingConfig::from_env())?;
//! // ... run workflows ...
//! // Guard drop flushes OpenTelemetry if it was enabled.
//! ```

mod config;
#[cfg(feature = "otel")]
mod otel;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{init_tracing, TracingGuard};

#[cfg(feature = "otel")]
pub use otel::init_otel_layer;
