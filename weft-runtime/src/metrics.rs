//! Prometheus metrics for WEFT.
//!
//! # Metrics
//!
//! ## Counters
//! - `weft_executions_total` - Primitive executions by type and result
//! - `weft_retry_attempts_total` - Retry attempts consumed, by primitive type
//! - `weft_cache_events_total` - Cache hits and misses, by primitive name
//! - `weft_breaker_transitions_total` - Circuit breaker state transitions
//!
//! ## Gauges
//! - `weft_active_executions` - Primitives currently executing
//!
//! ## Histograms
//! - `weft_execution_duration_seconds` - Execution latency by primitive type

use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Default histogram buckets for execution latency (in seconds).
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// WEFT metrics registry.
///
/// Explicitly constructed and handed to the instrumentation layer; nothing
/// inside a primitive reaches for it implicitly.
pub struct WorkflowMetrics {
    /// The Prometheus registry.
    registry: Registry,

    /// Total executions by primitive type and result.
    pub executions: CounterVec,
    /// Retry attempts consumed by primitive type.
    pub retry_attempts: CounterVec,
    /// Cache hits and misses by primitive name.
    pub cache_events: CounterVec,
    /// Circuit breaker transitions by primitive name and target state.
    pub breaker_transitions: CounterVec,
    /// Primitives currently executing.
    pub active_executions: IntGauge,
    /// Execution latency histogram by primitive type.
    pub duration: HistogramVec,
}

impl WorkflowMetrics {
    /// Create a new metrics registry with all WEFT metrics.
    pub fn new() -> Self {
        let registry = Registry::new();

        let executions = CounterVec::new(
            Opts::new("executions_total", "Total primitive executions")
                .namespace("weft")
                .const_label("service", "runtime"),
            &["primitive_type", "result"],
        )
        .expect("metric creation should not fail");

        let retry_attempts = CounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts consumed")
                .namespace("weft")
                .const_label("service", "runtime"),
            &["primitive_type"],
        )
        .expect("metric creation should not fail");

        let cache_events = CounterVec::new(
            Opts::new("cache_events_total", "Cache hits and misses")
                .namespace("weft")
                .const_label("service", "runtime"),
            &["primitive", "event"],
        )
        .expect("metric creation should not fail");

        let breaker_transitions = CounterVec::new(
            Opts::new(
                "breaker_transitions_total",
                "Circuit breaker state transitions",
            )
            .namespace("weft")
            .const_label("service", "runtime"),
            &["primitive", "state"],
        )
        .expect("metric creation should not fail");

        let active_executions = IntGauge::with_opts(
            Opts::new("active_executions", "Primitives currently executing")
                .namespace("weft")
                .const_label("service", "runtime"),
        )
        .expect("metric creation should not fail");

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "execution_duration_seconds",
                "Primitive execution latency in seconds",
            )
            .namespace("weft")
            .const_label("service", "runtime")
            .buckets(DURATION_BUCKETS.to_vec()),
            &["primitive_type"],
        )
        .expect("metric creation should not fail");

        registry
            .register(Box::new(executions.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(retry_attempts.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(cache_events.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(breaker_transitions.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(active_executions.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(duration.clone()))
            .expect("registration should not fail");

        Self {
            registry,
            executions,
            retry_attempts,
            cache_events,
            breaker_transitions,
            active_executions,
            duration,
        }
    }

    /// Get the Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a successful execution.
    pub fn record_success(&self, primitive_type: &str, duration_secs: f64) {
        self.executions
            .with_label_values(&[primitive_type, "success"])
            .inc();
        self.duration
            .with_label_values(&[primitive_type])
            .observe(duration_secs);
    }

    /// Record a failed execution.
    pub fn record_error(&self, primitive_type: &str, duration_secs: f64) {
        self.executions
            .with_label_values(&[primitive_type, "error"])
            .inc();
        self.duration
            .with_label_values(&[primitive_type])
            .observe(duration_secs);
    }

    /// Record retry attempts consumed by one invocation.
    pub fn record_retry_attempts(&self, primitive_type: &str, attempts: u64) {
        self.retry_attempts
            .with_label_values(&[primitive_type])
            .inc_by(attempts as f64);
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self, primitive: &str) {
        self.cache_events
            .with_label_values(&[primitive, "hit"])
            .inc();
    }

    /// Record a cache miss.
    pub fn record_cache_miss(&self, primitive: &str) {
        self.cache_events
            .with_label_values(&[primitive, "miss"])
            .inc();
    }

    /// Record a circuit breaker transition into `state`.
    pub fn record_breaker_transition(&self, primitive: &str, state: &str) {
        self.breaker_transitions
            .with_label_values(&[primitive, state])
            .inc();
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .expect("encoding should not fail");

        String::from_utf8(buffer).expect("metrics should be valid UTF-8")
    }
}

impl Default for WorkflowMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Global metrics instance for the outermost wiring point.
///
/// Primitives never touch this; it exists so an application can construct
/// the registry once and share it between the instrumentation layer and the
/// metrics server.
static GLOBAL_METRICS: std::sync::OnceLock<Arc<WorkflowMetrics>> = std::sync::OnceLock::new();

/// Initialize (or fetch) the process-wide metrics instance.
pub fn init_global_metrics() -> Arc<WorkflowMetrics> {
    GLOBAL_METRICS
        .get_or_init(|| Arc::new(WorkflowMetrics::new()))
        .clone()
}

/// Try to get the global metrics instance, returning None if not initialized.
pub fn try_global_metrics() -> Option<Arc<WorkflowMetrics>> {
    GLOBAL_METRICS.get().cloned()
}
