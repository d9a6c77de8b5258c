//! OTLP span export.
//!
//! Converts finished [`SpanRecord`]s into OpenTelemetry spans, preserving
//! the exact `trace_id`/`span_id`/`parent_span_id` triple so Jaeger-style
//! backends reconstruct the same span tree the buffered sink sees.

use anyhow::{Context as AnyhowContext, Result};
use opentelemetry::trace::{
    Event, Span, SpanBuilder, SpanContext, SpanKind, Status, TraceContextExt, TraceFlags,
    TraceState, Tracer, TracerProvider,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use std::time::SystemTime;
use weft_core::span::{SpanRecord, SpanSink, SpanStatus};

/// Span sink backed by an OTLP exporter.
///
/// Must be constructed inside a tokio runtime: the batch exporter spawns a
/// background task on it.
pub struct OtlpSpanSink {
    provider: SdkTracerProvider,
    tracer: opentelemetry_sdk::trace::Tracer,
}

impl OtlpSpanSink {
    /// Create a sink exporting to the given OTLP endpoint.
    pub fn new(endpoint: impl Into<String>, service_name: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let service_name = service_name.into();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .context("failed to create OTLP exporter")?;

        let resource = Resource::new(vec![
            KeyValue::new("service.name", service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ]);

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource)
            .build();

        let tracer = provider.tracer(service_name);

        Ok(Self { provider, tracer })
    }

    /// Flush pending spans and shut the exporter down.
    pub fn shutdown(&self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "OTLP provider shutdown failed");
        }
    }
}

impl SpanSink for OtlpSpanSink {
    fn record(&self, span: SpanRecord) {
        let trace_id = opentelemetry::trace::TraceId::from_bytes(span.trace_id.as_bytes());
        let span_id = opentelemetry::trace::SpanId::from_bytes(span.span_id.as_bytes());

        let parent_cx = match span.parent_span_id {
            Some(parent) => Context::new().with_remote_span_context(SpanContext::new(
                trace_id,
                opentelemetry::trace::SpanId::from_bytes(parent.as_bytes()),
                TraceFlags::SAMPLED,
                false,
                TraceState::default(),
            )),
            None => Context::new(),
        };

        let mut attributes: Vec<KeyValue> = span
            .attributes
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), json_to_otel(value)))
            .collect();
        attributes.push(KeyValue::new(
            "correlation_id",
            span.correlation_id.clone(),
        ));

        let events: Vec<Event> = span
            .events
            .iter()
            .map(|event| {
                Event::new(
                    event.name.clone(),
                    SystemTime::from(event.timestamp),
                    event
                        .attributes
                        .iter()
                        .map(|(key, value)| KeyValue::new(key.clone(), json_to_otel(value)))
                        .collect(),
                    0,
                )
            })
            .collect();

        let started_at = SystemTime::from(span.started_at);
        let ended_at = span
            .ended_at
            .map(SystemTime::from)
            .unwrap_or_else(SystemTime::now);

        let mut builder = SpanBuilder::from_name(span.name.clone());
        builder.trace_id = Some(trace_id);
        builder.span_id = Some(span_id);
        builder.span_kind = Some(SpanKind::Internal);
        builder.start_time = Some(started_at);
        builder.attributes = Some(attributes);
        builder.events = Some(events);
        builder.status = match &span.status {
            SpanStatus::Ok => Status::Ok,
            SpanStatus::Error { message } => Status::error(message.clone()),
            SpanStatus::Unset => Status::Unset,
        };

        let mut otel_span = self.tracer.build_with_context(builder, &parent_cx);
        otel_span.end_with_timestamp(ended_at);
    }

    fn len(&self) -> usize {
        // Spans are handed straight to the exporter, nothing is retained.
        0
    }
}

/// Convert a JSON attribute value into an OpenTelemetry value.
fn json_to_otel(value: &serde_json::Value) -> opentelemetry::Value {
    match value {
        serde_json::Value::Bool(b) => opentelemetry::Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                opentelemetry::Value::I64(i)
            } else {
                opentelemetry::Value::F64(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => opentelemetry::Value::from(s.clone()),
        other => opentelemetry::Value::from(other.to_string()),
    }
}

/// Flush and shut down the process-global tracer provider, if one was
/// installed by the observability layer.
pub fn shutdown_otlp() {
    opentelemetry::global::shutdown_tracer_provider();
}
