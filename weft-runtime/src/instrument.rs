//! The instrumentation layer.
//!
//! [`Instrumentation::instrument`] wraps any primitive into an equivalent
//! primitive whose execution additionally derives a child context, records a
//! span, and updates metrics. Callers never construct spans manually;
//! composition operators receive already-instrumented children, which is how
//! every span in a workflow ends up parented to the span of the primitive
//! that invoked it — one connected tree per trace.

use crate::metrics::WorkflowMetrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use weft_core::prelude::*;
use weft_core::span::SpanHandle;

/// Factory wrapping primitives with span and metric instrumentation.
///
/// Holds the metrics registry and the span sink; both are shared by every
/// primitive it wraps.
#[derive(Clone)]
pub struct Instrumentation {
    metrics: Arc<WorkflowMetrics>,
    sink: Arc<dyn SpanSink>,
}

impl Instrumentation {
    /// Create an instrumentation layer over the given registry and sink.
    pub fn new(metrics: Arc<WorkflowMetrics>, sink: Arc<dyn SpanSink>) -> Self {
        Self { metrics, sink }
    }

    /// The metrics registry.
    pub fn metrics(&self) -> Arc<WorkflowMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The span sink.
    pub fn sink(&self) -> Arc<dyn SpanSink> {
        Arc::clone(&self.sink)
    }

    /// Wrap a primitive with instrumentation.
    pub fn instrument<P: Primitive>(&self, primitive: P) -> Instrumented<P> {
        Instrumented {
            inner: primitive,
            metrics: Arc::clone(&self.metrics),
            sink: Arc::clone(&self.sink),
        }
    }

    /// Wrap a primitive and box it for composition.
    pub fn wrap<P>(&self, primitive: P) -> BoxPrimitive<P::Input, P::Output>
    where
        P: Primitive + 'static,
    {
        Arc::new(self.instrument(primitive))
    }
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation").finish_non_exhaustive()
    }
}

/// A primitive wrapped with span and metric instrumentation.
pub struct Instrumented<P> {
    inner: P,
    metrics: Arc<WorkflowMetrics>,
    sink: Arc<dyn SpanSink>,
}

impl<P: Primitive> Primitive for Instrumented<P> {
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        self.inner.info()
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        Box::pin(async move {
            let info = self.inner.info();
            let child = ctx.child();

            let mut record = SpanRecord::start(&info.name, info.primitive_type, &child);
            record.add_attribute("primitive.type", info.primitive_type);
            if let Some(size) = input.size_hint() {
                record.add_attribute("input.size", size);
            }
            let handle = SpanHandle::new(record);
            let child = child.with_span(handle.clone());

            tracing::debug!(
                trace_id = %child.trace_id(),
                span_id = %child.span_id(),
                primitive = %info.name,
                "primitive started"
            );

            self.metrics.active_executions.inc();
            let started = Instant::now();

            let result = if child.is_cancelled() {
                Err(WeftError::cancelled(&info.name))
            } else {
                let cancel = child.cancel().clone();
                tokio::select! {
                    biased;
                    result = self.inner.execute(input, child.clone()) => result,
                    _ = cancel.cancelled() => Err(WeftError::cancelled(&info.name)),
                }
            };

            let elapsed = started.elapsed().as_secs_f64();
            self.metrics.active_executions.dec();

            match &result {
                Ok(output) => {
                    if let Some(size) = output.size_hint() {
                        handle.add_attribute("output.size", size);
                    }
                    handle.finish_ok();
                    self.metrics.record_success(info.primitive_type, elapsed);
                }
                Err(error) => {
                    let mut attrs = HashMap::new();
                    attrs.insert(
                        "exception.kind".to_string(),
                        error.kind().as_str().into(),
                    );
                    attrs.insert("exception.message".to_string(), error.to_string().into());
                    handle.add_event("exception", attrs);
                    handle.finish_error(error.to_string());
                    self.metrics.record_error(info.primitive_type, elapsed);
                    tracing::debug!(
                        trace_id = %child.trace_id(),
                        primitive = %info.name,
                        kind = %error.kind(),
                        error = %error,
                        "primitive failed"
                    );
                }
            }

            let record = handle.into_record();
            self.record_derived_metrics(&record);
            self.sink.record(record);

            result
        })
    }
}

impl<P: Primitive> Instrumented<P> {
    /// Derive counters from attributes the recovery/cache primitives left on
    /// their spans, so metric ownership stays inside the instrumentation
    /// layer.
    fn record_derived_metrics(&self, record: &SpanRecord) {
        if let Some(attempts) = record
            .attributes
            .get("retry.attempts")
            .and_then(serde_json::Value::as_u64)
        {
            if attempts > 1 {
                self.metrics
                    .record_retry_attempts(&record.primitive_type, attempts - 1);
            }
        }

        if let Some(hit) = record
            .attributes
            .get("cache.hit")
            .and_then(serde_json::Value::as_bool)
        {
            if hit {
                self.metrics.record_cache_hit(&record.name);
            } else {
                self.metrics.record_cache_miss(&record.name);
            }
        }

        for event in &record.events {
            if event.name == "breaker.transition" {
                if let Some(state) = event.attributes.get("to").and_then(|v| v.as_str()) {
                    self.metrics.record_breaker_transition(&record.name, state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::span::BufferedSpanSink;

    fn layer() -> (Instrumentation, Arc<BufferedSpanSink>, Arc<WorkflowMetrics>) {
        let metrics = Arc::new(WorkflowMetrics::new());
        let sink = Arc::new(BufferedSpanSink::with_default_capacity());
        (
            Instrumentation::new(Arc::clone(&metrics), sink.clone()),
            sink,
            metrics,
        )
    }

    #[tokio::test]
    async fn success_records_ok_span_and_counter() {
        let (layer, sink, metrics) = layer();
        let double = layer.instrument(FnPrimitive::new("double", |input: i64, _| async move {
            Ok(input * 2)
        }));

        let ctx = ExecutionContext::root();
        let out = double.execute(21, ctx.clone()).await.unwrap();
        assert_eq!(out, 42);

        let spans = sink.by_trace(ctx.trace_id());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "double");
        assert_eq!(spans[0].status, SpanStatus::Ok);
        assert_eq!(spans[0].parent_span_id, Some(ctx.span_id()));
        assert!(spans[0].duration_ms.is_some());
        assert!(metrics.encode().contains("result=\"success\""));
    }

    #[tokio::test]
    async fn failure_records_error_span_and_event() {
        let (layer, sink, metrics) = layer();
        let failing: Instrumented<FnPrimitive<i64, i64>> =
            layer.instrument(FnPrimitive::new("failing", |_, _| async {
                Err(WeftError::transient("failing", "unavailable"))
            }));

        let ctx = ExecutionContext::root();
        let err = failing.execute(1, ctx.clone()).await.unwrap_err();
        assert!(err.is_retriable());

        let spans = sink.by_trace(ctx.trace_id());
        assert_eq!(spans.len(), 1);
        assert!(spans[0].status.is_error());
        assert_eq!(spans[0].events.len(), 1);
        assert_eq!(spans[0].events[0].name, "exception");
        assert!(metrics.encode().contains("result=\"error\""));
    }

    #[tokio::test]
    async fn input_and_output_sizes_recorded() {
        let (layer, sink, _) = layer();
        let upper = layer.instrument(FnPrimitive::new("upper", |input: String, _| async move {
            Ok(input.to_uppercase())
        }));

        let ctx = ExecutionContext::root();
        upper.execute("hello".to_string(), ctx.clone()).await.unwrap();

        let spans = sink.by_trace(ctx.trace_id());
        assert_eq!(
            spans[0].attributes.get("input.size"),
            Some(&serde_json::Value::from(5))
        );
        assert_eq!(
            spans[0].attributes.get("output.size"),
            Some(&serde_json::Value::from(5))
        );
    }

    #[tokio::test]
    async fn pre_cancelled_context_skips_execution() {
        let (layer, sink, _) = layer();
        let never_runs: Instrumented<FnPrimitive<(), ()>> =
            layer.instrument(FnPrimitive::new("never_runs", |_: (), _| async {
                panic!("should not execute")
            }));

        let ctx = ExecutionContext::root();
        ctx.cancel().cancel();
        let err = never_runs.execute((), ctx.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let spans = sink.by_trace(ctx.trace_id());
        assert_eq!(spans.len(), 1);
        assert!(spans[0].status.is_error());
    }

    #[tokio::test]
    async fn cancellation_mid_flight_closes_span() {
        let (layer, sink, _) = layer();
        let slow = Arc::new(layer.instrument(FnPrimitive::new("slow", |_: (), _| async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(0i64)
        })));

        let ctx = ExecutionContext::root();
        let task = tokio::spawn({
            let slow = Arc::clone(&slow);
            let ctx = ctx.clone();
            async move { slow.execute((), ctx).await }
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        ctx.cancel().cancel();
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let spans = sink.by_trace(ctx.trace_id());
        assert_eq!(spans.len(), 1);
        assert!(spans[0].ended_at.is_some());
    }

    #[tokio::test]
    async fn nested_instrumented_primitives_link_spans() {
        let (layer, sink, _) = layer();
        let inner = layer.wrap(FnPrimitive::new("inner", |input: i64, _| async move {
            Ok(input + 1)
        }));

        // An outer primitive that invokes the (instrumented) inner one.
        let outer = layer.instrument(FnPrimitive::new("outer", move |input: i64, ctx| {
            let inner = Arc::clone(&inner);
            async move { inner.execute(input, ctx).await }
        }));

        let ctx = ExecutionContext::root();
        let out = outer.execute(1, ctx.clone()).await.unwrap();
        assert_eq!(out, 2);

        let spans = sink.by_trace(ctx.trace_id());
        assert_eq!(spans.len(), 2);
        let outer_span = spans.iter().find(|s| s.name == "outer").unwrap();
        let inner_span = spans.iter().find(|s| s.name == "inner").unwrap();
        assert_eq!(inner_span.parent_span_id, Some(outer_span.span_id));
        assert_eq!(outer_span.parent_span_id, Some(ctx.span_id()));
    }
}
