//! Workflow entry point owning the root span.
//!
//! The caller owns the root [`ExecutionContext`]; the runner records the
//! root span around the outermost primitive so the collected spans of a
//! trace always form a single rooted tree (the root is the one span with no
//! parent, and every instrumented primitive hangs off it).

use crate::instrument::Instrumentation;
use std::time::Instant;
use weft_core::prelude::*;
use weft_core::span::SpanHandle;

/// Span type label used for workflow root spans.
const WORKFLOW_TYPE: &str = "workflow";

/// Executes workflows, recording the root span per invocation.
#[derive(Clone)]
pub struct WorkflowRunner {
    instrumentation: Instrumentation,
}

impl WorkflowRunner {
    /// Create a runner over an instrumentation layer.
    pub fn new(instrumentation: Instrumentation) -> Self {
        Self { instrumentation }
    }

    /// The underlying instrumentation layer.
    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    /// Execute a workflow under a fresh root context.
    ///
    /// Returns the result together with the trace ID so callers can look up
    /// the recorded spans.
    pub async fn run<P: Primitive>(
        &self,
        name: &str,
        workflow: &P,
        input: P::Input,
    ) -> (TraceId, Result<P::Output>) {
        let ctx = ExecutionContext::root();
        let trace_id = ctx.trace_id();
        let result = self.run_with_context(name, workflow, input, ctx).await;
        (trace_id, result)
    }

    /// Execute a workflow under a caller-owned root context.
    ///
    /// The context must be a root context (no parent span); nesting runner
    /// invocations inside primitives would record a second root in the same
    /// trace.
    pub async fn run_with_context<P: Primitive>(
        &self,
        name: &str,
        workflow: &P,
        input: P::Input,
        ctx: ExecutionContext,
    ) -> Result<P::Output> {
        let metrics = self.instrumentation.metrics();
        let sink = self.instrumentation.sink();

        let mut record = SpanRecord::start(name, WORKFLOW_TYPE, &ctx);
        record.add_attribute("primitive.type", WORKFLOW_TYPE);
        let handle = SpanHandle::new(record);
        let ctx = ctx.with_span(handle.clone());

        tracing::info!(
            trace_id = %ctx.trace_id(),
            correlation_id = %ctx.correlation_id(),
            workflow = %name,
            "workflow started"
        );

        let started = Instant::now();
        let result = workflow.execute(input, ctx.clone()).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(_) => {
                handle.finish_ok();
                metrics.record_success(WORKFLOW_TYPE, elapsed);
                tracing::info!(
                    trace_id = %ctx.trace_id(),
                    workflow = %name,
                    "workflow completed"
                );
            }
            Err(error) => {
                handle.finish_error(error.to_string());
                metrics.record_error(WORKFLOW_TYPE, elapsed);
                tracing::warn!(
                    trace_id = %ctx.trace_id(),
                    workflow = %name,
                    kind = %error.kind(),
                    error = %error,
                    "workflow failed"
                );
            }
        }

        sink.record(handle.into_record());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::WorkflowMetrics;
    use std::sync::Arc;
    use weft_core::span::BufferedSpanSink;

    fn runner() -> (WorkflowRunner, Arc<BufferedSpanSink>) {
        let sink = Arc::new(BufferedSpanSink::with_default_capacity());
        let layer = Instrumentation::new(Arc::new(WorkflowMetrics::new()), sink.clone());
        (WorkflowRunner::new(layer), sink)
    }

    #[tokio::test]
    async fn run_records_root_span() {
        let (runner, sink) = runner();
        let step = runner
            .instrumentation()
            .instrument(FnPrimitive::new("step", |input: i64, _| async move {
                Ok(input + 1)
            }));

        let (trace_id, result) = runner.run("bump", &step, 1).await;
        assert_eq!(result.unwrap(), 2);

        let spans = sink.by_trace(trace_id);
        assert_eq!(spans.len(), 2);
        validate_trace_tree(&spans).unwrap();

        let root = spans.iter().find(|s| s.is_root()).unwrap();
        assert_eq!(root.name, "bump");
        assert_eq!(root.primitive_type, "workflow");
        assert_eq!(root.status, SpanStatus::Ok);
    }

    #[tokio::test]
    async fn failed_workflow_root_span_is_error() {
        let (runner, sink) = runner();
        let step: crate::instrument::Instrumented<FnPrimitive<(), ()>> = runner
            .instrumentation()
            .instrument(FnPrimitive::new("boom", |_, _| async {
                Err(WeftError::permanent("boom", "bad input"))
            }));

        let (trace_id, result) = runner.run("doomed", &step, ()).await;
        assert!(result.is_err());

        let spans = sink.by_trace(trace_id);
        let root = spans.iter().find(|s| s.is_root()).unwrap();
        assert!(root.status.is_error());
    }
}
