//! Shared helpers for the runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use weft_core::prelude::*;
use weft_core::span::BufferedSpanSink;
use weft_runtime::prelude::*;

/// Everything the integration tests need to run instrumented workflows.
pub struct TestRuntime {
    pub instr: Instrumentation,
    pub runner: WorkflowRunner,
    pub sink: Arc<BufferedSpanSink>,
    pub metrics: Arc<WorkflowMetrics>,
}

pub fn runtime() -> TestRuntime {
    let metrics = Arc::new(WorkflowMetrics::new());
    let sink = Arc::new(BufferedSpanSink::with_default_capacity());
    let instr = Instrumentation::new(Arc::clone(&metrics), sink.clone());
    let runner = WorkflowRunner::new(instr.clone());
    TestRuntime {
        instr,
        runner,
        sink,
        metrics,
    }
}

/// Instrumented leaf that adds a constant.
pub fn add(instr: &Instrumentation, name: &str, amount: i64) -> BoxPrimitive<i64, i64> {
    instr.wrap(FnPrimitive::new(name, move |input: i64, _| async move {
        Ok(input + amount)
    }))
}

/// Instrumented leaf that sleeps then returns a constant.
pub fn delayed(
    instr: &Instrumentation,
    name: &str,
    delay_ms: u64,
    value: i64,
) -> BoxPrimitive<i64, i64> {
    instr.wrap(FnPrimitive::new(name, move |_: i64, _| async move {
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        Ok(value)
    }))
}

/// Instrumented leaf that always fails with a transient error.
pub fn always_fails(instr: &Instrumentation, name: &'static str) -> BoxPrimitive<i64, i64> {
    instr.wrap(FnPrimitive::new(name, move |_: i64, _| async move {
        Err(WeftError::transient(name, "induced failure"))
    }))
}

/// Instrumented leaf that returns a constant.
pub fn returns(instr: &Instrumentation, name: &str, value: i64) -> BoxPrimitive<i64, i64> {
    instr.wrap(FnPrimitive::new(name, move |_: i64, _| async move {
        Ok(value)
    }))
}

/// The span with the given name, panicking when absent or ambiguous.
pub fn span_named(spans: &[SpanRecord], name: &str) -> SpanRecord {
    let matches: Vec<&SpanRecord> = spans.iter().filter(|s| s.name == name).collect();
    assert_eq!(matches.len(), 1, "expected exactly one span named '{name}'");
    matches[0].clone()
}

/// All spans with the given name.
pub fn spans_named(spans: &[SpanRecord], name: &str) -> Vec<SpanRecord> {
    spans.iter().filter(|s| s.name == name).cloned().collect()
}
