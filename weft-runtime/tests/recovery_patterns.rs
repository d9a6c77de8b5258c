//! Integration tests for retry, timeout, fallback, and circuit breaker.

mod common;

use common::{returns, runtime, span_named};
use std::sync::Arc;
use std::time::Duration;
use weft_core::prelude::*;
use weft_runtime::prelude::*;
use weft_runtime::testing::{assert_single_trace_tree, FailingPrimitive, FlakyPrimitive};

fn fast_strategy(max_retries: u32) -> RetryStrategy {
    RetryStrategy::new(max_retries)
        .with_backoff_base(Duration::from_millis(1))
        .with_jitter(false)
}

#[tokio::test]
async fn retry_bound_is_max_retries_plus_one() {
    let rt = runtime();

    let probe = Arc::new(FailingPrimitive::transient("down"));
    let retried = rt.instr.instrument(Retry::new(
        rt.instr.wrap(Arc::clone(&probe)),
        fast_strategy(3),
    ));

    let (_, result) = rt.runner.run("bounded", &retried, 0).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(probe.calls(), 4); // exactly max_retries + 1
}

#[tokio::test]
async fn retry_gives_up_immediately_on_permanent_errors() {
    let rt = runtime();

    let probe = Arc::new(FailingPrimitive::permanent("strict"));
    let retried = rt.instr.instrument(Retry::new(
        rt.instr.wrap(Arc::clone(&probe)),
        fast_strategy(5),
    ));

    let (_, result) = rt.runner.run("no_retry", &retried, 0).await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Permanent);
    assert_eq!(probe.calls(), 1);
}

#[tokio::test]
async fn retry_returns_the_last_error() {
    let rt = runtime();

    let retried = rt.instr.instrument(Retry::new(
        common::always_fails(&rt.instr, "flappy"),
        fast_strategy(2),
    ));

    let (_, result) = rt.runner.run("exhausted", &retried, 0).await;
    let err = result.unwrap_err();
    assert_eq!(err.primitive(), "flappy");
}

#[tokio::test]
async fn timeout_bounds_a_slow_primitive() {
    let rt = runtime();

    let slow = rt
        .instr
        .wrap(weft_runtime::testing::SleepPrimitive::new(
            "glacial",
            Duration::from_secs(30),
        ));
    let guarded = rt.instr.instrument(
        Timeout::new(slow, Duration::from_millis(30)).with_grace(Duration::from_millis(50)),
    );

    let started = std::time::Instant::now();
    let (trace_id, result) = rt.runner.run("deadline", &guarded, 0).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));

    // Every recorded span closed despite the expiry, and the wrapped
    // primitive's span reports its cancellation.
    let spans = rt.sink.by_trace(trace_id);
    assert_single_trace_tree(&spans);
    assert!(spans.iter().all(|s| s.ended_at.is_some()));
    let inner = span_named(&spans, "glacial");
    assert!(inner.status.is_error());
}

#[tokio::test]
async fn timeout_leaves_fast_primitives_alone() {
    let rt = runtime();

    let quick = returns(&rt.instr, "quick", 9);
    let guarded = rt
        .instr
        .instrument(Timeout::new(quick, Duration::from_secs(5)));

    let (_, result) = rt.runner.run("plenty", &guarded, 0).await;
    assert_eq!(result.unwrap(), 9);
}

#[tokio::test]
async fn fallback_substitutes_on_failure() {
    // Fallback([always_fails, returns(42)]) succeeds with 42 and records
    // two sibling spans, error then ok.
    let rt = runtime();

    let fallback = rt.instr.instrument(Fallback::from_alternatives(
        "lookup",
        vec![
            common::always_fails(&rt.instr, "always_fails"),
            returns(&rt.instr, "constant", 42),
        ],
    ));

    let (trace_id, result) = rt.runner.run("fallback", &fallback, 0).await;
    assert_eq!(result.unwrap(), 42);

    let spans = rt.sink.by_trace(trace_id);
    assert_single_trace_tree(&spans);

    let fallback_span = span_named(&spans, "lookup");
    let failed = span_named(&spans, "always_fails");
    let succeeded = span_named(&spans, "constant");

    assert!(failed.status.is_error());
    assert_eq!(succeeded.status, SpanStatus::Ok);
    assert_eq!(failed.parent_span_id, Some(fallback_span.span_id));
    assert_eq!(succeeded.parent_span_id, Some(fallback_span.span_id));
    assert_eq!(
        fallback_span.attributes.get("fallback.attempts"),
        Some(&serde_json::Value::from(2))
    );
}

#[tokio::test]
async fn breaker_rejects_after_threshold_without_invoking() {
    let rt = runtime();

    let probe = Arc::new(FailingPrimitive::transient("dependency"));
    let guarded = rt.instr.instrument(CircuitBreaker::new(
        rt.instr.wrap(Arc::clone(&probe)),
        CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(600),
        },
    ));

    let ctx = ExecutionContext::root();
    assert!(guarded.execute(0, ctx.clone()).await.is_err());
    assert!(guarded.execute(0, ctx.clone()).await.is_err());
    assert_eq!(probe.calls(), 2);

    let err = guarded.execute(0, ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    assert!(err.retry_after().is_some());
    assert_eq!(probe.calls(), 2); // rejected call never reached the probe
}

#[tokio::test]
async fn breaker_admits_one_trial_after_recovery() {
    let rt = runtime();

    let probe = Arc::new(FlakyPrimitive::new("recovering", 1));
    let guarded = rt.instr.instrument(CircuitBreaker::new(
        rt.instr.wrap(Arc::clone(&probe)),
        CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::ZERO,
        },
    ));

    let ctx = ExecutionContext::root();
    assert!(guarded.execute(7, ctx.clone()).await.is_err());

    // Recovery timeout elapsed: the next call is the single half-open
    // trial; it succeeds and closes the circuit.
    let out = guarded.execute(7, ctx.clone()).await.unwrap();
    assert_eq!(out, 7);
    assert_eq!(probe.calls(), 2);

    let out = guarded.execute(7, ctx).await.unwrap();
    assert_eq!(out, 7);
}

#[tokio::test]
async fn breaker_transition_recorded_in_metrics() {
    let rt = runtime();

    let guarded = rt.instr.instrument(CircuitBreaker::new(
        common::always_fails(&rt.instr, "flaky_dep"),
        CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(600),
        },
    ));

    let (_, result) = rt.runner.run("trip", &guarded, 0).await;
    assert!(result.is_err());

    let encoded = rt.metrics.encode();
    assert!(encoded.contains("weft_breaker_transitions_total"));
    assert!(encoded.contains("state=\"open\""));
}

#[tokio::test]
async fn unhandled_kinds_pass_through_recovery_wrappers() {
    let rt = runtime();

    // A timeout error must pass through Fallback untouched.
    let timeout_probe = Arc::new(FailingPrimitive::with_kind("hard_down", ErrorKind::Timeout));
    let secondary = Arc::new(FailingPrimitive::transient("secondary"));

    let fallback = rt.instr.instrument(Fallback::from_alternatives(
        "strict_lookup",
        vec![
            rt.instr.wrap(Arc::clone(&timeout_probe)),
            rt.instr.wrap(Arc::clone(&secondary)),
        ],
    ));

    let (_, result) = rt.runner.run("passthrough", &fallback, 0).await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Timeout);
    assert_eq!(secondary.calls(), 0);
}
