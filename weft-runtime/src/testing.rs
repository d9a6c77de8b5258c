//! Probe primitives and assertions for testing workflows.
//!
//! These are deliberately tiny, deterministic primitives over `i64` used by
//! the runtime's own test suites and useful for workflow authors writing
//! their own.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weft_core::prelude::*;

/// Returns its input unchanged and counts invocations.
pub struct EchoPrimitive {
    name: String,
    calls: Arc<AtomicU32>,
}

impl EchoPrimitive {
    /// Create an echo probe.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of times the probe executed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Primitive for EchoPrimitive {
    type Input = i64;
    type Output = i64;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "leaf")
    }

    fn execute<'a>(&'a self, input: i64, _ctx: ExecutionContext) -> PrimitiveFuture<'a, i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(input) })
    }
}

/// Fails with `Transient` errors a fixed number of times, then echoes.
pub struct FlakyPrimitive {
    name: String,
    failures: u32,
    calls: Arc<AtomicU32>,
}

impl FlakyPrimitive {
    /// Create a probe that fails the first `failures` invocations.
    pub fn new(name: impl Into<String>, failures: u32) -> Self {
        Self {
            name: name.into(),
            failures,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of times the probe executed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Primitive for FlakyPrimitive {
    type Input = i64;
    type Output = i64;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "leaf")
    }

    fn execute<'a>(&'a self, input: i64, _ctx: ExecutionContext) -> PrimitiveFuture<'a, i64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let failures = self.failures;
        let name = self.name.clone();
        Box::pin(async move {
            if call <= failures {
                Err(WeftError::transient(&name, "not ready yet"))
            } else {
                Ok(input)
            }
        })
    }
}

/// Always fails with a configurable error kind.
pub struct FailingPrimitive {
    name: String,
    kind: ErrorKind,
    calls: Arc<AtomicU32>,
}

impl FailingPrimitive {
    /// Create a probe failing with `Transient` errors.
    pub fn transient(name: impl Into<String>) -> Self {
        Self::with_kind(name, ErrorKind::Transient)
    }

    /// Create a probe failing with `Permanent` errors.
    pub fn permanent(name: impl Into<String>) -> Self {
        Self::with_kind(name, ErrorKind::Permanent)
    }

    /// Create a probe failing with the given kind.
    pub fn with_kind(name: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of times the probe executed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Primitive for FailingPrimitive {
    type Input = i64;
    type Output = i64;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "leaf")
    }

    fn execute<'a>(&'a self, _input: i64, _ctx: ExecutionContext) -> PrimitiveFuture<'a, i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = self.name.clone();
        let kind = self.kind;
        Box::pin(async move {
            Err(match kind {
                ErrorKind::Transient => WeftError::transient(&name, "induced failure"),
                ErrorKind::Permanent => WeftError::permanent(&name, "induced failure"),
                ErrorKind::Timeout => WeftError::timeout(&name, 0),
                ErrorKind::CircuitOpen => WeftError::circuit_open(&name, None),
                ErrorKind::Cancelled => WeftError::cancelled(&name),
            })
        })
    }
}

/// Sleeps, then echoes its input.
pub struct SleepPrimitive {
    name: String,
    delay: Duration,
}

impl SleepPrimitive {
    /// Create a probe sleeping for `delay` per invocation.
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

impl Primitive for SleepPrimitive {
    type Input = i64;
    type Output = i64;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "leaf")
    }

    fn execute<'a>(&'a self, input: i64, _ctx: ExecutionContext) -> PrimitiveFuture<'a, i64> {
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(input)
        })
    }
}

/// Assert that the recorded spans form a single rooted tree.
///
/// Panics with the validation failure when they do not.
pub fn assert_single_trace_tree(spans: &[SpanRecord]) {
    if let Err(reason) = validate_trace_tree(spans) {
        panic!("span set is not a single rooted tree: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_counts_calls() {
        let echo = EchoPrimitive::new("echo");
        echo.execute(1, ExecutionContext::root()).await.unwrap();
        echo.execute(2, ExecutionContext::root()).await.unwrap();
        assert_eq!(echo.calls(), 2);
    }

    #[tokio::test]
    async fn flaky_recovers_after_failures() {
        let flaky = FlakyPrimitive::new("flaky", 2);
        assert!(flaky.execute(1, ExecutionContext::root()).await.is_err());
        assert!(flaky.execute(1, ExecutionContext::root()).await.is_err());
        assert_eq!(flaky.execute(1, ExecutionContext::root()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failing_produces_requested_kind() {
        let failing = FailingPrimitive::with_kind("down", ErrorKind::Timeout);
        let err = failing
            .execute(1, ExecutionContext::root())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(failing.calls(), 1);
    }
}
