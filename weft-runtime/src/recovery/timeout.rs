//! Deadline enforcement for a wrapped primitive.

use std::time::Duration;
use weft_core::prelude::*;

/// Default window granted for the wrapped primitive to observe cancellation.
const DEFAULT_GRACE: Duration = Duration::from_millis(250);

/// Races the wrapped primitive against a deadline.
///
/// On expiry the wrapper cancels the child cancellation scope, waits a short
/// grace period so the wrapped primitive can observe the cancellation at its
/// own suspension points (and close its spans), then returns a `Timeout`
/// error. Cancellation is advisory, not preemptive; a primitive that never
/// suspends is dropped once the grace period lapses. The wrapper never
/// retries.
pub struct Timeout<P> {
    inner: P,
    duration: Duration,
    grace: Duration,
}

impl<P: Primitive> Timeout<P> {
    /// Wrap a primitive with a deadline.
    pub fn new(inner: P, duration: Duration) -> Self {
        Self {
            inner,
            duration,
            grace: DEFAULT_GRACE,
        }
    }

    /// Set the cancellation grace window.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl<P: Primitive> Primitive for Timeout<P> {
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(format!("timeout:{}", self.inner.info().name), "timeout")
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        Box::pin(async move {
            let name = self.info().name;
            ctx.record_attribute("timeout.budget_ms", self.duration.as_millis() as u64);

            let scope = ctx.cancel().child_token();
            let inner_ctx = ctx.with_cancel(scope.clone());

            let fut = self.inner.execute(input, inner_ctx);
            tokio::pin!(fut);

            let deadline = tokio::time::sleep(self.duration);
            tokio::pin!(deadline);

            tokio::select! {
                biased;
                result = &mut fut => result,
                _ = &mut deadline => {
                    scope.cancel();
                    // Let the wrapped primitive observe cancellation so its
                    // spans close; its outcome no longer matters.
                    let _ = tokio::time::timeout(self.grace, &mut fut).await;
                    tracing::debug!(primitive = %name, budget_ms = self.duration.as_millis() as u64, "deadline exceeded");
                    Err(WeftError::timeout(&name, self.duration.as_millis() as u64))
                }
            }
        })
    }
}
