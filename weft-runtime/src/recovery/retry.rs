//! Bounded re-execution with exponential backoff.

use std::collections::HashMap;
use weft_core::prelude::*;

/// Re-invokes the wrapped primitive while its errors are retryable.
///
/// At most `max_retries + 1` invocations occur. Between attempts the wrapper
/// sleeps the strategy's backoff delay (or the error's own `retry_after`
/// hint when the producer supplied one). The consumed attempt count is
/// recorded as the `retry.attempts` span attribute; on exhaustion the last
/// error is returned unchanged.
pub struct Retry<P> {
    inner: P,
    strategy: RetryStrategy,
}

impl<P: Primitive> Retry<P> {
    /// Wrap a primitive with a retry strategy.
    pub fn new(inner: P, strategy: RetryStrategy) -> Self {
        Self { inner, strategy }
    }
}

impl<P> Primitive for Retry<P>
where
    P: Primitive,
    P::Input: Clone,
{
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(format!("retry:{}", self.inner.info().name), "retry")
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        Box::pin(async move {
            let name = self.info().name;
            let max_attempts = self.strategy.max_retries.saturating_add(1);
            let mut attempt: u32 = 0;

            loop {
                attempt += 1;

                match self.inner.execute(input.clone(), ctx.clone()).await {
                    Ok(output) => {
                        ctx.record_attribute("retry.attempts", attempt);
                        return Ok(output);
                    }
                    Err(error) => {
                        if attempt >= max_attempts || !self.strategy.should_retry(&error) {
                            ctx.record_attribute("retry.attempts", attempt);
                            return Err(error);
                        }

                        let delay = error
                            .retry_after()
                            .unwrap_or_else(|| self.strategy.delay_for_attempt(attempt));

                        let mut attrs = HashMap::new();
                        attrs.insert("attempt".to_string(), attempt.into());
                        attrs.insert(
                            "delay_ms".to_string(),
                            (delay.as_millis() as u64).into(),
                        );
                        attrs.insert("error".to_string(), error.to_string().into());
                        ctx.record_event("retrying", attrs);

                        tracing::debug!(
                            primitive = %name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after failure"
                        );

                        tokio::time::sleep(delay).await;

                        if ctx.is_cancelled() {
                            ctx.record_attribute("retry.attempts", attempt);
                            return Err(WeftError::cancelled(&name));
                        }
                    }
                }
            }
        })
    }
}
