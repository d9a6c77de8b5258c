//! Ordered alternatives: substitute on failure.

use weft_core::prelude::*;

/// Tries alternatives in order until one succeeds.
///
/// Only `Transient` and `Permanent` failures advance to the next
/// alternative; `Timeout`, `CircuitOpen`, and `Cancelled` propagate
/// unchanged, per the unhandled-kind rule. Each attempt is a sibling span
/// under the fallback's own span, and the attempt count lands in the
/// `fallback.attempts` span attribute. When every alternative fails, the
/// last error is returned.
pub struct Fallback<I, O> {
    name: String,
    alternatives: Vec<BoxPrimitive<I, O>>,
}

impl<I, O> Fallback<I, O>
where
    I: Payload + Clone,
    O: Payload,
{
    /// Create an empty fallback chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alternatives: Vec::new(),
        }
    }

    /// Create a chain from existing alternatives.
    pub fn from_alternatives(
        name: impl Into<String>,
        alternatives: Vec<BoxPrimitive<I, O>>,
    ) -> Self {
        Self {
            name: name.into(),
            alternatives,
        }
    }

    /// Append an alternative.
    #[must_use]
    pub fn alternative(mut self, alternative: BoxPrimitive<I, O>) -> Self {
        self.alternatives.push(alternative);
        self
    }
}

impl<I, O> Primitive for Fallback<I, O>
where
    I: Payload + Clone,
    O: Payload,
{
    type Input = I;
    type Output = O;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "fallback")
    }

    fn execute<'a>(&'a self, input: I, ctx: ExecutionContext) -> PrimitiveFuture<'a, O> {
        Box::pin(async move {
            let mut last_error: Option<WeftError> = None;

            for (index, alternative) in self.alternatives.iter().enumerate() {
                match alternative.execute(input.clone(), ctx.clone()).await {
                    Ok(output) => {
                        ctx.record_attribute("fallback.attempts", index + 1);
                        return Ok(output);
                    }
                    Err(error) => match error.kind() {
                        ErrorKind::Transient | ErrorKind::Permanent => {
                            tracing::debug!(
                                fallback = %self.name,
                                alternative = index,
                                error = %error,
                                "alternative failed, trying next"
                            );
                            last_error = Some(error);
                        }
                        _ => {
                            ctx.record_attribute("fallback.attempts", index + 1);
                            return Err(error);
                        }
                    },
                }
            }

            ctx.record_attribute("fallback.attempts", self.alternatives.len());
            Err(last_error
                .unwrap_or_else(|| WeftError::permanent(&self.name, "no alternatives configured")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn always_fails(name: &'static str) -> BoxPrimitive<i64, i64> {
        Arc::new(FnPrimitive::new(name, move |_: i64, _| async move {
            Err(WeftError::transient(name, "down"))
        }))
    }

    fn returns(name: &str, value: i64) -> BoxPrimitive<i64, i64> {
        Arc::new(FnPrimitive::new(name, move |_: i64, _| async move {
            Ok(value)
        }))
    }

    #[tokio::test]
    async fn first_success_wins() {
        let fallback = Fallback::new("lookup")
            .alternative(always_fails("primary"))
            .alternative(returns("secondary", 42));

        let out = fallback.execute(0, ExecutionContext::root()).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn healthy_primary_short_circuits() {
        let tried_secondary = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&tried_secondary);
        let secondary: BoxPrimitive<i64, i64> =
            Arc::new(FnPrimitive::new("secondary", move |_: i64, _| {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(0) }
            }));

        let fallback = Fallback::new("lookup")
            .alternative(returns("primary", 1))
            .alternative(secondary);

        let out = fallback.execute(0, ExecutionContext::root()).await.unwrap();
        assert_eq!(out, 1);
        assert!(!tried_secondary.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let fallback = Fallback::new("lookup")
            .alternative(always_fails("primary"))
            .alternative(Arc::new(FnPrimitive::new("secondary", |_: i64, _| async {
                Err(WeftError::permanent("secondary", "gone"))
            })));

        let err = fallback
            .execute(0, ExecutionContext::root())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert_eq!(err.primitive(), "secondary");
    }

    #[tokio::test]
    async fn timeout_errors_propagate_without_falling_through() {
        let tried_secondary = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&tried_secondary);
        let secondary: BoxPrimitive<i64, i64> =
            Arc::new(FnPrimitive::new("secondary", move |_: i64, _| {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(0) }
            }));

        let fallback = Fallback::new("lookup")
            .alternative(Arc::new(FnPrimitive::new("primary", |_: i64, _| async {
                Err(WeftError::timeout("primary", 100))
            })))
            .alternative(secondary);

        let err = fallback
            .execute(0, ExecutionContext::root())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!tried_secondary.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_fallback_fails_permanent() {
        let fallback: Fallback<i64, i64> = Fallback::new("empty");
        let err = fallback
            .execute(0, ExecutionContext::root())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }
}
