//! Compensation: record how to undo a completed step.
//!
//! A `Compensated` primitive appends an undo action to the workflow's
//! compensation log each time it succeeds. When a later stage in the same
//! `Sequential` fails, the composition unwinds the log in reverse order
//! before propagating the original error.

use std::collections::HashMap;
use std::sync::Arc;
use weft_core::context::CompensationEntry;
use weft_core::prelude::*;

/// Async undo action invoked with a clone of the step's output.
pub type UndoFn<O> = Arc<dyn Fn(O) -> PrimitiveFuture<'static, ()> + Send + Sync>;

/// Wraps a primitive so successful executions are compensatable.
pub struct Compensated<P: Primitive> {
    inner: P,
    step_id: String,
    undo: UndoFn<P::Output>,
}

impl<P> Compensated<P>
where
    P: Primitive,
    P::Output: Clone,
{
    /// Wrap a primitive with an undo action.
    ///
    /// `step_id` identifies the step in the compensation log; the undo
    /// closure receives a clone of the output the step produced.
    pub fn new<F, Fut>(step_id: impl Into<String>, inner: P, undo: F) -> Self
    where
        F: Fn(P::Output) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            inner,
            step_id: step_id.into(),
            undo: Arc::new(move |output| Box::pin(undo(output))),
        }
    }
}

impl<P> Primitive for Compensated<P>
where
    P: Primitive,
    P::Output: Clone,
{
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(
            format!("compensated:{}", self.inner.info().name),
            "compensation",
        )
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        Box::pin(async move {
            let output = self.inner.execute(input, ctx.clone()).await?;

            let undo = Arc::clone(&self.undo);
            let captured = output.clone();
            ctx.state().push_compensation(CompensationEntry::new(
                self.step_id.clone(),
                Box::new(move || (undo)(captured)),
            ));

            let mut attrs = HashMap::new();
            attrs.insert("step_id".to_string(), self.step_id.clone().into());
            ctx.record_event("compensation.recorded", attrs);

            Ok(output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn success_appends_to_the_log() {
        let reserve = FnPrimitive::new("reserve", |input: i64, _| async move { Ok(input) });
        let compensated = Compensated::new("reserve_stock", reserve, |_| async { Ok(()) });

        let ctx = ExecutionContext::root();
        compensated.execute(5, ctx.clone()).await.unwrap();

        assert_eq!(ctx.state().compensation_len(), 1);
        let mirror = ctx.state().get(weft_core::context::SAGA_LOG_KEY).unwrap();
        assert_eq!(
            mirror,
            serde_json::Value::Array(vec!["reserve_stock".into()])
        );
    }

    #[tokio::test]
    async fn failure_appends_nothing() {
        let failing: FnPrimitive<i64, i64> = FnPrimitive::new("failing", |_, _| async {
            Err(WeftError::transient("failing", "down"))
        });
        let compensated = Compensated::new("step", failing, |_| async { Ok(()) });

        let ctx = ExecutionContext::root();
        assert!(compensated.execute(5, ctx.clone()).await.is_err());
        assert_eq!(ctx.state().compensation_len(), 0);
    }

    #[tokio::test]
    async fn undo_receives_the_output() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let produce = FnPrimitive::new("produce", |_: i64, _| async move { Ok(41i64) });
        let compensated = Compensated::new("produce", produce, move |output: i64| {
            let seen = Arc::clone(&seen_clone);
            async move {
                *seen.lock() = Some(output);
                Ok(())
            }
        });

        let ctx = ExecutionContext::root();
        compensated.execute(0, ctx.clone()).await.unwrap();
        ctx.state().rollback_to(0).await;

        assert_eq!(*seen.lock(), Some(41));
    }
}
