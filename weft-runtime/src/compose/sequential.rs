//! Sequential composition: chain stages, feeding output to input.

use std::collections::HashMap;
use weft_core::prelude::*;

/// Executes stages in order, feeding each stage's output into the next.
///
/// Stages run on the calling task. Every stage receives this primitive's
/// context, so instrumented stages record sibling spans directly under the
/// Sequential span. On the first failure, later stages are skipped, any
/// compensation entries recorded during this Sequential's execution are
/// unwound in reverse order, and the original error propagates.
pub struct Sequential<T: Payload> {
    name: String,
    stages: Vec<BoxPrimitive<T, T>>,
}

impl<T: Payload> Sequential<T> {
    /// Create an empty chain. An empty Sequential is the identity primitive.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Create a chain from existing stages.
    pub fn from_stages(name: impl Into<String>, stages: Vec<BoxPrimitive<T, T>>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    /// Append a stage.
    #[must_use]
    pub fn stage(mut self, stage: BoxPrimitive<T, T>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T: Payload> Primitive for Sequential<T> {
    type Input = T;
    type Output = T;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "sequential")
    }

    fn execute<'a>(&'a self, input: T, ctx: ExecutionContext) -> PrimitiveFuture<'a, T> {
        Box::pin(async move {
            ctx.record_attribute("sequential.stages", self.stages.len());
            let mark = ctx.state().compensation_len();

            let mut value = input;
            for (index, stage) in self.stages.iter().enumerate() {
                if ctx.is_cancelled() {
                    self.unwind(&ctx, mark, index).await;
                    return Err(WeftError::cancelled(&self.name));
                }

                match stage.execute(value, ctx.clone()).await {
                    Ok(output) => value = output,
                    Err(error) => {
                        ctx.record_attribute("sequential.failed_stage", index);
                        self.unwind(&ctx, mark, index).await;
                        return Err(error);
                    }
                }
            }

            Ok(value)
        })
    }
}

impl<T: Payload> Sequential<T> {
    /// Roll the compensation log back to this Sequential's entry checkpoint.
    async fn unwind(&self, ctx: &ExecutionContext, mark: usize, failed_stage: usize) {
        let undone = ctx.state().rollback_to(mark).await;
        if !undone.is_empty() {
            let mut attrs = HashMap::new();
            attrs.insert("failed_stage".to_string(), failed_stage.into());
            attrs.insert(
                "steps".to_string(),
                serde_json::Value::Array(
                    undone.iter().cloned().map(serde_json::Value::String).collect(),
                ),
            );
            ctx.record_event("compensation.rollback", attrs);
            tracing::info!(
                sequential = %self.name,
                steps = undone.len(),
                "compensation rollback complete"
            );
        }
    }
}
