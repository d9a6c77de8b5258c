//! Aggregation of parallel branch results.
//!
//! `Parallel` intentionally returns a list rather than a merged object; when
//! a workflow needs a single value it chains an explicit `Aggregate` stage
//! after the fan-out.

use super::parallel::BranchResults;
use std::sync::Arc;
use weft_core::prelude::*;

/// Function merging branch results into one value.
pub type MergeFn<O, T> =
    Arc<dyn Fn(BranchResults<O>) -> Result<T> + Send + Sync>;

/// Merges the ordered results of a `Parallel` fan-out into one value.
pub struct Aggregate<O, T> {
    name: String,
    merge: MergeFn<O, T>,
}

impl<O: Payload, T: Payload> Aggregate<O, T> {
    /// Create an aggregator from a merge function.
    pub fn new<F>(name: impl Into<String>, merge: F) -> Self
    where
        F: Fn(BranchResults<O>) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            merge: Arc::new(merge),
        }
    }
}

impl<O: Payload> Aggregate<O, Vec<O>> {
    /// Aggregator that keeps successful values and fails if any branch
    /// failed, returning the first branch error.
    pub fn require_all(name: impl Into<String>) -> Self {
        Self::new(name, |results: BranchResults<O>| {
            let mut values = Vec::with_capacity(results.len());
            for result in results {
                values.push(result?);
            }
            Ok(values)
        })
    }

    /// Aggregator that keeps successful values and drops failed branches.
    pub fn successes(name: impl Into<String>) -> Self {
        Self::new(name, |results: BranchResults<O>| {
            Ok(results.into_iter().filter_map(|r| r.ok()).collect())
        })
    }
}

impl<O: Payload, T: Payload> Primitive for Aggregate<O, T> {
    type Input = BranchResults<O>;
    type Output = T;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "aggregate")
    }

    fn execute<'a>(
        &'a self,
        input: BranchResults<O>,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, T> {
        Box::pin(async move {
            let failed = input.iter().filter(|r| r.is_err()).count();
            ctx.record_attribute("aggregate.branches", input.len());
            ctx.record_attribute("aggregate.failed_branches", failed);
            (self.merge)(input)
        })
    }
}
