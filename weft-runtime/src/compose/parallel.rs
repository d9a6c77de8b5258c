//! Parallel composition: fan out, collect in input order.

use tokio::task::JoinSet;
use weft_core::prelude::*;

/// Per-branch results, ordered to match branch declaration order.
pub type BranchResults<O> = Vec<std::result::Result<O, WeftError>>;

/// Executes all branches concurrently with clones of the same input.
///
/// Each branch runs on its own tokio task and receives this primitive's
/// context, so instrumented branches record sibling spans. The output is one
/// result per branch, in declaration order regardless of completion order;
/// the composition itself only fails when `fail_fast` is set, in which case
/// the first branch error cancels the remaining branches and is returned.
pub struct Parallel<I, O> {
    name: String,
    branches: Vec<BoxPrimitive<I, O>>,
    fail_fast: bool,
}

impl<I, O> Parallel<I, O>
where
    I: Payload + Clone,
    O: Payload,
{
    /// Create an empty fan-out.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
            fail_fast: false,
        }
    }

    /// Create a fan-out from existing branches.
    pub fn from_branches(name: impl Into<String>, branches: Vec<BoxPrimitive<I, O>>) -> Self {
        Self {
            name: name.into(),
            branches,
            fail_fast: false,
        }
    }

    /// Append a branch.
    #[must_use]
    pub fn branch(mut self, branch: BoxPrimitive<I, O>) -> Self {
        self.branches.push(branch);
        self
    }

    /// Cancel remaining branches and fail the composition on the first
    /// branch error.
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

impl<I, O> Primitive for Parallel<I, O>
where
    I: Payload + Clone,
    O: Payload,
{
    type Input = I;
    type Output = BranchResults<O>;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "parallel")
    }

    fn execute<'a>(
        &'a self,
        input: I,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, BranchResults<O>> {
        Box::pin(async move {
            ctx.record_attribute("parallel.branches", self.branches.len());
            ctx.record_attribute("parallel.fail_fast", self.fail_fast);

            // One shared scope so a fail-fast error can cancel the siblings.
            let scope = ctx.cancel().child_token();
            let branch_ctx = ctx.with_cancel(scope.clone());

            let mut tasks: JoinSet<(usize, std::result::Result<O, WeftError>)> = JoinSet::new();
            for (index, branch) in self.branches.iter().enumerate() {
                let branch = std::sync::Arc::clone(branch);
                let input = input.clone();
                let ctx = branch_ctx.clone();
                tasks.spawn(async move { (index, branch.execute(input, ctx).await) });
            }

            let mut slots: Vec<Option<std::result::Result<O, WeftError>>> =
                (0..self.branches.len()).map(|_| None).collect();
            let mut first_error: Option<WeftError> = None;

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, result)) => {
                        if self.fail_fast && first_error.is_none() {
                            if let Err(error) = &result {
                                first_error = Some(error.clone());
                                scope.cancel();
                            }
                        }
                        slots[index] = Some(result);
                    }
                    Err(join_error) => {
                        // A panicked branch loses its slot; filled below.
                        tracing::error!(
                            parallel = %self.name,
                            error = %join_error,
                            "branch task failed to join"
                        );
                    }
                }
            }

            if let Some(error) = first_error {
                return Err(error);
            }

            Ok(slots
                .into_iter()
                .map(|slot| {
                    slot.unwrap_or_else(|| {
                        Err(WeftError::permanent(&self.name, "branch task panicked"))
                    })
                })
                .collect())
        })
    }
}
