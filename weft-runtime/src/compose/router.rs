//! Conditional routing: exactly one branch per invocation.

use std::collections::HashMap;
use std::sync::Arc;
use weft_core::prelude::*;

/// Function selecting a route key from the input and context.
pub type RouteFn<I> = Arc<dyn Fn(&I, &ExecutionContext) -> String + Send + Sync>;

/// Routes each input to exactly one branch by key.
///
/// The route function picks a key; the matching branch executes with the
/// router's context. A missing key falls back to the default branch when one
/// is configured, otherwise the router fails with a `Permanent` error.
pub struct Router<I, O> {
    name: String,
    routes: HashMap<String, BoxPrimitive<I, O>>,
    route_fn: RouteFn<I>,
    default: Option<String>,
}

impl<I: Payload, O: Payload> Router<I, O> {
    /// Create a router with the given route function.
    pub fn new<F>(name: impl Into<String>, route_fn: F) -> Self
    where
        F: Fn(&I, &ExecutionContext) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            routes: HashMap::new(),
            route_fn: Arc::new(route_fn),
            default: None,
        }
    }

    /// Register a branch under a key.
    #[must_use]
    pub fn route(mut self, key: impl Into<String>, branch: BoxPrimitive<I, O>) -> Self {
        self.routes.insert(key.into(), branch);
        self
    }

    /// Set the key to fall back to when the route function's key matches
    /// nothing.
    #[must_use]
    pub fn default_route(mut self, key: impl Into<String>) -> Self {
        self.default = Some(key.into());
        self
    }
}

impl<I: Payload, O: Payload> Primitive for Router<I, O> {
    type Input = I;
    type Output = O;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "router")
    }

    fn execute<'a>(&'a self, input: I, ctx: ExecutionContext) -> PrimitiveFuture<'a, O> {
        Box::pin(async move {
            let key = (self.route_fn)(&input, &ctx);
            ctx.record_attribute("route.key", key.clone());

            let branch = match self.routes.get(&key) {
                Some(branch) => branch,
                None => match self.default.as_ref().and_then(|d| self.routes.get(d)) {
                    Some(branch) => {
                        ctx.record_attribute("route.defaulted", true);
                        branch
                    }
                    None => {
                        return Err(WeftError::permanent(
                            &self.name,
                            format!("no matching route for key '{key}'"),
                        ));
                    }
                },
            };

            branch.execute(input, ctx.clone()).await
        })
    }
}
