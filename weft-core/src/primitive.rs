//! The core primitive trait and adapters.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::payload::Payload;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future for async primitive execution.
pub type PrimitiveFuture<'a, O> = Pin<Box<dyn Future<Output = Result<O>> + Send + 'a>>;

/// A shareable, type-erased primitive handle used by composition operators.
pub type BoxPrimitive<I, O> = Arc<dyn Primitive<Input = I, Output = O>>;

/// Metadata about a primitive.
#[derive(Debug, Clone)]
pub struct PrimitiveInfo {
    /// Declared name (the span name).
    pub name: String,
    /// Variant label (e.g. "leaf", "sequential", "retry", "cache"), used for
    /// metric labels and span attributes.
    pub primitive_type: &'static str,
}

impl PrimitiveInfo {
    /// Create primitive metadata.
    pub fn new(name: impl Into<String>, primitive_type: &'static str) -> Self {
        Self {
            name: name.into(),
            primitive_type,
        }
    }
}

/// The core trait for all WEFT execution units.
///
/// A primitive is a typed unit with a single operation: execute an input
/// under an [`ExecutionContext`], producing an output or a typed error.
/// Composition and recovery operators are themselves primitives that wrap
/// other primitives; none of them is special-cased by the runtime.
///
/// Implementations may read `ctx` baggage/metadata and write workflow state,
/// but must not alter the identifier triple of the context they are given —
/// context derivation belongs to the instrumentation layer.
///
/// # Example
///
/// ```ignore
/// use weft_core::prelude::*;
///
/// struct Double;
///
/// impl Primitive for Double {
///     type Input = i64;
///     type Output = i64;
///
///     fn info(&self) -> PrimitiveInfo {
///         PrimitiveInfo::new("double", "leaf")
///     }
///
///     fn execute<'a>(&'a self, input: i64, _ctx: ExecutionContext) -> PrimitiveFuture<'a, i64> {
///         Box::pin(async move { Ok(input * 2) })
///     }
/// }
/// ```
pub trait Primitive: Send + Sync {
    /// The input type.
    type Input: Payload;
    /// The output type.
    type Output: Payload;

    /// Get metadata about this primitive.
    fn info(&self) -> PrimitiveInfo;

    /// Execute the primitive.
    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output>;
}

impl<P: Primitive + ?Sized> Primitive for Arc<P> {
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        (**self).info()
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        (**self).execute(input, ctx)
    }
}

type BoxedFn<I, O> = Arc<dyn Fn(I, ExecutionContext) -> PrimitiveFuture<'static, O> + Send + Sync>;

/// Adapter turning an async closure into a named primitive.
///
/// This is the leaf construction path: workflow authors write closures, wrap
/// them here, and hand them to the instrumentation layer.
pub struct FnPrimitive<I, O> {
    name: String,
    f: BoxedFn<I, O>,
}

impl<I: Payload, O: Payload> FnPrimitive<I, O> {
    /// Wrap an async closure.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(I, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(move |input, ctx| Box::pin(f(input, ctx))),
        }
    }
}

impl<I: Payload, O: Payload> Primitive for FnPrimitive<I, O> {
    type Input = I;
    type Output = O;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(self.name.clone(), "leaf")
    }

    fn execute<'a>(&'a self, input: I, ctx: ExecutionContext) -> PrimitiveFuture<'a, O> {
        (self.f)(input, ctx)
    }
}

impl<I, O> std::fmt::Debug for FnPrimitive<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPrimitive").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeftError;

    #[tokio::test]
    async fn fn_primitive_executes_closure() {
        let double = FnPrimitive::new("double", |input: i64, _ctx| async move { Ok(input * 2) });

        assert_eq!(double.info().name, "double");
        assert_eq!(double.info().primitive_type, "leaf");

        let result = double.execute(21, ExecutionContext::root()).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn fn_primitive_propagates_errors() {
        let failing: FnPrimitive<i64, i64> = FnPrimitive::new("failing", |_, _| async {
            Err(WeftError::transient("failing", "unavailable"))
        });

        let err = failing
            .execute(1, ExecutionContext::root())
            .await
            .unwrap_err();
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn arc_forwarding() {
        let inner = FnPrimitive::new("echo", |input: String, _ctx| async move { Ok(input) });
        let boxed: BoxPrimitive<String, String> = Arc::new(inner);

        let out = boxed
            .execute("hello".to_string(), ExecutionContext::root())
            .await
            .unwrap();
        assert_eq!(out, "hello");
        assert_eq!(boxed.info().name, "echo");
    }

    #[tokio::test]
    async fn closure_can_read_context() {
        let read_tenant = FnPrimitive::new("read_tenant", |_: (), ctx: ExecutionContext| {
            let tenant = ctx.baggage_get("tenant").unwrap_or("unknown").to_string();
            async move { Ok(tenant) }
        });

        let ctx = ExecutionContext::root().with_baggage("tenant", "acme");
        let out = read_tenant.execute((), ctx).await.unwrap();
        assert_eq!(out, "acme");
    }
}
