//! Recovery primitives: wrappers that change a primitive's failure behavior.
//!
//! Each wrapper acts only on the error kinds it is documented to handle;
//! everything else propagates unchanged. Wrappers hold already-instrumented
//! children, so re-executions and alternative attempts show up as sibling
//! spans under the wrapper's own span.

mod circuit_breaker;
mod fallback;
mod retry;
mod saga;
mod timeout;

pub use circuit_breaker::{BreakerCore, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use fallback::Fallback;
pub use retry::Retry;
pub use saga::Compensated;
pub use timeout::Timeout;
