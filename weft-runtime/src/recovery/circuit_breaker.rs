//! Circuit breaker: fail fast after sustained failures.
//!
//! Implements the circuit breaker pattern to prevent hammering a dependency
//! that is already failing. State machine:
//!
//! - **Closed**: pass-through, counting consecutive failures
//! - **Open**: after `failure_threshold` consecutive failures, reject
//!   immediately with `CircuitOpen` until `recovery_timeout` elapses
//! - **HalfOpen**: exactly one trial call is admitted; success closes the
//!   circuit, failure re-opens it

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use weft_core::prelude::*;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests are allowed.
    Closed,
    /// Circuit is tripped, requests are rejected.
    Open,
    /// Testing if the dependency has recovered.
    HalfOpen,
}

impl CircuitState {
    /// Stable string form for span attributes and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before tripping the circuit.
    pub failure_threshold: u32,
    /// How long to reject before admitting a trial call.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// The breaker state machine, independent of any wrapped primitive.
pub struct BreakerCore {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    rejected: AtomicU64,
}

impl BreakerCore {
    /// Create a state machine with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
            rejected: AtomicU64::new(0),
        }
    }

    /// Check if a call may proceed.
    ///
    /// Returns `Err(remaining)` with the time left until a trial call is
    /// admitted when the call must be rejected.
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let opened_at = inner.opened_at.unwrap_or_else(Instant::now);
                let elapsed = opened_at.elapsed();
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    Err(self.config.recovery_timeout - elapsed)
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    Err(Duration::ZERO)
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.trial_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                // The trial call failed; trip the circuit again.
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Release an admitted trial call without a verdict.
    ///
    /// Used when the trial was cancelled rather than completed, so the
    /// half-open slot does not leak.
    pub fn release_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }

    /// The current circuit state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Number of rejected calls.
    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Manually reset the breaker to closed.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }
}

/// Guards a wrapped primitive with a [`BreakerCore`].
///
/// Rejections return `CircuitOpen` immediately, carrying the remaining
/// recovery time as a `retry_after` hint, without invoking the wrapped
/// primitive. `Cancelled` results release the half-open trial slot without
/// counting as a dependency failure.
pub struct CircuitBreaker<P> {
    inner: P,
    core: BreakerCore,
}

impl<P: Primitive> CircuitBreaker<P> {
    /// Wrap a primitive with a breaker.
    pub fn new(inner: P, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            core: BreakerCore::new(config),
        }
    }

    /// The underlying state machine.
    pub fn core(&self) -> &BreakerCore {
        &self.core
    }
}

impl<P: Primitive> Primitive for CircuitBreaker<P> {
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(
            format!("breaker:{}", self.inner.info().name),
            "circuit_breaker",
        )
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        Box::pin(async move {
            let name = self.info().name;

            if let Err(remaining) = self.core.try_acquire() {
                ctx.record_attribute("breaker.state", CircuitState::Open.as_str());
                tracing::debug!(primitive = %name, "call rejected by open circuit");
                return Err(WeftError::circuit_open(&name, Some(remaining)));
            }

            let before = self.core.state();
            ctx.record_attribute("breaker.state", before.as_str());

            let result = self.inner.execute(input, ctx.clone()).await;

            match &result {
                Ok(_) => self.core.record_success(),
                Err(error) if error.kind() == ErrorKind::Cancelled => {
                    self.core.release_trial();
                }
                Err(_) => self.core.record_failure(),
            }

            let after = self.core.state();
            if after != before {
                let mut attrs = std::collections::HashMap::new();
                attrs.insert("from".to_string(), before.as_str().into());
                attrs.insert("to".to_string(), after.as_str().into());
                ctx.record_event("breaker.transition", attrs);
                tracing::info!(
                    primitive = %name,
                    from = before.as_str(),
                    to = after.as_str(),
                    "circuit breaker transition"
                );
            }

            result
        })
    }
}
