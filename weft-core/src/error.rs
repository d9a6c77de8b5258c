//! Error types for WEFT primitives.
//!
//! Every primitive failure is a [`WeftError`] carrying the name of the
//! failing primitive and a cause. The error kind drives the recovery
//! primitives: retry acts on `Transient`, fallback advances past `Transient`
//! and `Permanent`, and everything else propagates unchanged.

use std::time::Duration;
use thiserror::Error;

/// Classification of a primitive failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The failure is safe to retry.
    Transient,
    /// Retrying is pointless (e.g. validation failure).
    Permanent,
    /// The execution deadline was exceeded.
    Timeout,
    /// A circuit breaker rejected the call without executing it.
    CircuitOpen,
    /// Cooperative cancellation was observed.
    Cancelled,
}

impl ErrorKind {
    /// Stable string form, used for span attributes and log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Timeout => "timeout",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type produced by primitive execution.
#[derive(Error, Debug, Clone)]
pub enum WeftError {
    /// A failure that is safe to retry.
    #[error("transient failure in '{primitive}': {cause}")]
    Transient {
        /// Name of the failing primitive.
        primitive: String,
        /// Reason for the failure.
        cause: String,
        /// Optional hint for when a retry may succeed.
        retry_after: Option<Duration>,
    },

    /// A failure for which retrying is pointless.
    #[error("permanent failure in '{primitive}': {cause}")]
    Permanent {
        /// Name of the failing primitive.
        primitive: String,
        /// Reason for the failure.
        cause: String,
    },

    /// The execution deadline was exceeded.
    #[error("'{primitive}' timed out after {elapsed_ms}ms")]
    Timeout {
        /// Name of the primitive that timed out.
        primitive: String,
        /// The deadline that was exceeded, in milliseconds.
        elapsed_ms: u64,
    },

    /// A circuit breaker rejected the call without executing it.
    #[error("circuit open for '{primitive}'")]
    CircuitOpen {
        /// Name of the guarded primitive.
        primitive: String,
        /// Remaining time until the breaker admits a trial call.
        retry_after: Option<Duration>,
    },

    /// The execution observed cooperative cancellation.
    #[error("'{primitive}' was cancelled")]
    Cancelled {
        /// Name of the cancelled primitive.
        primitive: String,
    },
}

impl WeftError {
    /// Construct a `Transient` error.
    pub fn transient(primitive: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Transient {
            primitive: primitive.into(),
            cause: cause.into(),
            retry_after: None,
        }
    }

    /// Construct a `Transient` error with a retry-after hint.
    pub fn transient_after(
        primitive: impl Into<String>,
        cause: impl Into<String>,
        retry_after: Duration,
    ) -> Self {
        Self::Transient {
            primitive: primitive.into(),
            cause: cause.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Construct a `Permanent` error.
    pub fn permanent(primitive: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Permanent {
            primitive: primitive.into(),
            cause: cause.into(),
        }
    }

    /// Construct a `Timeout` error.
    pub fn timeout(primitive: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            primitive: primitive.into(),
            elapsed_ms,
        }
    }

    /// Construct a `CircuitOpen` error.
    pub fn circuit_open(primitive: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::CircuitOpen {
            primitive: primitive.into(),
            retry_after,
        }
    }

    /// Construct a `Cancelled` error.
    pub fn cancelled(primitive: impl Into<String>) -> Self {
        Self::Cancelled {
            primitive: primitive.into(),
        }
    }

    /// The error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Permanent { .. } => ErrorKind::Permanent,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Name of the primitive that produced this error.
    #[must_use]
    pub fn primitive(&self) -> &str {
        match self {
            Self::Transient { primitive, .. }
            | Self::Permanent { primitive, .. }
            | Self::Timeout { primitive, .. }
            | Self::CircuitOpen { primitive, .. }
            | Self::Cancelled { primitive } => primitive,
        }
    }

    /// Check if this error is safe to retry.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Hint for when a retry may succeed, if the producer supplied one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } | Self::CircuitOpen { retry_after, .. } => {
                *retry_after
            }
            _ => None,
        }
    }
}

/// Result type alias using [`WeftError`].
pub type Result<T> = std::result::Result<T, WeftError>;
