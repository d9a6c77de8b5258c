//! Trace and span identifiers following W3C Trace Context semantics.

use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::fmt;
use uuid::Uuid;

/// 128-bit trace identifier shared by every span in one workflow execution.
///
/// Displayed as 32 lowercase hex characters per the W3C Trace Context
/// format. A trace ID is never all-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// Create a new random trace ID.
    #[must_use]
    pub fn new() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    /// Create a trace ID from raw bytes.
    ///
    /// Returns `None` for the invalid all-zero value.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Option<Self> {
        if bytes == [0u8; 16] {
            None
        } else {
            Some(Self(bytes))
        }
    }

    /// The raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 16] {
        self.0
    }

    /// Parse a 32-character hex string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 32 {
            return None;
        }
        let value = u128::from_str_radix(s, 16).ok()?;
        Self::from_bytes(value.to_be_bytes())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl SerdeSerialize for TraceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> SerdeDeserialize<'de> for TraceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom("invalid trace id"))
    }
}

/// 64-bit span identifier, unique per primitive invocation.
///
/// Displayed as 16 lowercase hex characters. A span ID is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Create a new random span ID.
    #[must_use]
    pub fn new() -> Self {
        loop {
            let value: u64 = rand::random();
            if value != 0 {
                return Self(value);
            }
        }
    }

    /// Create a span ID from a raw value.
    ///
    /// Returns `None` for the invalid zero value.
    #[must_use]
    pub fn from_u64(value: u64) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// The raw identifier value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The raw identifier bytes, big-endian.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parse a 16-character hex string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 16 {
            return None;
        }
        let value = u64::from_str_radix(s, 16).ok()?;
        Self::from_u64(value)
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl SerdeSerialize for SpanId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> SerdeDeserialize<'de> for SpanId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom("invalid span id"))
    }
}
