//! Payload marker trait for primitive inputs and outputs.

use crate::error::WeftError;
use serde_json::Value;

/// Marker trait for values that can flow through primitives.
///
/// The optional size hint feeds the `input.size` / `output.size` span
/// attributes recorded by the instrumentation layer; returning `None` simply
/// omits the attribute.
pub trait Payload: Send + Sync + 'static {
    /// Approximate size of the payload in bytes, if cheaply known.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

impl Payload for () {}

impl Payload for bool {
    fn size_hint(&self) -> Option<usize> {
        Some(1)
    }
}

impl Payload for u8 {
    fn size_hint(&self) -> Option<usize> {
        Some(1)
    }
}

impl Payload for i32 {
    fn size_hint(&self) -> Option<usize> {
        Some(4)
    }
}

impl Payload for i64 {
    fn size_hint(&self) -> Option<usize> {
        Some(8)
    }
}

impl Payload for u64 {
    fn size_hint(&self) -> Option<usize> {
        Some(8)
    }
}

impl Payload for f64 {
    fn size_hint(&self) -> Option<usize> {
        Some(8)
    }
}

impl Payload for String {
    fn size_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Payload for &'static str {
    fn size_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Payload for Value {
    fn size_hint(&self) -> Option<usize> {
        Some(estimate_value_size(self))
    }
}

impl<T: Payload> Payload for Option<T> {
    fn size_hint(&self) -> Option<usize> {
        match self {
            Some(value) => value.size_hint(),
            None => Some(0),
        }
    }
}

impl<T: Payload> Payload for Vec<T> {
    fn size_hint(&self) -> Option<usize> {
        self.iter().map(Payload::size_hint).sum()
    }
}

impl<T: Payload> Payload for std::result::Result<T, WeftError> {
    fn size_hint(&self) -> Option<usize> {
        match self {
            Ok(value) => value.size_hint(),
            Err(_) => Some(0),
        }
    }
}

/// Rough in-memory size of a JSON value, without serializing it.
fn estimate_value_size(value: &Value) -> usize {
    match value {
        Value::Null => 4,
        Value::Bool(_) => 1,
        Value::Number(_) => 8,
        Value::String(s) => s.len(),
        Value::Array(items) => items.iter().map(estimate_value_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| k.len() + estimate_value_size(v))
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_hints() {
        assert_eq!(42i64.size_hint(), Some(8));
        assert_eq!("abc".to_string().size_hint(), Some(3));
        assert_eq!(().size_hint(), None);
    }

    #[test]
    fn vec_sums_element_hints() {
        let bytes: Vec<u8> = vec![0; 16];
        assert_eq!(bytes.size_hint(), Some(16));
    }

    #[test]
    fn json_value_estimate() {
        let value = json!({"name": "weft", "count": 3});
        // "name" + "weft" + "count" + number
        assert_eq!(value.size_hint(), Some(4 + 4 + 5 + 8));
    }

    #[test]
    fn result_hint_follows_ok_value() {
        let ok: std::result::Result<String, WeftError> = Ok("four".to_string());
        assert_eq!(ok.size_hint(), Some(4));

        let err: std::result::Result<String, WeftError> =
            Err(WeftError::permanent("p", "boom"));
        assert_eq!(err.size_hint(), Some(0));
    }
}
