//! Lenient JSON field helpers.
//!
//! The feed is not strict about number encoding: the same field may arrive as
//! a JSON number (`1.23`) in one batch and as a numeric string (`"1.23"`) in
//! the next. These helpers accept both, and are usable either directly on a
//! [`serde_json::Value`] or as `#[serde(deserialize_with = ...)]` adapters.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.trim().parse().ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (string or number) as `u64`.
///
/// Integral floats (`12.0`) are accepted; negative or fractional values are not.
#[inline]
pub fn parse_str_u64(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        return s.trim().parse().ok();
    }
    v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
}

/// Render a scalar JSON value as text: strings verbatim, numbers and bools
/// in their JSON form. Returns `None` for null, arrays and objects.
#[inline]
pub fn scalar_to_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `deserialize_with` adapter: number or numeric string → `f64`. Null,
/// missing or unparseable values become `0.0`.
pub fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(parse_str_f64(v.as_ref()).unwrap_or(0.0))
}

/// `deserialize_with` adapter: integer or integer string → `u64`. Null,
/// missing, negative or unparseable values become `0`.
pub fn de_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(parse_str_u64(v.as_ref()).unwrap_or(0))
}

/// `deserialize_with` adapter: string or scalar → `String`. Null, arrays and
/// objects become the empty string.
pub fn de_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(scalar_to_text).unwrap_or_default())
}
