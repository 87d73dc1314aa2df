//! Numeric coercion for generative output.
//!
//! Models round-trip numbers through prose and come back with `12500`,
//! `12500.0`, or `"12500"` interchangeably. Counts are stored as `u64`;
//! these helpers accept any whole-valued JSON number, and for fields
//! documented as coercible, a bare numeric string as well. Anything
//! else (grouped digits, units, negatives) is rejected rather than
//! guessed at.

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Deserialize a count from a whole-valued JSON number.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => number_to_count(n),
        _ => None,
    }
    .ok_or_else(|| serde::de::Error::custom(format!("expected a whole number, got {value}")))
}

/// Deserialize a count from a whole-valued JSON number or a numeric
/// string.
pub fn count_or_numeric_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => number_to_count(n),
        Value::String(s) => parse_count(s),
        _ => None,
    }
    .ok_or_else(|| {
        serde::de::Error::custom(format!(
            "expected a whole number or numeric string, got {value}"
        ))
    })
}

/// A whole, non-negative number, tolerating the `12500.0` spelling.
pub(crate) fn number_to_count(number: &Number) -> Option<u64> {
    if let Some(count) = number.as_u64() {
        return Some(count);
    }
    number.as_f64().and_then(float_to_count)
}

/// Strict numeral parse: `"12500"` and `"12500.0"` pass, `"12,500"`
/// and `"12500 badges"` do not.
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    text.trim().parse::<f64>().ok().and_then(float_to_count)
}

fn float_to_count(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}
