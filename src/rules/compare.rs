//! Comparison semantics for transaction values.
//!
//! Numbers compare exactly through `Decimal` when both sides fit, so
//! `250000` and `250000.0` are equal and money amounts never pick up
//! binary floating point error. Floats that do not survive the trip
//! through `Decimal` (out of range, or finer than its 28-digit scale)
//! compare as `f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Short type name used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        Some(Decimal::from(i))
    } else if let Some(u) = n.as_u64() {
        Some(Decimal::from(u))
    } else {
        let f = n.as_f64()?;
        Decimal::from_f64_retain(f).filter(|d| d.to_f64() == Some(f))
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (to_decimal(a), to_decimal(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Ordered comparison. Returns None when the pair has no ordering.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Structural equality with numeric comparison for numbers.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equals(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| equals(x, y)))
        }
        _ => a == b,
    }
}

/// Membership test. Returns None when `container` cannot hold `value`.
pub fn contains(container: &Value, value: &Value) -> Option<bool> {
    match (container, value) {
        (Value::Array(items), _) => Some(items.iter().any(|item| equals(item, value))),
        (Value::String(haystack), Value::String(needle)) => Some(haystack.contains(needle.as_str())),
        (Value::Object(map), Value::String(key)) => Some(map.contains_key(key)),
        _ => None,
    }
}
