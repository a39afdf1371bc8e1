// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde_json::{Number, Value};

use crate::ItemKey;

/// How [`contains`](crate::Collection::contains_with) compares values.
///
/// ```
/// use hoard::Equality;
/// use serde_json::json;
///
/// assert!(!Equality::Strict.matches(&json!(1), &json!("1")));
/// assert!(Equality::Loose.matches(&json!(1), &json!("1")));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Equality {
    /// Same JSON type and same value. `1` and `1.0` differ.
    #[default]
    Strict,
    /// Type-juggling comparison: numeric strings equal numbers, booleans compare by
    /// truthiness, `null` equals every falsy value, and arrays or objects compare key by key
    /// regardless of order.
    Loose,
}

impl Equality {
    /// Compares two values.
    #[must_use]
    pub fn matches(self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Strict => left == right,
            Self::Loose => loose_eq(left, right),
        }
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => *flag == truthy(other),
        (Value::Null, Value::Null) => true,
        (Value::Null, Value::String(text)) | (Value::String(text), Value::Null) => text.is_empty(),
        (Value::Null, other) | (other, Value::Null) => !truthy(other),
        (Value::Number(a), Value::Number(b)) => number_eq(a, b),
        (Value::Number(number), Value::String(text)) | (Value::String(text), Value::Number(number)) => {
            numeric(text).map_or_else(|| number.to_string() == *text, |parsed| as_f64(number).is_some_and(|n| same(n, parsed)))
        }
        (Value::String(a), Value::String(b)) => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => same(x, y),
            _ => a == b,
        },
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => keyed_eq(left, right),
        _ => false,
    }
}

fn keyed(value: &Value) -> Vec<(ItemKey, &Value)> {
    match value {
        Value::Array(values) => values.iter().enumerate().map(|(i, v)| (ItemKey::from(i), v)).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (ItemKey::parse(k), v)).collect(),
        _ => Vec::new(),
    }
}

fn keyed_eq(left: &Value, right: &Value) -> bool {
    let left = keyed(left);
    let right = keyed(right);
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, value)| right.iter().any(|(other_key, other)| key == other_key && loose_eq(value, other)))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => as_f64(number).is_some_and(|n| n != 0.0),
        Value::String(text) => !(text.is_empty() || text == "0"),
        Value::Array(values) => !values.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn as_f64(number: &Number) -> Option<f64> {
    number.as_f64()
}

#[expect(clippy::float_cmp, reason = "loose equality is exact numeric equality")]
fn same(x: f64, y: f64) -> bool {
    x == y
}

fn number_eq(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => as_f64(a).zip(as_f64(b)).is_some_and(|(x, y)| same(x, y)),
    }
}

/// Parses a numeric string: optional surrounding whitespace, sign, digits, fraction, exponent.
fn numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let plausible = !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if plausible { trimmed.parse().ok() } else { None }
}
