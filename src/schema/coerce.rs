//! Value coercion
//!
//! Converts and validates a raw JSON value against a column.
//!
//! ## Rules (in order)
//! 1. Absent / `null`  → the column default, else the type's zero value
//! 2. Right type       → kept (integers widened for `Float` columns)
//! 3. Wrong type       → converted if a conversion exists
//! 4. No conversion    → treated as absent; without a default the result
//!    is the zero value and is flagged invalid
//!
//! The final value is re-validated; a value that still does not match the
//! type is never reported as ok.

use serde_json::Value;

use super::column::{Column, ColumnType};

/// How a coerced value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Raw value already had the declared type
    Accepted,

    /// Raw value was converted to the declared type
    Converted,

    /// Raw value was absent; default or zero value used
    Filled,

    /// Raw value was invalid; the declared default replaced it
    Substituted,

    /// Raw value was invalid and the column has no default
    Invalid,
}

/// Result of coercing one value
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Value,
    pub outcome: Outcome,
}

impl Coerced {
    pub fn ok(&self) -> bool {
        self.outcome != Outcome::Invalid
    }
}

/// Coerce `raw` against `column`
pub fn coerce(column: &Column, raw: Option<&Value>) -> Coerced {
    let ty = column.column_type;

    let raw = match raw {
        None | Some(Value::Null) => {
            return Coerced {
                value: column.fill_value(),
                outcome: Outcome::Filled,
            }
        }
        Some(raw) => raw,
    };

    let (candidate, outcome) = if ty.matches(raw) {
        (normalize(ty, raw), Outcome::Accepted)
    } else {
        match convert(ty, raw) {
            Some(value) => (value, Outcome::Converted),
            None => return invalid(column),
        }
    };

    if !ty.matches(&candidate) {
        return invalid(column);
    }

    Coerced {
        value: candidate,
        outcome,
    }
}

/// Fallback for a value that could not be coerced
fn invalid(column: &Column) -> Coerced {
    match &column.default {
        Some(default) => Coerced {
            value: default.clone(),
            outcome: Outcome::Substituted,
        },
        None => Coerced {
            value: column.column_type.zero_value(),
            outcome: Outcome::Invalid,
        },
    }
}

/// Canonical form of a value that already matches its type
pub(crate) fn normalize(ty: ColumnType, value: &Value) -> Value {
    match (ty, value) {
        (ColumnType::Float, Value::Number(n)) if !n.is_f64() => n
            .as_f64()
            .map(Value::from)
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

/// Attempt a type conversion; `None` when no sensible conversion exists
fn convert(ty: ColumnType, value: &Value) -> Option<Value> {
    match ty {
        ColumnType::String => match value {
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        ColumnType::Integer => match value {
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            Value::Number(n) => n.as_f64().and_then(truncate_float).map(Value::from),
            Value::Bool(b) => Some(Value::from(*b as i64)),
            _ => None,
        },
        ColumnType::Float => match value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),
            Value::Bool(b) => Some(Value::from(if *b { 1.0 } else { 0.0 })),
            _ => None,
        },
        ColumnType::Boolean => match value {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
            _ => None,
        },
        ColumnType::List | ColumnType::Map => None,
    }
}

fn truncate_float(f: f64) -> Option<i64> {
    if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f.trunc() as i64)
}
