//! Column descriptors
//!
//! One declared field of a store: name, value type and optional default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value types a column can declare
///
/// `List` and `Map` are the only collection types; their elements are not
/// typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Map,
}

impl ColumnType {
    /// The type's zero value, used when no default is declared
    pub fn zero_value(&self) -> Value {
        match self {
            ColumnType::String => Value::String(String::new()),
            ColumnType::Integer => Value::from(0i64),
            ColumnType::Float => Value::from(0.0f64),
            ColumnType::Boolean => Value::Bool(false),
            ColumnType::List => Value::Array(Vec::new()),
            ColumnType::Map => Value::Object(Map::new()),
        }
    }

    /// Check whether a JSON value already has this type
    ///
    /// Integers are accepted for `Float` columns. `Integer` columns hold
    /// i64 only.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ColumnType::String, Value::String(_)) => true,
            (ColumnType::Integer, Value::Number(n)) => n.is_i64(),
            (ColumnType::Float, Value::Number(_)) => true,
            (ColumnType::Boolean, Value::Bool(_)) => true,
            (ColumnType::List, Value::Array(_)) => true,
            (ColumnType::Map, Value::Object(_)) => true,
            _ => false,
        }
    }

    /// Short type name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::List => "list",
            ColumnType::Map => "map",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// A single declared column
///
/// ```text
/// date_join: integer = 0
/// ^^^^^^^^^  ^^^^^^^   ^
/// name       type      default
/// ```
///
/// A column without a default is *required*: a value that cannot be
/// coerced has nothing to fall back on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Column {
    /// A column with no default
    pub fn required(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            default: None,
        }
    }

    /// A column falling back to `default` when absent or invalid
    pub fn with_default(
        name: impl Into<String>,
        column_type: ColumnType,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Default if declared, else the type's zero value
    pub fn fill_value(&self) -> Value {
        match &self.default {
            Some(default) => default.clone(),
            None => self.column_type.zero_value(),
        }
    }
}
