//! Partial update semantics
//!
//! | current value | Replace  | Append            | Remove                  |
//! |---------------|----------|-------------------|-------------------------|
//! | list          | replaced | value pushed      | first equal item removed|
//! | map           | replaced | object merged in  | named key removed       |
//! | anything else | replaced | replaced          | replaced                |

use serde_json::Value;

use crate::error::{NotFound, Result, StoreError};
use crate::schema::Row;

/// How changed columns are combined with current values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Overwrite the column
    #[default]
    Replace,

    /// Push into lists, merge into maps
    Append,

    /// Remove from lists / maps
    Remove,
}

impl UpdateMode {
    /// Map the `append` / `remove` flag pair onto a mode
    ///
    /// Both flags at once is a caller error.
    pub fn from_flags(append: bool, remove: bool) -> Result<Self> {
        match (append, remove) {
            (true, true) => Err(StoreError::InvalidUpdateMode),
            (true, false) => Ok(UpdateMode::Append),
            (false, true) => Ok(UpdateMode::Remove),
            (false, false) => Ok(UpdateMode::Replace),
        }
    }
}

/// Apply one change to `row` in place
///
/// Fails only for a remove of something that is not there.
pub(crate) fn apply_change(
    store: &str,
    row: &mut Row,
    column: &str,
    value: Value,
    mode: UpdateMode,
) -> Result<()> {
    let value = match (mode, row.get_mut(column)) {
        (UpdateMode::Append, Some(Value::Array(items))) => {
            items.push(value);
            return Ok(());
        }
        (UpdateMode::Append, Some(Value::Object(map))) => {
            match value {
                Value::Object(extra) => map.extend(extra),
                other => {
                    tracing::warn!(
                        store = %store,
                        column = %column,
                        "Cannot merge non-object {} into map, change skipped",
                        other
                    );
                }
            }
            return Ok(());
        }
        (UpdateMode::Remove, Some(Value::Array(items))) => {
            match items.iter().position(|item| *item == value) {
                Some(position) => {
                    items.remove(position);
                    return Ok(());
                }
                None => return Err(not_in_list(store, column, &value)),
            }
        }
        (UpdateMode::Remove, Some(Value::Object(map))) => {
            let name = match &value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if map.remove(&name).is_none() {
                return Err(not_in_list(store, column, &value));
            }
            return Ok(());
        }
        _ => value,
    };

    row.insert(column.to_string(), value);
    Ok(())
}

fn not_in_list(store: &str, column: &str, value: &Value) -> StoreError {
    tracing::error!(
        store = %store,
        column = %column,
        "Cannot remove {} from {} (not found)",
        value,
        column
    );
    StoreError::NotFound(NotFound::ValueNotInList {
        column: column.to_string(),
        value: value.to_string(),
    })
}
