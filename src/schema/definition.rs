//! Schema and store definitions
//!
//! A `Schema` is the ordered set of columns of one store. It is built once,
//! from an explicitly declared record shape, and never recomputed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::key::KeyPolicy;

use super::coerce::{coerce, normalize, Outcome};
use super::column::Column;

/// A persisted row: column name → value
pub type Row = Map<String, Value>;

/// A typed record stored in a jsonkv store
///
/// `definition()` is the statically registered shape of the record; field
/// names of the serde representation must match the declared columns.
pub trait Record: Serialize + DeserializeOwned {
    fn definition() -> Result<StoreDefinition>;
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered, immutable set of column descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names and invalid defaults
    ///
    /// Defaults are stored in canonical form, so a float column declared
    /// with `default 1` fills `1.0`.
    pub fn new(mut columns: Vec<Column>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());

        for (position, column) in columns.iter_mut().enumerate() {
            if column.name.is_empty() {
                return Err(StoreError::InvalidSchema("empty column name".to_string()));
            }
            if index.insert(column.name.clone(), position).is_some() {
                return Err(StoreError::InvalidSchema(format!(
                    "duplicate column {}",
                    column.name
                )));
            }
            if let Some(default) = &mut column.default {
                if !column.column_type.matches(default) {
                    return Err(StoreError::InvalidSchema(format!(
                        "default {} of column {} is not a {}",
                        default,
                        column.name,
                        column.column_type.name()
                    )));
                }
                *default = normalize(column.column_type, default);
            }
        }

        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Coerce every declared column of `raw` into a persistable row
    ///
    /// Invalid values without a default become the zero value when
    /// `allow_invalid_values` is set; otherwise the row is rejected.
    /// Undeclared keys of `raw` are dropped.
    pub fn coerce_row(&self, store: &str, allow_invalid_values: bool, raw: &Row) -> Result<Row> {
        let mut row = Row::new();

        for column in &self.columns {
            let coerced = coerce(column, raw.get(&column.name));

            match coerced.outcome {
                Outcome::Accepted | Outcome::Filled => {}
                Outcome::Converted => {
                    tracing::debug!(
                        store = %store,
                        column = %column.name,
                        "Converted value to {}",
                        column.column_type.name()
                    );
                }
                Outcome::Substituted => {
                    tracing::warn!(
                        store = %store,
                        column = %column.name,
                        "Value {:?} did not pass column, replaced with default",
                        raw.get(&column.name)
                    );
                }
                Outcome::Invalid if allow_invalid_values => {
                    tracing::error!(
                        store = %store,
                        column = %column.name,
                        "Value {:?} did not pass column and it has no default, using {} zero value",
                        raw.get(&column.name),
                        column.column_type.name()
                    );
                }
                Outcome::Invalid => {
                    tracing::error!(
                        store = %store,
                        column = %column.name,
                        "Value {:?} did not pass column, invalid values are not allowed, row will not be saved",
                        raw.get(&column.name)
                    );
                    return Err(StoreError::SchemaCoercionRejected {
                        store: store.to_string(),
                        column: column.name.clone(),
                    });
                }
            }

            row.insert(column.name.clone(), coerced.value);
        }

        for name in raw.keys().filter(|name| !self.contains(name)) {
            tracing::warn!(store = %store, column = %name, "Dropping undeclared column");
        }

        Ok(row)
    }

    /// Add every missing declared column to `row`; returns whether it changed
    pub fn fill_missing(&self, row: &mut Row) -> bool {
        let mut changed = false;
        for column in &self.columns {
            if !row.contains_key(&column.name) {
                row.insert(column.name.clone(), coerce(column, None).value);
                changed = true;
            }
        }
        changed
    }
}

// =============================================================================
// Store Definition
// =============================================================================

/// Everything needed to open one store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDefinition {
    name: String,
    key_policy: KeyPolicy,
    file_path: Option<PathBuf>,
    allow_invalid_values: bool,
    dump_on_corruption: bool,
    schema: Schema,
}

impl StoreDefinition {
    /// Start a definition builder
    pub fn builder(name: impl Into<String>, key_policy: KeyPolicy) -> DefinitionBuilder {
        DefinitionBuilder {
            name: name.into(),
            key_policy,
            file_path: None,
            allow_invalid_values: true,
            dump_on_corruption: true,
            columns: Vec::new(),
        }
    }

    /// Parse a definition from its JSON form
    ///
    /// ```json
    /// { "name": "shares", "key_policy": "!code",
    ///   "columns": [ { "name": "code", "type": "integer" } ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: DefinitionFile = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidSchema(format!("bad definition: {}", e)))?;

        let mut builder = StoreDefinition::builder(raw.name, raw.key_policy)
            .allow_invalid_values(raw.allow_invalid_values)
            .dump_on_corruption(raw.dump_on_corruption)
            .columns(raw.columns);
        if let Some(path) = raw.file_path {
            builder = builder.file_path(path);
        }
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_policy(&self) -> &KeyPolicy {
        &self.key_policy
    }

    /// Explicit file path, if one was declared
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// File path, defaulting to `<data_dir>/<name>.json`
    pub fn resolve_path(&self, data_dir: &Path) -> PathBuf {
        match &self.file_path {
            Some(path) => path.clone(),
            None => data_dir.join(format!("{}.json", self.name)),
        }
    }

    pub fn allow_invalid_values(&self) -> bool {
        self.allow_invalid_values
    }

    pub fn dump_on_corruption(&self) -> bool {
        self.dump_on_corruption
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Builder for StoreDefinition
pub struct DefinitionBuilder {
    name: String,
    key_policy: KeyPolicy,
    file_path: Option<PathBuf>,
    allow_invalid_values: bool,
    dump_on_corruption: bool,
    columns: Vec<Column>,
}

impl DefinitionBuilder {
    /// Append a column (declaration order is kept)
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Override the default `<data_dir>/<name>.json` location
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Replace invalid values with zero values instead of rejecting the row
    pub fn allow_invalid_values(mut self, allow: bool) -> Self {
        self.allow_invalid_values = allow;
        self
    }

    /// Dump and reset a corrupted document instead of failing to open
    pub fn dump_on_corruption(mut self, dump: bool) -> Self {
        self.dump_on_corruption = dump;
        self
    }

    pub fn build(self) -> Result<StoreDefinition> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidSchema("empty store name".to_string()));
        }

        let schema = Schema::new(self.columns)?;

        for attribute in self.key_policy.attributes() {
            if !schema.contains(attribute) {
                return Err(StoreError::InvalidSchema(format!(
                    "key attribute {} of store {} is not a declared column",
                    attribute, self.name
                )));
            }
        }

        Ok(StoreDefinition {
            name: self.name,
            key_policy: self.key_policy,
            file_path: self.file_path,
            allow_invalid_values: self.allow_invalid_values,
            dump_on_corruption: self.dump_on_corruption,
            schema,
        })
    }
}

/// On-disk form of a definition
#[derive(Deserialize)]
struct DefinitionFile {
    name: String,
    key_policy: KeyPolicy,
    #[serde(default)]
    file_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    allow_invalid_values: bool,
    #[serde(default = "default_true")]
    dump_on_corruption: bool,
    columns: Vec<Column>,
}

fn default_true() -> bool {
    true
}
