//! Store Engine
//!
//! CRUD, increment and migration over one JSON document file.

use std::path::Path;

use parking_lot::RwLock;
use serde_json::Value;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::recovery::DocumentRecovery;
use crate::schema::{Row, Schema, StoreDefinition};

use super::document::{Document, DocumentFile};
use super::update::{apply_change, UpdateMode};

/// One open store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (insert/update/delete/increment/migrate): hold the write
///   guard for the whole load → modify → save cycle, so two writers never
///   interleave and no update is lost
/// - **Reads** (get/list): hold the read guard; they never observe a
///   half-applied write
///
/// Every operation reads the full document and every write replaces it
/// atomically; there is no in-memory cache.
pub struct Store {
    /// Name, key policy, columns
    definition: StoreDefinition,

    /// Backing document (owned exclusively by this store)
    file: DocumentFile,

    /// Serializes mutations
    lock: RwLock<()>,
}

/// Direction of `step`
#[derive(Debug, Clone, Copy)]
enum Step {
    Up,
    Down,
}

impl Store {
    /// Open or create the store described by `definition`
    ///
    /// On startup:
    /// 1. Create the document (and its directory) if missing
    /// 2. Otherwise parse it, running corruption recovery on failure
    pub fn open(definition: StoreDefinition, config: &Config) -> Result<Self> {
        let path = definition.resolve_path(&config.data_dir);
        let file = DocumentFile::new(path, config.sync_on_write);

        if file.ensure_exists()? {
            tracing::debug!(store = %definition.name(), path = %file.path().display(), "Created empty document");
        } else {
            let recovery = DocumentRecovery::recover(&file, definition.dump_on_corruption())?;
            tracing::debug!(
                store = %definition.name(),
                rows = recovery.document.len(),
                reset = recovery.was_reset,
                "Opened document"
            );
        }

        Ok(Self {
            definition,
            file,
            lock: RwLock::new(()),
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a row under the key derived from the store's policy
    ///
    /// Attribute-derived and exact keys overwrite an existing row with the
    /// same key. Returns the key.
    pub fn insert(&self, raw: &Row) -> Result<String> {
        let _write_guard = self.lock.write();

        let row = self.coerce(raw)?;
        let key = self.definition.key_policy().derive(&row)?;

        let mut document = self.file.load()?;
        if document.insert(key.clone(), row).is_some() {
            tracing::debug!(store = %self.name(), key = %key, "Overwrote existing row");
        }
        self.file.save(&document)?;

        Ok(key)
    }

    /// Insert a row under an explicit key, ignoring the key policy
    pub fn insert_with_key(&self, key: &str, raw: &Row) -> Result<()> {
        let _write_guard = self.lock.write();

        let row = self.coerce(raw)?;
        let mut document = self.file.load()?;
        document.insert(key.to_string(), row);
        self.file.save(&document)
    }

    /// Apply `changes` to the row at `key`
    ///
    /// Undeclared columns are skipped; a failed remove rejects the whole
    /// update. The merged row is coerced and saved under the same key.
    pub fn update<I, K>(&self, key: &str, changes: I, mode: UpdateMode) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let _write_guard = self.lock.write();

        let mut document = self.file.load()?;
        let mut row = document
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::key_not_found(self.name(), key))?;

        for (column, value) in changes {
            let column = column.into();
            if !self.schema().contains(&column) {
                tracing::error!(
                    store = %self.name(),
                    column = %column,
                    "Cannot change value of undeclared column"
                );
                continue;
            }
            apply_change(self.name(), &mut row, &column, value, mode)?;
        }

        let row = self.coerce(&row)?;
        document.insert(key.to_string(), row);
        self.file.save(&document)
    }

    /// `update` with the `append` / `remove` flag pair
    ///
    /// Both flags at once fails with `InvalidUpdateMode` before anything is
    /// read or written.
    pub fn update_with_flags<I, K>(
        &self,
        key: &str,
        changes: I,
        append: bool,
        remove: bool,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mode = UpdateMode::from_flags(append, remove).map_err(|e| {
            tracing::error!(store = %self.name(), "update called with both append and remove");
            e
        })?;
        self.update(key, changes, mode)
    }

    /// Remove the row at `key`
    pub fn delete(&self, key: &str) -> Result<()> {
        let _write_guard = self.lock.write();

        let mut document = self.file.load()?;
        if document.remove(key).is_none() {
            return Err(StoreError::key_not_found(self.name(), key));
        }
        self.file.save(&document)
    }

    /// Add one to a numeric column
    ///
    /// Returns `false` (and writes nothing) if the current value is not a
    /// number.
    pub fn increment(&self, key: &str, column: &str) -> Result<bool> {
        self.step(key, column, Step::Up)
    }

    /// Subtract one from a numeric column
    pub fn decrement(&self, key: &str, column: &str) -> Result<bool> {
        self.step(key, column, Step::Down)
    }

    /// Fill every declared column missing from a row
    ///
    /// Saves once if anything changed; returns the number of changed rows.
    pub fn migrate(&self) -> Result<usize> {
        let _write_guard = self.lock.write();

        let mut document = self.file.load()?;
        let mut changed = 0;
        for row in document.values_mut() {
            if self.schema().fill_missing(row) {
                changed += 1;
            }
        }

        if changed > 0 {
            tracing::info!(store = %self.name(), rows = changed, "Migration: saving updated rows");
            self.file.save(&document)?;
        }

        Ok(changed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Row stored at `key`
    pub fn get(&self, key: &str) -> Result<Row> {
        let document = self.read_document()?;
        document
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::key_not_found(self.name(), key))
    }

    /// Every `(key, row)` pair in document order
    pub fn list_all(&self) -> Result<Vec<(String, Row)>> {
        Ok(self.read_document()?.into_iter().collect())
    }

    /// Every key in document order
    pub fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.read_document()?.into_keys().collect())
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read_document()?.contains_key(key))
    }

    /// Number of rows
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_document()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &StoreDefinition {
        &self.definition
    }

    pub fn schema(&self) -> &Schema {
        self.definition.schema()
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn read_document(&self) -> Result<Document> {
        let _read_guard = self.lock.read();
        self.file.load()
    }

    fn coerce(&self, raw: &Row) -> Result<Row> {
        self.schema()
            .coerce_row(self.name(), self.definition.allow_invalid_values(), raw)
    }

    fn step(&self, key: &str, column: &str, step: Step) -> Result<bool> {
        if !self.schema().contains(column) {
            return Err(StoreError::column_not_found(self.name(), column));
        }

        let _write_guard = self.lock.write();

        let mut document = self.file.load()?;
        let mut row = document
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::key_not_found(self.name(), key))?;

        let stepped = match row.get(column) {
            Some(Value::Number(n)) if n.is_i64() => n.as_i64().and_then(|v| match step {
                Step::Up => v.checked_add(1),
                Step::Down => v.checked_sub(1),
            })
            .map(Value::from),
            Some(Value::Number(n)) if n.is_f64() => n.as_f64().map(|v| match step {
                Step::Up => Value::from(v + 1.0),
                Step::Down => Value::from(v - 1.0),
            }),
            _ => None,
        };

        let Some(value) = stepped else {
            tracing::debug!(store = %self.name(), key = %key, column = %column, "Value is not a steppable number");
            return Ok(false);
        };

        row.insert(column.to_string(), value);
        let row = self.coerce(&row)?;
        document.insert(key.to_string(), row);
        self.file.save(&document)?;

        Ok(true)
    }
}
