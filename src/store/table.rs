//! Typed access to a store
//!
//! `Table<T>` converts between `T: Record` and rows; `Entity<T>` carries the
//! storage key a record was loaded from.

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::schema::{Record, Row};

use super::engine::Store;
use super::update::UpdateMode;

/// A record loaded from a store, plus its (non-persisted) key
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<T> {
    key: String,
    record: T,
}

impl<T> Entity<T> {
    pub fn new(key: impl Into<String>, record: T) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }

    pub fn into_parts(self) -> (String, T) {
        (self.key, self.record)
    }
}

impl<T> Deref for Entity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

/// Typed handle on a shared `Store`
pub struct Table<T> {
    store: Arc<Store>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Table<T> {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// The untyped store underneath
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn insert(&self, record: &T) -> Result<String> {
        self.store.insert(&to_row(record)?)
    }

    pub fn insert_with_key(&self, key: &str, record: &T) -> Result<()> {
        self.store.insert_with_key(key, &to_row(record)?)
    }

    pub fn get(&self, key: &str) -> Result<Entity<T>> {
        let row = self.store.get(key)?;
        Ok(Entity::new(key, from_row(row)?))
    }

    pub fn update<I, K>(&self, key: &str, changes: I, mode: UpdateMode) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.store.update(key, changes, mode)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key)
    }

    pub fn increment(&self, key: &str, column: &str) -> Result<bool> {
        self.store.increment(key, column)
    }

    pub fn decrement(&self, key: &str, column: &str) -> Result<bool> {
        self.store.decrement(key, column)
    }

    /// Every row as an entity, in document order
    pub fn list_all(&self) -> Result<Vec<Entity<T>>> {
        self.store
            .list_all()?
            .into_iter()
            .map(|(key, row)| Ok(Entity::new(key, from_row(row)?)))
            .collect()
    }

    pub fn list_keys(&self) -> Result<Vec<String>> {
        self.store.list_keys()
    }

    pub fn migrate(&self) -> Result<usize> {
        self.store.migrate()
    }
}

fn to_row<T: Record>(record: &T) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Serialization(format!(
            "record must serialize to an object, got {}",
            other
        ))),
    }
}

fn from_row<T: Record>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}
