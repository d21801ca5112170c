//! Store Registry
//!
//! Holds exactly one open `Store` per store name. The registry is an
//! explicit object: create one at startup and share it (behind an `Arc`)
//! with everything that needs a store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::Result;
use crate::schema::{Record, StoreDefinition};
use crate::store::{Store, Table};

/// Process-wide cache of open stores
///
/// ## Concurrency:
/// - `stores`: RwLock; lookups take the read lock, the first open of a
///   name takes the write lock so two callers cannot both open it
pub struct StoreRegistry {
    /// Shared configuration for every store
    config: Config,

    /// Open stores by name
    stores: RwLock<HashMap<String, Arc<Store>>>,
}

impl StoreRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Return the store named by `definition`, opening it on first use
    ///
    /// A later call with a different definition for the same name gets the
    /// already open store unchanged.
    pub fn get_or_create(&self, definition: StoreDefinition) -> Result<Arc<Store>> {
        if let Some(store) = self.lookup(definition.name()) {
            Self::warn_if_redefined(&store, &definition);
            return Ok(store);
        }

        let mut stores = self.stores.write();

        // Another caller may have opened it between the two locks
        if let Some(store) = stores.get(definition.name()) {
            Self::warn_if_redefined(store, &definition);
            return Ok(Arc::clone(store));
        }

        let name = definition.name().to_string();
        let store = Arc::new(Store::open(definition, &self.config)?);
        tracing::debug!(store = %name, path = %store.path().display(), "Registered store");
        stores.insert(name, Arc::clone(&store));

        Ok(store)
    }

    /// Typed handle on the store of record type `T`
    pub fn table<T: Record>(&self) -> Result<Table<T>> {
        let store = self.get_or_create(T::definition()?)?;
        Ok(Table::new(store))
    }

    /// An already open store
    pub fn lookup(&self, name: &str) -> Option<Arc<Store>> {
        self.stores.read().get(name).cloned()
    }

    /// Names of all open stores, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn warn_if_redefined(store: &Store, definition: &StoreDefinition) {
        if store.definition() != definition {
            tracing::warn!(
                store = %definition.name(),
                "Store already open with a different definition, keeping the open one"
            );
        }
    }
}
