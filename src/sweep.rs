//! Expiry Sweep
//!
//! Deletes rows whose expiry timestamp is in the past. The store itself
//! never expires anything; the sweep issues ordinary `delete` calls from
//! its own thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::store::Store;
use crate::timestamp;

/// Delete every row whose integer `column` is earlier than `now`
///
/// Rows without an integer expiry are skipped. A row deleted concurrently
/// by someone else is not an error. Returns the removed keys.
pub fn sweep_expired(store: &Store, column: &str, now: i64) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    for (key, row) in store.list_all()? {
        let Some(expire) = row.get(column).and_then(Value::as_i64) else {
            tracing::warn!(store = %store.name(), key = %key, column = %column, "Row has no integer expiry, skipped");
            continue;
        };

        if expire >= now {
            continue;
        }

        match store.delete(&key) {
            Ok(()) => removed.push(key),
            Err(e) if e.is_not_found() => {
                tracing::debug!(store = %store.name(), key = %key, "Expired row already gone");
            }
            Err(e) => return Err(e),
        }
    }

    if !removed.is_empty() {
        tracing::info!(store = %store.name(), removed = removed.len(), "Removed expired rows");
    }

    Ok(removed)
}

/// Background thread running `sweep_expired` on a fixed interval
///
/// The first sweep runs immediately. Dropping the sweeper stops it.
pub struct ExpirySweeper {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Start sweeping `store`
    pub fn spawn(store: Arc<Store>, column: impl Into<String>, interval: Duration) -> Result<Self> {
        let column = column.into();
        let (shutdown, signal) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name(format!("sweep-{}", store.name()))
            .spawn(move || {
                tracing::info!(store = %store.name(), "Initialized expiry sweeper");
                loop {
                    if let Err(e) = sweep_expired(&store, &column, timestamp::now()) {
                        tracing::error!(store = %store.name(), "Sweep failed: {}", e);
                    }

                    match signal.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!(store = %store.name(), "Expiry sweeper stopped");
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Start sweeping with the interval and column from `config`
    pub fn from_config(store: Arc<Store>, config: &Config) -> Result<Self> {
        Self::spawn(store, config.expiry_column.clone(), config.sweep_interval)
    }

    /// Stop the thread and wait for it
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Expiry sweeper thread panicked");
            }
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
