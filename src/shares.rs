//! Shared-file records
//!
//! Upload metadata persisted by the file-sharing service: one row per share
//! code, expired by the sweep through `date_expire`.
//!
//! ## Responsibilities
//! - Share record, lifetimes and owner hashing
//! - Admission checks against `Config` limits (quota, size, storage budget)
//! - Unique random share codes
//! - Lookup that treats expired shares as gone

use std::collections::HashSet;
use std::ops::Range;

use chrono::Duration;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{Result, ShareRejection, StoreError};
use crate::key::KeyPolicy;
use crate::schema::{Column, ColumnType, Record, StoreDefinition};
use crate::store::{Entity, Table};
use crate::timestamp;

/// Name of the shares store
pub const SHARES_STORE: &str = "shares";

/// Share codes are five digits
pub const CODE_RANGE: Range<i64> = 10_000..99_999;

/// How long a share stays available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Lifetime {
    Minutes15 = 0,
    Hours1 = 1,
    Hours12 = 2,
    Days1 = 3,
    Days3 = 4,
}

impl Lifetime {
    pub fn duration(&self) -> Duration {
        match self {
            Lifetime::Minutes15 => Duration::minutes(15),
            Lifetime::Hours1 => Duration::hours(1),
            Lifetime::Hours12 => Duration::hours(12),
            Lifetime::Days1 => Duration::days(1),
            Lifetime::Days3 => Duration::days(3),
        }
    }
}

impl TryFrom<i64> for Lifetime {
    type Error = StoreError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Lifetime::Minutes15),
            1 => Ok(Lifetime::Hours1),
            2 => Ok(Lifetime::Hours12),
            3 => Ok(Lifetime::Days1),
            4 => Ok(Lifetime::Days3),
            other => Err(StoreError::Config(format!("invalid lifetime {}", other))),
        }
    }
}

impl From<Lifetime> for i64 {
    fn from(lifetime: Lifetime) -> Self {
        lifetime as i64
    }
}

/// One shared upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFile {
    pub code: i64,
    pub name: String,
    pub size: i64,
    pub date_created: i64,
    pub date_expire: i64,
    pub owner_ip: String,
}

impl SharedFile {
    /// Metadata for a new upload created at `now`
    ///
    /// `owner` is hashed before it is stored.
    pub fn new(
        code: i64,
        name: impl Into<String>,
        size: i64,
        owner: &str,
        lifetime: Lifetime,
        now: i64,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            size,
            date_created: now,
            date_expire: timestamp::add_duration(now, lifetime.duration()),
            owner_ip: hash_owner(owner),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.date_expire < now
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner_ip == hash_owner(owner)
    }
}

impl Record for SharedFile {
    fn definition() -> Result<StoreDefinition> {
        StoreDefinition::builder(SHARES_STORE, KeyPolicy::raw(["code"]))
            .column(Column::required("code", ColumnType::Integer))
            .column(Column::required("name", ColumnType::String))
            .column(Column::required("size", ColumnType::Integer))
            .column(Column::required("date_created", ColumnType::Integer))
            .column(Column::required("date_expire", ColumnType::Integer))
            .column(Column::required("owner_ip", ColumnType::String))
            .build()
    }
}

/// SHA-256 hex of an owner identifier
pub fn hash_owner(owner: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Store Operations
// =============================================================================

/// Bytes used by every stored share
pub fn total_space_usage(shares: &Table<SharedFile>) -> Result<u64> {
    Ok(shares
        .list_all()?
        .iter()
        .map(|share| u64::try_from(share.size).unwrap_or(0))
        .sum())
}

/// Whether `size` more bytes fit in the storage budget
pub fn is_space_available(shares: &Table<SharedFile>, size: u64, config: &Config) -> Result<bool> {
    Ok(total_space_usage(shares)?.saturating_add(size) < config.max_data_size)
}

/// Whether `owner` may create another share
pub fn can_create_code(shares: &Table<SharedFile>, owner: &str, config: &Config) -> Result<bool> {
    let hashed = hash_owner(owner);
    let current = shares
        .list_all()?
        .iter()
        .filter(|share| share.owner_ip == hashed)
        .count();
    Ok(current < config.max_shares_per_owner)
}

/// A random code from `CODE_RANGE` not used by any stored share
pub fn generate_code(shares: &Table<SharedFile>) -> Result<i64> {
    let taken: HashSet<String> = shares.list_keys()?.into_iter().collect();
    let available = (CODE_RANGE.end - CODE_RANGE.start) as usize;
    if taken.len() >= available {
        return Err(StoreError::ShareRejected(ShareRejection::CodesExhausted));
    }

    let mut rng = rand::thread_rng();
    loop {
        let code = rng.gen_range(CODE_RANGE);
        if !taken.contains(&code.to_string()) {
            return Ok(code);
        }
    }
}

/// Admit and store a new share created at `now`
///
/// Checks, in order: the owner's quota, the per-transfer size limit and
/// the storage budget.
pub fn create_share(
    shares: &Table<SharedFile>,
    name: &str,
    size: u64,
    owner: &str,
    lifetime: Lifetime,
    config: &Config,
    now: i64,
) -> Result<SharedFile> {
    if !can_create_code(shares, owner, config)? {
        return Err(StoreError::ShareRejected(ShareRejection::QuotaExceeded));
    }
    if size > config.max_transfer_size {
        return Err(StoreError::ShareRejected(ShareRejection::TooLarge));
    }
    if !is_space_available(shares, size, config)? {
        return Err(StoreError::ShareRejected(ShareRejection::StorageFull));
    }

    let size = i64::try_from(size)
        .map_err(|_| StoreError::ShareRejected(ShareRejection::TooLarge))?;
    let share = SharedFile::new(generate_code(shares)?, name, size, owner, lifetime, now);
    shares.insert(&share)?;

    tracing::info!(code = share.code, name = %share.name, size = share.size, "Stored new share");
    Ok(share)
}

/// The live share with `code`
///
/// A share whose expiry is before `now` is reported as not found, even if
/// the sweep has not removed it yet.
pub fn get_shared_file(shares: &Table<SharedFile>, code: i64, now: i64) -> Result<Entity<SharedFile>> {
    let key = code.to_string();
    let share = shares.get(&key)?;

    if share.is_expired(now) {
        tracing::error!(code = code, "Share requested after expiry");
        return Err(StoreError::key_not_found(SHARES_STORE, &key));
    }

    Ok(share)
}

/// Delete the share with `code` on behalf of `owner`
pub fn delete_owned(shares: &Table<SharedFile>, code: i64, owner: &str) -> Result<()> {
    let key = code.to_string();
    if !shares.get(&key)?.is_owned_by(owner) {
        return Err(StoreError::ShareRejected(ShareRejection::NotOwner));
    }

    shares.delete(&key)?;
    tracing::info!(code = code, "Removed share");
    Ok(())
}
