//! # jsonkv
//!
//! A schema-declared, JSON-file-backed embedded document store with:
//! - Typed columns with defensive coercion and defaults
//! - Exact, generated and attribute-derived (SHA-1) keys
//! - Partial updates with list/map append and remove modes
//! - Self-healing on corrupted documents (dump and reset)
//! - Additive, idempotent schema migration
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StoreRegistry                          │
//! │               (one Store per store name)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Store / Table<T>                          │
//! │            (Single Writer / Multi Reader)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────┐
//!          │            │            │
//!          ▼            ▼            ▼
//!   ┌───────────┐ ┌───────────┐ ┌───────────┐
//!   │  Schema   │ │ KeyPolicy │ │ Recovery  │
//!   │ (coerce)  │ │ (derive)  │ │ (dump)    │
//!   └───────────┘ └───────────┘ └─────┬─────┘
//!                                     │
//!                                     ▼
//!                             ┌─────────────┐
//!                             │  Document   │
//!                             │ (JSON file) │
//!                             └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod key;
pub mod store;
pub mod recovery;
pub mod registry;
pub mod sweep;
pub mod shares;
pub mod timestamp;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{NotFound, Result, ShareRejection, StoreError};
pub use key::KeyPolicy;
pub use registry::StoreRegistry;
pub use schema::{Column, ColumnType, Record, Row, StoreDefinition};
pub use store::{Entity, Store, Table, UpdateMode};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of jsonkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
