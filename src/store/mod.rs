//! Store Module
//!
//! The store engine and its typed facade.
//!
//! ## Responsibilities
//! - Derive keys, coerce rows and persist them
//! - Partial updates with append / remove modes
//! - Increment / decrement of numeric columns
//! - Additive migration of existing rows
//!
//! ## Write Path
//! ```text
//! write lock → load document → apply change → coerce row
//!            → write <file>.tmp → fsync → rename over <file>
//! ```

pub(crate) mod document;
mod engine;
mod table;
mod update;

pub use document::{Document, DocumentFile};
pub use engine::Store;
pub use table::{Entity, Table};
pub use update::UpdateMode;
