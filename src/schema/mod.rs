//! Schema Module
//!
//! Declared record shapes and the coercion rules applied to every write.
//!
//! ## Responsibilities
//! - Describe columns (name, type, default / required)
//! - Coerce raw JSON values into declared types
//! - Build a row containing every declared column, or reject it
//! - Fill newly declared columns into existing rows (migration)
//!
//! ## Row Layout
//! ```text
//! {
//!   "<storage key>": {            ← Row
//!     "<column>": <value>,        ← one entry per declared column
//!     ...
//!   }
//! }
//! ```

mod coerce;
mod column;
mod definition;

pub use coerce::{coerce, Coerced, Outcome};
pub use column::{Column, ColumnType};
pub use definition::{DefinitionBuilder, Record, Row, Schema, StoreDefinition};
