//! Core abstractions for the migration engine.
//!
//! - [`schema`]: Table and column metadata types
//! - [`value`]: Cell values and row batches
//! - [`traits`]: Reader, writer and connector traits
//! - [`identifier`]: Identifier validation and dialect quoting
//!
//! Driver modules (`drivers/sqlite`, `drivers/mysql`) implement the traits;
//! the orchestrator and data copier depend only on this module.

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use schema::{Column, Table};
pub use traits::{ReadOptions, SourceReader, TargetConnector, TargetWriter};
pub use value::{Batch, SqlValue};
