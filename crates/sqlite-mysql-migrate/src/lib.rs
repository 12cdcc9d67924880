//! # sqlite-mysql-migrate
//!
//! SQLite to MySQL/MariaDB migration library.
//!
//! This library reads table metadata from a SQLite file, translates column
//! types and default literals into MySQL syntax, creates the destination
//! tables and copies every row in committed batches:
//!
//! - **Type mapping** from SQLite's advisory types to concrete MySQL types
//! - **Default normalization** so literals survive the dialect change
//! - **Batched copy** with per-batch commits and progress events
//! - **Partial-failure isolation**: unreadable tables are skipped, not fatal
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlite_mysql_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sqlite_mysql_migrate::MigrateError> {
//!     let config = Config::load("config.yaml")?;
//!     let mut orchestrator = Orchestrator::from_config(config).await?;
//!     let result = orchestrator.run().await;
//!     println!("{}: {} rows", result.status, result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod transfer;
pub mod typemap;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TableErrorPolicy, TargetConfig};
pub use self::core::{Batch, Column, SourceReader, SqlValue, Table, TargetConnector, TargetWriter};
pub use drivers::{MysqlConnector, MysqlWriter, SqliteReader};
pub use error::{MigrateError, Result};
pub use events::{EventSink, LogEvent, LogLevel, MigrationEvent, Progress};
pub use orchestrator::{Orchestrator, RunResult, RunState, RunStatus, SkippedTable, TablePlan};
pub use transfer::{DataCopier, TransferStats};
pub use typemap::{map_type, sqlite_to_mysql, TypeMapping};
