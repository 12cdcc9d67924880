//! Core traits for the migration engine.
//!
//! - [`SourceReader`]: Reads schema and rows from the source database
//! - [`TargetWriter`]: Executes statements and batched inserts on one
//!   destination session
//! - [`TargetConnector`]: Opens that destination session
//!
//! The orchestrator and data copier only talk to these traits, so the
//! engine can be driven by in-memory implementations in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

use super::schema::Table;
use super::value::Batch;

/// Options for streaming rows out of a table.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Table name.
    pub table: String,
    /// Columns to read, in the order rows must be produced.
    pub columns: Vec<String>,
    /// Maximum number of rows per batch.
    pub batch_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            table: String::new(),
            columns: Vec::new(),
            batch_size: 1_000,
        }
    }
}

/// Read schema and data from a source database.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// List user tables in the source, sorted by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Introspect a table's columns and primary key.
    ///
    /// Fails with `MigrateError::SchemaRead` when the table does not exist,
    /// has no columns, or the metadata query fails.
    async fn read_schema(&self, table: &str) -> Result<Table>;

    /// Count the rows in a table.
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Start streaming rows from a table.
    ///
    /// Returns a channel receiver that yields batches of at most
    /// `opts.batch_size` rows in cursor order. The reader spawns a
    /// background task that populates the channel; dropping the receiver
    /// stops it.
    fn read_rows(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// One destination session. All statements on it are strictly ordered.
#[async_trait]
pub trait TargetWriter: Send {
    /// Execute a statement and commit.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Insert every row of `batch` into `table` using parameterized INSERTs
    /// (one placeholder per column) and commit the batch as a unit.
    ///
    /// Returns the number of rows written.
    async fn write_batch(&mut self, table: &str, columns: &[String], batch: Batch)
        -> Result<u64>;

    /// Commit any open work on the session.
    async fn commit(&mut self) -> Result<()>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close the session.
    async fn close(&mut self);
}

/// Opens destination sessions.
#[async_trait]
pub trait TargetConnector: Send + Sync {
    /// Human readable endpoint for log lines.
    fn endpoint(&self) -> String;

    /// Connect to the destination server.
    ///
    /// Fails with `MigrateError::Connection` when the server is unreachable
    /// or rejects the credentials.
    async fn connect(&self) -> Result<Box<dyn TargetWriter>>;
}
