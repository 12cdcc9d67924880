//! Database driver implementations.
//!
//! Each driver implements one side of the core traits:
//!
//! - [`sqlite`]: `SourceReader` over a SQLite file (sqlx)
//! - [`mysql`]: `TargetConnector` / `TargetWriter` over one MySQL session (mysql_async)

pub mod mysql;
pub mod sqlite;

pub use mysql::{MysqlConnector, MysqlWriter};
pub use sqlite::SqliteReader;
