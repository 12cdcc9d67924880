//! MySQL/MariaDB target writer implementation.
//!
//! Implements the `TargetWriter` trait over one mysql_async connection.
//! There is no pool: a run is a single ordered session, so `USE` and
//! `SET FOREIGN_KEY_CHECKS` issued early stay in effect for every later
//! statement.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, TxOpts};
use tracing::{debug, info};

use crate::config::TargetConfig;
use crate::core::traits::{TargetConnector, TargetWriter};
use crate::core::value::Batch;
use crate::dialect::insert_sql;
use crate::error::{MigrateError, Result};

/// MySQL limit on placeholders in one prepared statement.
const MYSQL_MAX_PLACEHOLDERS: usize = 65_535;

/// Opens [`MysqlWriter`] sessions from target configuration.
#[derive(Debug, Clone)]
pub struct MysqlConnector {
    config: TargetConfig,
}

impl MysqlConnector {
    pub fn new(config: TargetConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TargetConnector for MysqlConnector {
    fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    async fn connect(&self) -> Result<Box<dyn TargetWriter>> {
        let writer = MysqlWriter::connect(&self.config).await?;
        Ok(Box::new(writer))
    }
}

/// MySQL target writer on a single connection.
pub struct MysqlWriter {
    conn: Option<Conn>,
}

impl MysqlWriter {
    /// Connect without selecting a database; the orchestrator issues `USE`
    /// once the database is known to exist.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.as_str())
            .tcp_port(config.port)
            .user(Some(config.user.as_str()))
            .pass(Some(config.password.as_str()))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        let mut conn = Conn::new(opts).await.map_err(connect_error)?;
        conn.query_drop("SELECT 1").await.map_err(connect_error)?;

        info!("Connected to MySQL target: {}", config.endpoint());
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| MigrateError::connection("MySQL session already closed"))
    }
}

/// Any failure while opening the session is fatal, server rejections
/// included.
fn connect_error(err: mysql_async::Error) -> MigrateError {
    match err {
        mysql_async::Error::Server(server) => MigrateError::Connection {
            message: server.message,
            code: Some(server.code),
        },
        other => MigrateError::connection(other),
    }
}

/// Rows per INSERT statement for a given column count.
fn rows_per_statement(num_cols: usize) -> usize {
    (MYSQL_MAX_PLACEHOLDERS / num_cols.max(1)).max(1)
}

#[async_trait]
impl TargetWriter for MysqlWriter {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn()?.query_drop(sql).await?;
        Ok(())
    }

    async fn write_batch(
        &mut self,
        table: &str,
        columns: &[String],
        batch: Batch,
    ) -> Result<u64> {
        let rows = batch.rows;
        if rows.is_empty() || columns.is_empty() {
            return Ok(0);
        }

        let row_count = rows.len() as u64;
        let chunk_rows = rows_per_statement(columns.len());

        let conn = self.conn()?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;

        for chunk in rows.chunks(chunk_rows) {
            let sql = insert_sql(table, columns, chunk.len());
            let params: Vec<mysql_async::Value> = chunk
                .iter()
                .flat_map(|row| row.iter().cloned().map(mysql_async::Value::from))
                .collect();

            tx.exec_drop(&sql, params).await?;
        }

        tx.commit().await?;

        debug!("MySQL: wrote {} rows to {}", row_count, table);
        Ok(row_count)
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn()?.query_drop("COMMIT").await?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await.ok();
        }
    }
}
