//! SQLite source reader implementation.
//!
//! Implements the `SourceReader` trait over a single read-only sqlx
//! connection. Schema comes from `PRAGMA table_info`; rows are streamed
//! from one forward cursor per table.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::identifier::{quote_sqlite, validate_identifier};
use crate::core::schema::{Column, Table};
use crate::core::traits::{ReadOptions, SourceReader};
use crate::core::value::{Batch, SqlValue};
use crate::dialect::{count_sql, select_sql};
use crate::error::{MigrateError, Result};

/// Connection acquire timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Batches buffered ahead of the writer.
const READ_AHEAD_BATCHES: usize = 2;

const LIST_TABLES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// SQLite source reader.
pub struct SqliteReader {
    pool: SqlitePool,
}

impl SqliteReader {
    /// Open a SQLite database file read-only.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrateError::Config(format!(
                "SQLite database not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await?;

        info!("Opened SQLite source: {}", path.display());

        Ok(Self { pool })
    }

    async fn read_schema_impl(&self, table: &str) -> Result<Table> {
        validate_identifier(table)?;

        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_sqlite(table)))
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(MigrateError::schema_read(
                table,
                "table does not exist or has no columns",
            ));
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let data_type: Option<String> = row.try_get("type")?;
            columns.push(Column {
                name: row.try_get("name")?,
                data_type: data_type
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "TEXT".to_string()),
                not_null: row.try_get::<i64, _>("notnull")? != 0,
                default: row.try_get("dflt_value")?,
                ordinal_pos: row.try_get("cid")?,
                pk_ordinal: row.try_get("pk")?,
            });
        }
        columns.sort_by_key(|c| c.ordinal_pos);

        let table = Table::new(table, columns);
        if let Some(dup) = table.duplicate_column() {
            return Err(MigrateError::schema_read(
                &table.name,
                format!("duplicate column name '{}'", dup),
            ));
        }

        debug!(
            "Read schema for {}: {} columns, pk {:?}",
            table.name,
            table.columns.len(),
            table.primary_key
        );
        Ok(table)
    }

    async fn read_rows_impl(
        pool: SqlitePool,
        opts: ReadOptions,
        tx: mpsc::Sender<Result<Batch>>,
    ) -> Result<()> {
        let sql = select_sql(&opts.table, &opts.columns);
        let batch_size = opts.batch_size.max(1);

        let mut rows = sqlx::query(&sql).fetch(&pool);
        let mut buf = Vec::with_capacity(batch_size);

        while let Some(row) = rows.try_next().await? {
            buf.push(decode_row(&row, opts.columns.len())?);
            if buf.len() == batch_size {
                let batch = Batch::new(std::mem::replace(
                    &mut buf,
                    Vec::with_capacity(batch_size),
                ));
                if tx.send(Ok(batch)).await.is_err() {
                    debug!("{}: row receiver dropped, stopping read", opts.table);
                    return Ok(());
                }
            }
        }

        if !buf.is_empty() {
            let _ = tx.send(Ok(Batch::new(buf))).await;
        }
        Ok(())
    }
}

/// Decode a row by each value's storage class.
fn decode_row(row: &SqliteRow, width: usize) -> Result<Vec<SqlValue>> {
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
        let raw = row.try_get_raw(i)?;
        if raw.is_null() {
            values.push(SqlValue::Null);
            continue;
        }

        let class = raw.type_info().name().to_string();
        let value = match class.as_str() {
            "INTEGER" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(i)?),
            "REAL" => SqlValue::Real(row.try_get_unchecked::<f64, _>(i)?),
            "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(i)?),
            _ => SqlValue::Text(row.try_get_unchecked::<String, _>(i)?),
        };
        values.push(value);
    }
    Ok(values)
}

#[async_trait]
impl SourceReader for SqliteReader {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(LIST_TABLES_SQL).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("name").map_err(MigrateError::from))
            .collect()
    }

    async fn read_schema(&self, table: &str) -> Result<Table> {
        self.read_schema_impl(table).await.map_err(|e| match e {
            e @ MigrateError::SchemaRead { .. } => e,
            e => MigrateError::schema_read(table, e),
        })
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&count_sql(table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    fn read_rows(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(READ_AHEAD_BATCHES);
        let pool = self.pool.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::read_rows_impl(pool, opts, tx.clone()).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
