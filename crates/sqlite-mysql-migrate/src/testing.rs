//! In-memory reader, writer and connector for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::schema::Table;
use crate::core::traits::{ReadOptions, SourceReader, TargetConnector, TargetWriter};
use crate::core::value::{Batch, SqlValue};
use crate::error::{MigrateError, Result};
use crate::events::{EventSink, MigrationEvent};

/// Source holding tables and rows in memory.
#[derive(Default)]
pub struct MockReader {
    tables: Vec<(Table, Vec<Vec<SqlValue>>)>,
    broken_schemas: HashSet<String>,
    read_errors: HashMap<String, usize>,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table, rows: Vec<Vec<SqlValue>>) -> Self {
        self.tables.push((table, rows));
        self
    }

    /// Table that is listed but whose schema cannot be read.
    pub fn with_broken_schema(mut self, name: &str) -> Self {
        self.broken_schemas.insert(name.to_string());
        self
    }

    /// Stream for `table` fails in place of batch `k` (1-based).
    pub fn with_read_error(mut self, table: &str, k: usize) -> Self {
        self.read_errors.insert(table.to_string(), k);
        self
    }

    fn find(&self, name: &str) -> Option<&(Table, Vec<Vec<SqlValue>>)> {
        self.tables.iter().find(|(t, _)| t.name == name)
    }
}

#[async_trait]
impl SourceReader for MockReader {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .tables
            .iter()
            .map(|(t, _)| t.name.clone())
            .chain(self.broken_schemas.iter().cloned())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn read_schema(&self, table: &str) -> Result<Table> {
        if self.broken_schemas.contains(table) {
            return Err(MigrateError::schema_read(table, "malformed table"));
        }
        self.find(table)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| MigrateError::schema_read(table, "no such table"))
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        Ok(self.find(table).map_or(0, |(_, rows)| rows.len() as u64))
    }

    fn read_rows(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(2);
        let rows = self
            .find(&opts.table)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        let batch_size = opts.batch_size.max(1);
        let fail_at = self.read_errors.get(&opts.table).copied();

        tokio::spawn(async move {
            for (i, chunk) in rows.chunks(batch_size).enumerate() {
                if fail_at == Some(i + 1) {
                    let err = MigrateError::Source(sqlx::Error::Protocol(
                        "database disk image is malformed".into(),
                    ));
                    let _ = tx.send(Err(err)).await;
                    return;
                }
                if tx.send(Ok(Batch::new(chunk.to_vec()))).await.is_err() {
                    return;
                }
            }
        });
        rx
    }

    fn db_type(&self) -> &str {
        "mock"
    }

    async fn close(&self) {}
}

/// Everything the destination saw, shared between writer and test.
#[derive(Debug, Default)]
pub struct Recorded {
    /// Non-insert statements in execution order.
    pub statements: Vec<String>,
    /// Committed rows per table.
    pub rows: HashMap<String, Vec<Vec<SqlValue>>>,
    /// Committed batches per table.
    pub batches: HashMap<String, usize>,
    pub commits: usize,
    pub closed: bool,
}

/// Failure injected into the mock destination.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Server rejects any statement containing the text.
    Statement(String),
    /// Session dies on any statement containing the text.
    Connection(String),
    /// Batch number `n` (1-based, across the run) into the table fails.
    Batch { table: String, n: usize },
}

pub struct MockWriter {
    recorded: Arc<Mutex<Recorded>>,
    faults: Vec<Fault>,
}

impl MockWriter {
    fn check(&self, sql: &str) -> Result<()> {
        for fault in &self.faults {
            match fault {
                Fault::Statement(text) if sql.contains(text.as_str()) => {
                    return Err(MigrateError::Statement {
                        code: 1064,
                        message: format!("rejected: {}", sql),
                    })
                }
                Fault::Connection(text) if sql.contains(text.as_str()) => {
                    return Err(MigrateError::connection("Lost connection to MySQL server"))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TargetWriter for MockWriter {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.check(sql)?;
        self.recorded.lock().unwrap().statements.push(sql.to_string());
        Ok(())
    }

    async fn write_batch(
        &mut self,
        table: &str,
        columns: &[String],
        batch: Batch,
    ) -> Result<u64> {
        let mut rec = self.recorded.lock().unwrap();
        let n = rec.batches.get(table).copied().unwrap_or(0) + 1;
        for fault in &self.faults {
            if let Fault::Batch { table: t, n: k } = fault {
                if t == table && *k == n {
                    return Err(MigrateError::Statement {
                        code: 1406,
                        message: "Data too long for column".into(),
                    });
                }
            }
        }
        for row in &batch.rows {
            assert_eq!(row.len(), columns.len(), "row width matches column list");
        }
        rec.batches.insert(table.to_string(), n);
        let count = batch.len() as u64;
        rec.rows
            .entry(table.to_string())
            .or_default()
            .extend(batch.rows);
        Ok(count)
    }

    async fn commit(&mut self) -> Result<()> {
        self.recorded.lock().unwrap().commits += 1;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mock"
    }

    async fn close(&mut self) {
        self.recorded.lock().unwrap().closed = true;
    }
}

/// Connector handing out [`MockWriter`]s that share one [`Recorded`].
#[derive(Default)]
pub struct MockConnector {
    pub recorded: Arc<Mutex<Recorded>>,
    faults: Vec<Fault>,
    refuse: Option<u16>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Refuse every connection with the given server code.
    pub fn refusing(mut self, code: u16) -> Self {
        self.refuse = Some(code);
        self
    }

    pub fn writer(&self) -> MockWriter {
        MockWriter {
            recorded: self.recorded.clone(),
            faults: self.faults.clone(),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.recorded.lock().unwrap().statements.clone()
    }
}

#[async_trait]
impl TargetConnector for MockConnector {
    fn endpoint(&self) -> String {
        "mock:3306".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn TargetWriter>> {
        if let Some(code) = self.refuse {
            return Err(MigrateError::Connection {
                message: "Access denied for user 'root'@'localhost'".into(),
                code: Some(code),
            });
        }
        Ok(Box::new(self.writer()))
    }
}

/// Sink collecting every event.
#[derive(Default)]
pub struct CollectSink(pub Mutex<Vec<MigrationEvent>>);

impl CollectSink {
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MigrationEvent::Log(log) => Some(log.message),
                _ => None,
            })
            .collect()
    }

    pub fn percents(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MigrationEvent::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: MigrationEvent) {
        self.0.lock().unwrap().push(event);
    }
}

/// `n` rows of `[id, name, age]`.
pub fn user_rows(n: i64) -> Vec<Vec<SqlValue>> {
    (1..=n)
        .map(|i| {
            vec![
                SqlValue::Integer(i),
                SqlValue::Text(format!("user{}", i)),
                SqlValue::Integer(20 + i),
            ]
        })
        .collect()
}
