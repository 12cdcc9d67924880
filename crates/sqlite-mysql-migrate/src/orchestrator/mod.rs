//! Migration orchestrator - main workflow coordinator.
//!
//! A run is strictly sequential over one destination session:
//!
//! 1. connect
//! 2. `SET FOREIGN_KEY_CHECKS = 0` (optional)
//! 3. `CREATE DATABASE IF NOT EXISTS` (optional), then `USE`
//! 4. per table: read schema, drop (optional), create, copy
//! 5. `SET FOREIGN_KEY_CHECKS = 1` if it was disabled, then commit
//!
//! A table whose schema cannot be read is skipped. DDL and copy failures
//! follow [`TableErrorPolicy`]. Anything that breaks the session aborts the
//! rest of the run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, TableErrorPolicy};
use crate::core::schema::Table;
use crate::core::traits::{SourceReader, TargetConnector, TargetWriter};
use crate::dialect::{
    build_create_table, create_database_sql, drop_table_sql, foreign_key_checks_sql,
    use_database_sql,
};
use crate::drivers::{MysqlConnector, SqliteReader};
use crate::error::{MigrateError, Result};
use crate::events::{Emitter, EventSink, MigrationEvent, ProgressTracker};
use crate::transfer::DataCopier;
use crate::typemap::map_type;

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Connecting,
    Running {
        table: String,
        /// 1-based position of the table in the run.
        index: usize,
        total: usize,
    },
    Finished {
        status: RunStatus,
    },
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every table migrated.
    Completed,
    /// Finished, but one or more tables were skipped.
    CompletedWithSkips,
    /// Stopped by a fatal error.
    Aborted,
    /// Stopped by a cancellation request.
    Cancelled,
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::CompletedWithSkips)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithSkips => "completed_with_skips",
            RunStatus::Aborted => "aborted",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A table left out of the run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTable {
    pub table: String,
    pub reason: String,
}

/// The error that ended an aborted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub message: String,
    pub hint: Option<String>,
    pub exit_code: u8,
}

impl From<&MigrateError> for RunError {
    fn from(e: &MigrateError) -> Self {
        Self {
            message: e.to_string(),
            hint: e.hint().map(str::to_string),
            exit_code: e.exit_code(),
        }
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run ended.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables selected for the run.
    pub tables_total: usize,

    /// Tables fully migrated.
    pub tables_success: usize,

    /// Tables skipped, in run order.
    pub skipped_tables: Vec<SkippedTable>,

    /// Total rows committed to the destination.
    pub rows_transferred: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    /// Set when the run was aborted or cancelled.
    pub error: Option<RunError>,
}

impl RunResult {
    /// Convert result to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self.status {
            RunStatus::Completed | RunStatus::CompletedWithSkips => 0,
            _ => self.error.as_ref().map_or(1, |e| e.exit_code),
        }
    }
}

/// DDL that a run would execute for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table: String,
    /// `CREATE TABLE` statement, or the schema read error.
    pub ddl: std::result::Result<String, String>,
    /// Lossy type mappings.
    pub warnings: Vec<String>,
}

/// Running counters for one run.
#[derive(Debug, Default)]
struct Tally {
    tables_success: usize,
    skipped: Vec<SkippedTable>,
    rows: u64,
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetConnector>,
    events: Emitter,
    cancel: CancellationToken,
    state: RunState,
}

impl Orchestrator {
    /// Create an orchestrator over explicit source and destination.
    pub fn new(
        config: Config,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetConnector>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            events: Emitter::silent(),
            cancel: CancellationToken::new(),
            state: RunState::Idle,
        }
    }

    /// Open the SQLite file and prepare a MySQL connector from `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let source = SqliteReader::open(&config.source.path).await?;
        let target = MysqlConnector::new(config.target.clone());
        Ok(Self::new(config, Arc::new(source), Arc::new(target)))
    }

    /// Attach an event listener.
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Emitter::new(sink);
        self
    }

    /// Use `cancel` to stop the run between batches and tables.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tables this run covers: the configured selection, or every source
    /// table when the selection is empty.
    pub async fn resolve_tables(&self) -> Result<Vec<String>> {
        if self.config.migration.tables.is_empty() {
            self.source.list_tables().await
        } else {
            Ok(self.config.migration.tables.clone())
        }
    }

    /// Generate the DDL for every selected table without touching the
    /// destination.
    pub async fn plan(&self) -> Result<Vec<TablePlan>> {
        let mut plans = Vec::new();
        for name in self.resolve_tables().await? {
            let plan = match self.source.read_schema(&name).await {
                Ok(table) => TablePlan {
                    warnings: lossy_mappings(&table),
                    ddl: Ok(build_create_table(&table)),
                    table: name,
                },
                Err(e) => TablePlan {
                    table: name,
                    ddl: Err(e.to_string()),
                    warnings: Vec::new(),
                },
            };
            plans.push(plan);
        }
        Ok(plans)
    }

    /// Run the migration.
    ///
    /// Never returns an error: failures are reflected in the result status
    /// and in the emitted log events.
    pub async fn run(&mut self) -> RunResult {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        debug!("Starting migration run: {}", run_id);

        let mut tally = Tally::default();
        let mut tables_total = 0;

        let outcome = match self.resolve_tables().await {
            Ok(tables) => {
                tables_total = tables.len();
                self.connect_and_migrate(&tables, &mut tally).await
            }
            Err(e) => Err(e),
        };

        let (status, error) = match outcome {
            Ok(()) if tally.skipped.is_empty() => {
                self.events.info("Migration completed successfully.");
                (RunStatus::Completed, None)
            }
            Ok(()) => {
                let names: Vec<&str> = tally.skipped.iter().map(|s| s.table.as_str()).collect();
                self.events.info(format!(
                    "Migration completed with {} skipped table(s): {}",
                    names.len(),
                    names.join(", ")
                ));
                (RunStatus::CompletedWithSkips, None)
            }
            Err(MigrateError::Cancelled) => {
                self.events.error("Migration cancelled.");
                (
                    RunStatus::Cancelled,
                    Some(RunError::from(&MigrateError::Cancelled)),
                )
            }
            Err(e) => {
                self.events.error(format!("Migration aborted: {}", e));
                if let Some(hint) = e.hint() {
                    self.events.error(hint);
                }
                (RunStatus::Aborted, Some(RunError::from(&e)))
            }
        };

        self.state = RunState::Finished { status };
        self.events.emit(MigrationEvent::RunFinished { status });

        let duration = timer.elapsed().as_secs_f64();
        let rows_per_second = if duration > 0.0 {
            (tally.rows as f64 / duration) as u64
        } else {
            0
        };

        RunResult {
            run_id,
            status,
            started_at,
            completed_at: Utc::now(),
            duration_seconds: duration,
            tables_total,
            tables_success: tally.tables_success,
            skipped_tables: tally.skipped,
            rows_transferred: tally.rows,
            rows_per_second,
            error,
        }
    }

    async fn connect_and_migrate(&mut self, tables: &[String], tally: &mut Tally) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        self.state = RunState::Connecting;
        self.events
            .info(format!("Connecting to MySQL at {}…", self.target.endpoint()));
        let mut writer = self.target.connect().await?;
        debug!(
            "Connected: {} source -> {} target",
            self.source.db_type(),
            writer.db_type()
        );

        let result = self.migrate(writer.as_mut(), tables, tally).await;
        writer.close().await;
        result
    }

    async fn migrate(
        &mut self,
        writer: &mut dyn TargetWriter,
        tables: &[String],
        tally: &mut Tally,
    ) -> Result<()> {
        let opts = self.config.migration.clone();
        let database = self.config.target.database.clone();

        if opts.disable_foreign_key_checks {
            self.execute(writer, &foreign_key_checks_sql(false)).await?;
        }
        if opts.create_database {
            self.execute(writer, &create_database_sql(&database)).await?;
        }
        self.execute(writer, &use_database_sql(&database)).await?;

        let copier = DataCopier::new(self.source.clone(), opts.batch_size)
            .with_events(self.events.clone())
            .with_cancel(self.cancel.clone());

        let total = tables.len();
        for (i, name) in tables.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }

            let index = i + 1;
            self.state = RunState::Running {
                table: name.clone(),
                index,
                total,
            };
            self.events.emit(MigrationEvent::TableStarted {
                table: name.clone(),
            });
            self.events
                .emit(MigrationEvent::Progress(ProgressTracker::new(name, 0).snapshot()));
            self.events.info(format!("Processing table: {}", name));

            match self.migrate_table(writer, &copier, name).await {
                Ok(rows) => {
                    tally.tables_success += 1;
                    tally.rows += rows;
                    self.events
                        .info(format!("Finished table: {} ({}/{})", name, index, total));
                    self.events.emit(MigrationEvent::TableFinished {
                        table: name.clone(),
                        index,
                        total,
                        rows,
                    });
                }
                Err(e @ MigrateError::SchemaRead { .. }) => {
                    self.events
                        .error(format!("Skipping {}: unable to read schema", name));
                    warn!("{}", e);
                    tally.skipped.push(SkippedTable {
                        table: name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) if e.is_connection_level() => return Err(e),
                Err(e) => match opts.on_table_error {
                    TableErrorPolicy::Abort => return Err(e),
                    TableErrorPolicy::Skip => {
                        self.events.error(format!("Skipping {}: {}", name, e));
                        tally.skipped.push(SkippedTable {
                            table: name.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        if opts.disable_foreign_key_checks {
            self.execute(writer, &foreign_key_checks_sql(true)).await?;
        }
        writer.commit().await?;
        Ok(())
    }

    /// Schema, DDL and data for one table. Returns rows copied.
    async fn migrate_table(
        &self,
        writer: &mut dyn TargetWriter,
        copier: &DataCopier,
        name: &str,
    ) -> Result<u64> {
        let table = self.source.read_schema(name).await?;

        for warning in lossy_mappings(&table) {
            self.events.info(warning);
        }

        if self.config.migration.drop_recreate {
            self.execute(writer, &drop_table_sql(name))
                .await
                .map_err(|e| e.in_ddl(name))?;
        }
        self.execute(writer, &build_create_table(&table))
            .await
            .map_err(|e| e.in_ddl(name))?;

        let stats = copier.copy(writer, &table).await?;
        Ok(stats.rows)
    }

    /// Execute a non-insert statement, echoing it to the log.
    async fn execute(&self, writer: &mut dyn TargetWriter, sql: &str) -> Result<()> {
        self.events.info(format!("MySQL: {}", sql));
        writer.execute(sql).await
    }
}

/// One line per column whose type mapping loses information.
fn lossy_mappings(table: &Table) -> Vec<String> {
    table
        .columns
        .iter()
        .filter_map(|c| {
            let mapping = map_type(&c.data_type);
            mapping
                .warning
                .map(|w| format!("{}.{}: {}", table.name, c.name, w))
        })
        .collect()
}
