//! Events emitted by a migration run.
//!
//! The engine never touches presentation state. Front ends attach an
//! [`EventSink`] (usually the sending half of an unbounded tokio channel)
//! and drain [`MigrationEvent`]s at their own pace. Every log event is also
//! mirrored to `tracing`, so a run without a sink still leaves a trail.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::orchestrator::RunStatus;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// A human readable log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub level: LogLevel,
}

impl LogEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

/// Copy progress for the current table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Table being copied.
    pub table: String,
    /// Rows committed so far.
    pub rows_copied: u64,
    /// Row count taken before the copy started.
    pub total_rows: u64,
    /// Percent complete, in `[0, 100]`.
    pub percent: f64,
}

/// Everything a front end can observe about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    Log(LogEvent),
    Progress(Progress),
    TableStarted {
        table: String,
    },
    TableFinished {
        table: String,
        index: usize,
        total: usize,
        rows: u64,
    },
    RunFinished {
        status: RunStatus,
    },
}

/// Receiver of migration events.
///
/// Implementations must not block; the run calls `emit` inline.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MigrationEvent);
}

impl EventSink for mpsc::UnboundedSender<MigrationEvent> {
    fn emit(&self, event: MigrationEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.send(event);
    }
}

/// Event fan-out used inside the engine.
#[derive(Clone, Default)]
pub struct Emitter {
    sink: Option<Arc<dyn EventSink>>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Emitter that only writes to `tracing`.
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn emit(&self, event: MigrationEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let event = LogEvent::info(message);
        info!("{}", event.message);
        self.emit(MigrationEvent::Log(event));
    }

    pub fn error(&self, message: impl Into<String>) {
        let event = LogEvent::error(message);
        error!("{}", event.message);
        self.emit(MigrationEvent::Log(event));
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

/// Per-table progress bookkeeping.
///
/// Percent is clamped to `[0, 100]` and never moves backwards within a
/// table, even if the source grows while it is being read.
#[derive(Debug)]
pub struct ProgressTracker {
    table: String,
    total: u64,
    copied: u64,
    percent: f64,
}

impl ProgressTracker {
    /// Start tracking a table at 0%.
    pub fn new(table: impl Into<String>, total: u64) -> Self {
        Self {
            table: table.into(),
            total,
            copied: 0,
            percent: 0.0,
        }
    }

    /// Record committed rows and return the updated snapshot.
    pub fn advance(&mut self, rows: u64) -> Progress {
        self.copied += rows;
        let pct = self.copied as f64 * 100.0 / self.total.max(1) as f64;
        self.percent = self.percent.max(pct.clamp(0.0, 100.0));
        self.snapshot()
    }

    /// Force 100%.
    pub fn finish(&mut self) -> Progress {
        self.percent = 100.0;
        self.snapshot()
    }

    pub fn snapshot(&self) -> Progress {
        Progress {
            table: self.table.clone(),
            rows_copied: self.copied,
            total_rows: self.total,
            percent: self.percent,
        }
    }
}
