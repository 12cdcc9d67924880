//! Batched row copy from source to destination.
//!
//! One table at a time: count the rows, stream them in column order, and
//! insert + commit each batch before asking for the next. Commits are per
//! batch, so a failure in batch *k* leaves batches `1..k-1` committed in the
//! destination. A table copy is not atomic; re-running it into the same
//! table duplicates rows unless `drop_recreate` is set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::schema::Table;
use crate::core::traits::{ReadOptions, SourceReader, TargetWriter};
use crate::error::{MigrateError, Result};
use crate::events::{Emitter, MigrationEvent, ProgressTracker};

/// Statistics from copying one table.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Rows committed.
    pub rows: u64,

    /// Batches committed.
    pub batches: u64,

    /// Time spent waiting on the source.
    pub read_time: Duration,

    /// Time spent inserting and committing.
    pub write_time: Duration,
}

/// Copies table data in fixed-size batches.
pub struct DataCopier {
    source: Arc<dyn SourceReader>,
    batch_size: usize,
    events: Emitter,
    cancel: CancellationToken,
}

impl DataCopier {
    /// Create a copier. A zero batch size is treated as 1.
    pub fn new(source: Arc<dyn SourceReader>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            events: Emitter::silent(),
            cancel: CancellationToken::new(),
        }
    }

    /// Report log and progress events through `events`.
    pub fn with_events(mut self, events: Emitter) -> Self {
        self.events = events;
        self
    }

    /// Stop between batches once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Copy every row of `table` into the destination table of the same name.
    ///
    /// Statement failures come back as `MigrateError::DataCopy`; connection
    /// failures and cancellation are returned as-is.
    pub async fn copy(&self, target: &mut dyn TargetWriter, table: &Table) -> Result<TransferStats> {
        self.copy_inner(target, table)
            .await
            .map_err(|e| e.in_copy(&table.name))
    }

    async fn copy_inner(
        &self,
        target: &mut dyn TargetWriter,
        table: &Table,
    ) -> Result<TransferStats> {
        let total = self.source.row_count(&table.name).await?;
        self.events.info(format!("Rows to migrate: {}", total));

        let mut tracker = ProgressTracker::new(&table.name, total);
        let mut stats = TransferStats::default();

        if total == 0 {
            self.events.emit(MigrationEvent::Progress(tracker.finish()));
            return Ok(stats);
        }

        let columns = table.column_names();
        let mut rx = self.source.read_rows(ReadOptions {
            table: table.name.clone(),
            columns: columns.clone(),
            batch_size: self.batch_size,
        });

        loop {
            if self.cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }

            let read_start = Instant::now();
            let Some(batch) = rx.recv().await else {
                break;
            };
            let batch = batch?;
            stats.read_time += read_start.elapsed();

            if batch.is_empty() {
                continue;
            }

            let write_start = Instant::now();
            let written = target.write_batch(&table.name, &columns, batch).await?;
            stats.write_time += write_start.elapsed();

            stats.rows += written;
            stats.batches += 1;
            self.events
                .emit(MigrationEvent::Progress(tracker.advance(written)));
        }

        self.events.emit(MigrationEvent::Progress(tracker.finish()));

        debug!(
            "{}: copied {} rows in {} batches (read {:?}, write {:?})",
            table.name, stats.rows, stats.batches, stats.read_time, stats.write_time
        );
        Ok(stats)
    }
}
