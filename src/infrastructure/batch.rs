//! Batch upsert engine
//!
//! Accumulates finished product records and flushes them to the store in
//! bulk: one existence query per batch, insert-vs-update classification on
//! the full `(article_number, color_id)` key, and one transaction per
//! flush. On failure the pending batch is discarded, not retried, and the
//! failure is surfaced loudly with a sample of affected article numbers.
//!
//! Pending state is local to one crawl session. Concurrent sessions
//! flushing overlapping article numbers race; the last flush wins
//! (documented limitation, not coordinated).

use thiserror::Error;
use tracing::{error, info};

use crate::domain::product::ProductRecord;
use crate::infrastructure::repository::ProductRepository;

/// Pending-count threshold that triggers an automatic flush.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// How many affected article numbers a flush error reports.
const FAILURE_SAMPLE_LEN: usize = 5;

/// Per-flush statistics consumed by the surrounding application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub inserted: u32,
    pub updated: u32,
    pub images: u32,
}

impl FlushStats {
    pub fn absorb(&mut self, other: FlushStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.images += other.images;
    }
}

/// A flush failed and its batch was discarded.
#[derive(Error, Debug)]
#[error("Flush of {count} records failed (sample: {sample:?}): {cause}")]
pub struct FlushError {
    /// Number of records lost with the discarded batch.
    pub count: usize,
    /// Up to five affected article numbers.
    pub sample: Vec<String>,
    pub cause: anyhow::Error,
}

/// Accumulator owning the pending list exclusively; `add` and `flush` are
/// the only mutators.
pub struct BatchUpsertEngine {
    repository: ProductRepository,
    pending: Vec<ProductRecord>,
    batch_size: usize,
}

impl BatchUpsertEngine {
    pub fn new(repository: ProductRepository) -> Self {
        Self::with_batch_size(repository, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(repository: ProductRepository, batch_size: usize) -> Self {
        Self {
            repository,
            pending: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Accumulate a finished record; auto-flushes when the pending count
    /// reaches the batch size. Returns the flush stats when one ran.
    pub async fn add(&mut self, record: ProductRecord) -> Result<Option<FlushStats>, FlushError> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Flush the pending batch. An empty batch is a no-op. On failure the
    /// whole batch is discarded and the error carries the record count plus
    /// a sample of article numbers.
    pub async fn flush(&mut self) -> Result<FlushStats, FlushError> {
        if self.pending.is_empty() {
            return Ok(FlushStats::default());
        }

        // Take the batch up front: a failed flush must not leave records
        // behind to fail again on the next cycle.
        let batch = std::mem::take(&mut self.pending);

        match self.try_flush(&batch).await {
            Ok(stats) => {
                info!(
                    "Flushed {} records: {} inserted, {} updated, {} images",
                    batch.len(),
                    stats.inserted,
                    stats.updated,
                    stats.images
                );
                Ok(stats)
            }
            Err(cause) => {
                let sample: Vec<String> = batch
                    .iter()
                    .take(FAILURE_SAMPLE_LEN)
                    .map(|r| r.article_number.clone())
                    .collect();
                error!(
                    "Discarding batch of {} records after flush failure (sample: {:?}): {}",
                    batch.len(),
                    sample,
                    cause
                );
                Err(FlushError {
                    count: batch.len(),
                    sample,
                    cause,
                })
            }
        }
    }

    async fn try_flush(&self, batch: &[ProductRecord]) -> anyhow::Result<FlushStats> {
        let mut article_numbers: Vec<String> =
            batch.iter().map(|r| r.article_number.clone()).collect();
        article_numbers.sort();
        article_numbers.dedup();

        let existing = self
            .repository
            .find_ids_by_article_numbers(&article_numbers)
            .await?;

        self.repository.upsert_batch(batch, &existing).await
    }
}
