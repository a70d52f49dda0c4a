//! Embedding pipeline: chunks in, index records out.
//!
//! Chunks are embedded with bounded concurrency while keeping their order,
//! retried on rate limits, skipped on other failures and flushed to the
//! index in fixed-size batches. A fatal provider error aborts the run.

use futures::StreamExt;
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::embedding::EmbeddingProvider;
use super::vector_store::VectorIndex;
use crate::error::{EmbeddingError, IndexError};
use crate::models::{Chunk, IndexRecord, PipelineConfig};
use crate::utils::retry::{RetryConfig, RetryResult, with_retry};

/// Tuning knobs for [`EmbeddingPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub call_delay: Duration,
    pub retry: RetryConfig,
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size as usize,
            concurrency: config.concurrency as usize,
            call_delay: config.call_delay(),
            retry: config.retry(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Outcome of one `embed_all` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub embedded: usize,
    pub skipped: usize,
    pub batches: usize,
    /// Stopped early at a batch boundary.
    pub cancelled: bool,
}

enum Outcome {
    Embedded(IndexRecord),
    Skipped,
    Fatal(EmbeddingError),
}

pub struct EmbeddingPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    options: PipelineOptions,
    progress: Option<ProgressBar>,
}

impl EmbeddingPipeline {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, options: PipelineOptions) -> Self {
        Self {
            provider,
            options,
            progress: None,
        }
    }

    /// Advance `progress` by one for every chunk processed.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    async fn embed_chunk(&self, chunk: Chunk) -> Outcome {
        let result = with_retry(&self.options.retry, || {
            self.provider.embed_document(&chunk.text)
        })
        .await;

        if !self.options.call_delay.is_zero() {
            sleep(self.options.call_delay).await;
        }

        match result {
            RetryResult::Success(vector) => Outcome::Embedded(IndexRecord::from_chunk(chunk, vector)),
            RetryResult::Failed { last_error, .. } if last_error.is_fatal() => {
                Outcome::Fatal(last_error)
            }
            RetryResult::Failed {
                last_error,
                attempts,
            } => {
                warn!(
                    path = %chunk.path,
                    chunk_id = chunk.chunk_id,
                    attempts,
                    rate_limited = last_error.is_rate_limited(),
                    error = %last_error,
                    "skipping chunk"
                );
                Outcome::Skipped
            }
        }
    }

    async fn flush(
        &self,
        index: &VectorIndex,
        batch: &mut Vec<IndexRecord>,
        report: &mut PipelineReport,
    ) -> Result<(), IndexError> {
        if batch.is_empty() {
            return Ok(());
        }

        let records = std::mem::take(batch);
        let count = records.len();
        index.add(records).await?;

        report.embedded += count;
        report.batches += 1;
        debug!(batch = report.batches, records = count, "flushed batch");
        Ok(())
    }

    /// Embed `chunks` in order and write them to `index`.
    ///
    /// `cancel` is checked after every batch flush.
    pub async fn embed_all<I>(
        &self,
        chunks: I,
        index: &VectorIndex,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, IndexError>
    where
        I: IntoIterator<Item = Chunk>,
    {
        let batch_size = self.options.batch_size.max(1);
        let mut report = PipelineReport::default();
        let mut batch = Vec::with_capacity(batch_size);

        let stream = futures::stream::iter(chunks)
            .map(|chunk| self.embed_chunk(chunk))
            .buffered(self.options.concurrency.max(1));
        let mut stream = std::pin::pin!(stream);

        while let Some(outcome) = stream.next().await {
            match outcome {
                Outcome::Embedded(record) => batch.push(record),
                Outcome::Skipped => report.skipped += 1,
                Outcome::Fatal(e) => return Err(IndexError::EmbeddingError(e)),
            }

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }

            if batch.len() >= batch_size {
                self.flush(index, &mut batch, &mut report).await?;
                if cancel.is_cancelled() {
                    info!(embedded = report.embedded, "embedding cancelled");
                    report.cancelled = true;
                    return Ok(report);
                }
            }
        }

        self.flush(index, &mut batch, &mut report).await?;
        report.cancelled = cancel.is_cancelled();
        Ok(report)
    }
}
