//! Full index builds: clear, chunk, embed, store.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::chunker::CodeChunker;
use super::pipeline::EmbeddingPipeline;
use super::vector_store::IndexHandle;
use crate::error::IndexError;
use crate::models::{Chunk, SourceFile};

/// Statistics for one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub files: usize,
    pub chunks: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub batches: usize,
    pub cancelled: bool,
}

pub struct IndexBuilder {
    chunker: CodeChunker,
    pipeline: EmbeddingPipeline,
}

impl IndexBuilder {
    pub fn new(chunker: CodeChunker, pipeline: EmbeddingPipeline) -> Self {
        Self { chunker, pipeline }
    }

    /// Chunk every non-blank file; returns the chunks and the number of files used.
    pub fn chunk_files<I>(&self, files: I) -> (Vec<Chunk>, usize)
    where
        I: IntoIterator<Item = SourceFile>,
    {
        let mut chunks = Vec::new();
        let mut used = 0;
        for file in files {
            if file.content.trim().is_empty() {
                continue;
            }
            chunks.extend(self.chunker.chunk_file(&file));
            used += 1;
        }
        (chunks, used)
    }

    /// Replace the contents of `handle` with `chunks`.
    ///
    /// The index is cleared before anything is written; queries running
    /// meanwhile see a partially rebuilt index.
    pub async fn build_from_chunks(
        &self,
        handle: IndexHandle,
        chunks: Vec<Chunk>,
        files: usize,
        cancel: &CancellationToken,
    ) -> Result<(IndexHandle, BuildReport), IndexError> {
        let mut report = BuildReport {
            files,
            chunks: chunks.len(),
            ..Default::default()
        };

        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok((handle, report));
        }

        handle.clear().await?;
        info!(
            collection = handle.collection(),
            files,
            chunks = report.chunks,
            "index cleared, embedding chunks"
        );

        let outcome = self.pipeline.embed_all(chunks, &handle, cancel).await?;
        report.embedded = outcome.embedded;
        report.skipped = outcome.skipped;
        report.batches = outcome.batches;
        report.cancelled = outcome.cancelled;

        info!(
            embedded = report.embedded,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "index build finished"
        );
        Ok((handle, report))
    }

    /// Chunk `files` and rebuild the index from them.
    pub async fn build(
        &self,
        handle: IndexHandle,
        files: Vec<SourceFile>,
        cancel: &CancellationToken,
    ) -> Result<(IndexHandle, BuildReport), IndexError> {
        let (chunks, used) = self.chunk_files(files);
        if used == 0 {
            return Err(IndexError::NoFilesFound);
        }
        self.build_from_chunks(handle, chunks, used, cancel).await
    }
}
