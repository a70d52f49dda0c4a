//! Index command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{embedding_provider, open_index};
use crate::cli::output::get_formatter;
use crate::error::IndexError;
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::{
    BuildReport, CodeChunker, EmbeddingPipeline, IndexBuilder, IndexHandle, PipelineOptions,
};
use crate::sources::LocalSource;
use crate::utils::file::relative_path;

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Repository directory (or single file) to index
    #[arg(required = true)]
    pub path: PathBuf,

    /// File patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// Show what would be indexed without actually indexing
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_index(
    args: IndexArgs,
    format: OutputFormat,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let source = LocalSource::from_config(&args.path, &config.indexing, &args.exclude)
        .context("failed to open repository")?;

    if args.dry_run {
        let files: Vec<String> = source
            .collect_files()?
            .iter()
            .map(|p| relative_path(source.root(), p).unwrap_or_else(|| p.display().to_string()))
            .collect();
        print!("{}", formatter.format_file_list(&files));
        return Ok(());
    }

    if config.vector_store.driver == VectorDriver::Memory {
        eprintln!(
            "Warning: the memory driver discards the index when this command exits. \
             Use `repoqa chat {}` to index and ask in one session.",
            args.path.display()
        );
    }

    let start_time = Instant::now();
    let (_, report) = build_repository_index(&config, &source, verbose, cancel).await?;
    let duration_ms = start_time.elapsed().as_millis() as u64;

    print!("{}", formatter.format_build_report(&report, duration_ms));
    if report.cancelled {
        eprintln!("Index build was cancelled; the index is incomplete.");
    }

    Ok(())
}

/// Scan `source` and rebuild the configured index from it.
pub(crate) async fn build_repository_index(
    config: &Config,
    source: &LocalSource,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<(IndexHandle, BuildReport)> {
    let files = source.load().context("failed to scan repository")?;
    if verbose {
        eprintln!(
            "Found {} files to index in {}",
            files.len(),
            source.root().display()
        );
    }

    let provider = embedding_provider(config)?;
    let handle = open_index(config).await?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let pipeline = EmbeddingPipeline::new(provider, PipelineOptions::from(&config.pipeline))
        .with_progress(pb.clone());
    let builder = IndexBuilder::new(CodeChunker::from_config(&config.indexing), pipeline);

    let (chunks, used) = builder.chunk_files(files);
    if used == 0 {
        pb.finish_and_clear();
        return Err(IndexError::NoFilesFound)
            .with_context(|| format!("nothing to index in {}", source.root().display()));
    }
    pb.set_length(chunks.len() as u64);

    let result = builder
        .build_from_chunks(handle, chunks, used, cancel)
        .await
        .context("index build failed");
    pb.finish_and_clear();
    result
}
