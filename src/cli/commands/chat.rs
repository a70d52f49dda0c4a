//! Interactive question answering over a freshly built index.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::index::build_repository_index;
use super::embedding_provider;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{ChatCompletionClient, QaEngine, Retriever};
use crate::sources::LocalSource;

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Repository directory to index before chatting
    #[arg(required = true)]
    pub path: PathBuf,

    /// File patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    #[arg(long, short = 'n', help = "Number of chunks to retrieve as context")]
    pub limit: Option<u32>,

    #[arg(long, help = "Print the retrieved chunks after each answer")]
    pub show_context: bool,
}

fn is_exit(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "exit" | "quit")
}

pub async fn handle_chat(
    args: ChatArgs,
    format: OutputFormat,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let limit = args.limit.unwrap_or(config.search.default_limit);
    if limit == 0 {
        anyhow::bail!("limit must be at least 1");
    }

    let generator = ChatCompletionClient::new(&config.llm).context("failed to set up LLM client")?;
    let source = LocalSource::from_config(&args.path, &config.indexing, &args.exclude)
        .context("failed to open repository")?;

    let (handle, report) = build_repository_index(&config, &source, verbose, cancel).await?;
    if report.cancelled {
        eprintln!("Index build cancelled.");
        return Ok(());
    }
    eprintln!(
        "Indexed {} chunks from {} files ({} skipped). Type `exit` to quit.",
        report.embedded, report.files, report.skipped
    );

    let engine = QaEngine::new(
        Retriever::new(embedding_provider(&config)?, handle),
        generator,
        limit as usize,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = cancel.cancelled() => None,
        };
        let Some(line) = line else { break };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        match engine.answer(question).await {
            Ok(answer) => print!(
                "{}",
                formatter.format_answer(question, &answer, args.show_context)
            ),
            Err(e) => eprint!("{}", formatter.format_error(&e.to_string())),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit now"));
    }
}
