use anyhow::{Context, Result};
use clap::Args;

use super::{embedding_provider, open_index, warn_if_ephemeral};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{ChatCompletionClient, QaEngine, Retriever};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question about the indexed repository")]
    pub question: String,

    #[arg(long, short = 'n', help = "Number of chunks to retrieve as context")]
    pub limit: Option<u32>,

    #[arg(long, help = "Print the retrieved chunks after the answer")]
    pub show_context: bool,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let limit = args.limit.unwrap_or(config.search.default_limit);
    if limit == 0 {
        anyhow::bail!("limit must be at least 1");
    }

    let generator = ChatCompletionClient::new(&config.llm).context("failed to set up LLM client")?;

    warn_if_ephemeral(&config);
    let retriever = Retriever::new(embedding_provider(&config)?, open_index(&config).await?);
    let engine = QaEngine::new(retriever, generator, limit as usize);

    if verbose {
        eprintln!("Asking {} with up to {limit} chunks of context", config.llm.model);
    }

    let answer = engine
        .answer(question)
        .await
        .context("failed to answer question")?;
    print!(
        "{}",
        formatter.format_answer(question, &answer, args.show_context)
    );

    Ok(())
}
