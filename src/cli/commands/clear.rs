use anyhow::{Context, Result};
use clap::Args;

use super::open_index;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub force: bool,
}

pub async fn handle_clear(args: ClearArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    if !args.force {
        println!(
            "This will delete ALL records in collection '{}'. Continue? [y/N]",
            config.vector_store.collection
        );
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            print!("{}", formatter.format_message("Cancelled."));
            return Ok(());
        }
    }

    if verbose {
        eprintln!("Clearing collection '{}'...", config.vector_store.collection);
    }

    let index = open_index(&config).await?;
    index.clear().await.context("failed to clear index")?;

    print!("{}", formatter.format_message("Index cleared."));
    Ok(())
}
