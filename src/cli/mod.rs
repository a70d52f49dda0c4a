//! Command-line front end.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask natural-language questions about a code repository.
#[derive(Debug, Parser)]
#[command(name = "repoqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebuild the index from a repository (replaces existing records)
    Index(commands::IndexArgs),

    /// Remove every record from the index
    Clear(commands::ClearArgs),

    /// Show the chunks closest to a query
    Search(commands::SearchArgs),

    /// Answer a question using the indexed repository
    Ask(commands::AskArgs),

    /// Index a repository, then answer questions interactively
    Chat(commands::ChatArgs),

    /// Check embedding server and vector store status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

impl Commands {
    /// Commands that stop on their own when interrupted.
    pub fn handles_cancellation(&self) -> bool {
        matches!(self, Commands::Index(_) | Commands::Chat(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        let cli = Cli::parse_from([
            "repoqa", "index", "./repo", "-e", "docs/**", "--dry-run", "-f", "json",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Index(args) => {
                assert_eq!(args.exclude, vec!["docs/**".to_string()]);
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["repoqa", "-v", "ask", "where is main?", "-n", "3", "--show-context"]);
        assert!(cli.verbose);
        assert!(!cli.command.handles_cancellation());
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.limit, Some(3));
                assert!(args.show_context);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
