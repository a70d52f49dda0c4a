use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use repoqa::cli::commands::{
    handle_ask, handle_chat, handle_clear, handle_config, handle_index, handle_search,
    handle_status,
};
use repoqa::cli::{Cli, Commands};
use repoqa::models::{Config, OutputFormat};

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,repoqa=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let defaults = Config::load().unwrap_or_default();
    let format = cli.format.unwrap_or(defaults.search.default_format);
    let verbose = cli.verbose;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            eprintln!("\nReceived shutdown signal, finishing current batch...");
            cancel.cancel();
        }
    });

    let cancellable = cli.command.handles_cancellation();
    tokio::select! {
        result = run_command(cli.command, format, verbose, &cancel) => {
            result?;
        }
        _ = cancel.cancelled(), if !cancellable => {}
    }

    Ok(())
}

async fn run_command(
    command: Commands,
    format: OutputFormat,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Commands::Index(args) => handle_index(args, format, verbose, cancel).await,
        Commands::Clear(args) => handle_clear(args, format, verbose).await,
        Commands::Search(args) => handle_search(args, format, verbose).await,
        Commands::Ask(args) => handle_ask(args, format, verbose).await,
        Commands::Chat(args) => handle_chat(args, format, verbose, cancel).await,
        Commands::Status => handle_status(format, verbose).await,
        Commands::Config(cmd) => handle_config(cmd, format, verbose).await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
