//! stagecache - versioned offline asset cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use stagecache::cli::{Cli, Commands};
use stagecache::config::ConfigManager;
use stagecache::error::CacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("stagecache=warn"),
        1 => EnvFilter::new("stagecache=info"),
        _ => EnvFilter::new("stagecache=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    debug!("Using config {}", config_manager.path().display());

    let config = config_manager.load().await?;

    // Scan and config never touch the stores
    match cli.command {
        Commands::Scan(args) => return stagecache::cli::commands::scan(args, &config).await,
        Commands::Config(args) => {
            return stagecache::cli::commands::config(args, &config, &config_manager).await
        }
        _ => {}
    }

    ConfigManager::ensure_state_dirs(&config).await?;

    let from_dir = cli.from_dir.as_deref();
    match cli.command {
        Commands::Scan(_) | Commands::Config(_) => unreachable!("handled above"),
        Commands::Install => stagecache::cli::commands::install(&config, from_dir).await,
        Commands::Activate => stagecache::cli::commands::activate(&config, from_dir).await,
        Commands::Update => stagecache::cli::commands::update(&config, from_dir).await,
        Commands::Fetch(args) => stagecache::cli::commands::fetch(args, &config, from_dir).await,
        Commands::Sync => stagecache::cli::commands::sync(&config, from_dir).await,
        Commands::Status => stagecache::cli::commands::status(&config, from_dir).await,
    }
}
