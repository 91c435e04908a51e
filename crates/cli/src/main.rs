//! fsaudit CLI - fsaudit command

use anyhow::Result;
use clap::Parser;
use cli_lib::cmd;
use cli_lib::{Cli, Commands, MissingRoot};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

/// Exit code when the monitored directory doesn't exist
const EXIT_MISSING_ROOT: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics on stderr; stdout carries the audit lines
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch(args) => cmd::watch::run(args).await,
        Commands::Config { example: true, .. } => cmd::config::run_example(),
        Commands::Config { check: Some(path), .. } => cmd::config::run_check(&path),
        Commands::Config { .. } => {
            anyhow::bail!("Nothing to do: pass --example or --check <FILE>")
        }
    };

    if let Err(e) = &result {
        if let Some(missing) = e.downcast_ref::<MissingRoot>() {
            eprintln!("{} {}", "Error:".red().bold(), missing);
            std::process::exit(EXIT_MISSING_ROOT);
        }
    }

    result
}
