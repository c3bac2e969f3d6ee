// src/main.rs

mod cli;
mod commands;

use anyhow::{Context, Result};
use aurweave::Config;
use clap::Parser;
use cli::{Cli, Commands};
use commands::InstallOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        commands::cmd_completions(shell);
        return Ok(());
    }

    let config = Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Install {
            packages,
            noconfirm,
            dry_run,
            best_effort,
            json,
        } => commands::cmd_install(
            &config,
            &packages,
            InstallOptions {
                noconfirm,
                dry_run,
                best_effort,
                json,
            },
        ),
        Commands::Plan { packages, json } => commands::cmd_plan(&config, &packages, json),
        Commands::Remove {
            packages,
            noconfirm,
            dry_run,
        } => commands::cmd_remove(&config, &packages, noconfirm, dry_run),
        Commands::Search { terms, limit } => commands::cmd_search(&config, &terms, limit),
        Commands::Completions { .. } => Ok(()),
    }
}
