// src/cli.rs
//! CLI definitions for aurweave
//!
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aurweave")]
#[command(author, version)]
#[command(about = "Install packages from the pacman repositories and the AUR", long_about = None)]
pub struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/aurweave/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve, audit and install packages
    Install {
        /// Package names (repository or AUR)
        #[arg(required = true)]
        packages: Vec<String>,

        /// Skip audit prompts and pacman/makepkg confirmations
        #[arg(short = 'y', long)]
        noconfirm: bool,

        /// Show what would be installed without making changes
        #[arg(long)]
        dry_run: bool,

        /// Build packages whose AUR dependency was skipped at audit anyway
        #[arg(long)]
        best_effort: bool,

        /// Print the plan as JSON (with --dry-run)
        #[arg(long)]
        json: bool,
    },

    /// Show the installation plan without installing anything
    Plan {
        /// Package names (repository or AUR)
        #[arg(required = true)]
        packages: Vec<String>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove installed packages and the dependencies nothing else needs
    Remove {
        /// Installed package names
        #[arg(required = true)]
        packages: Vec<String>,

        /// Skip pacman confirmation
        #[arg(short = 'y', long)]
        noconfirm: bool,

        /// Show the removal command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Search the sync repositories and the AUR
    Search {
        /// Search terms (joined with spaces)
        #[arg(required = true)]
        terms: Vec<String>,

        /// Maximum number of results to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
