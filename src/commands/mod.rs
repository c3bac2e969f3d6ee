// src/commands/mod.rs
//! Command handlers for the aurweave CLI

mod install;
mod preflight;
pub mod progress;
mod remove;
mod search;

pub use install::{cmd_install, cmd_plan, InstallOptions};
pub use remove::cmd_remove;
pub use search::cmd_search;

use crate::cli::Cli;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io;

/// Print a completion script for `shell` to stdout
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "aurweave", &mut io::stdout());
}
