// src/commands/remove.rs
//! Remove command

use super::preflight;
use anyhow::{Context, Result};
use aurweave::{Config, InstalledQuery, Pacman};
use tracing::{info, warn};

/// Split the request into installed targets and names that are not installed
///
/// Request order is kept and duplicates are dropped.
fn removal_targets(
    requested: &[String],
    host: &dyn InstalledQuery,
) -> Result<(Vec<String>, Vec<String>)> {
    let installed = host
        .installed(requested)
        .context("Failed to query installed packages")?;

    let mut targets: Vec<String> = Vec::new();
    let mut absent: Vec<String> = Vec::new();
    for name in requested {
        let bucket = if installed.contains(name) {
            &mut targets
        } else {
            &mut absent
        };
        if !bucket.contains(name) {
            bucket.push(name.clone());
        }
    }
    Ok((targets, absent))
}

/// Remove installed packages with `pacman -Rsc`
pub fn cmd_remove(
    config: &Config,
    packages: &[String],
    noconfirm: bool,
    dry_run: bool,
) -> Result<()> {
    if !dry_run {
        preflight::ensure_not_root()?;
        preflight::ensure_tools(&config.install.sudo, false)?;
    }

    let noconfirm = noconfirm || config.install.noconfirm;
    let pacman = Pacman::new(config.install.sudo.clone(), noconfirm);

    let (targets, absent) = removal_targets(packages, &pacman)?;
    for name in &absent {
        println!("{} is not installed, skipping", name);
    }
    if targets.is_empty() {
        println!("No packages to remove.");
        return Ok(());
    }

    warn!("Removing with pacman -Rsc also removes dependents and unneeded dependencies");

    if dry_run {
        println!("Would execute: {}", pacman.removal_command(&targets));
        return Ok(());
    }

    pacman
        .remove(&targets)
        .with_context(|| format!("Failed to remove {}", targets.join(", ")))?;

    info!("Removed {} package(s)", targets.len());
    println!("Removed: {}", targets.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_removal_targets() {
        let host: HashSet<String> = ["yay", "git"].iter().map(|s| s.to_string()).collect();

        let (targets, absent) =
            removal_targets(&names(&["paru", "yay", "git", "yay", "paru"]), &host).unwrap();

        assert_eq!(targets, names(&["yay", "git"]));
        assert_eq!(absent, names(&["paru"]));
    }

    #[test]
    fn test_nothing_installed() {
        let host: HashSet<String> = HashSet::new();

        let (targets, absent) = removal_targets(&names(&["yay"]), &host).unwrap();

        assert!(targets.is_empty());
        assert_eq!(absent, names(&["yay"]));
    }
}
