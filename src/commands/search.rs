// src/commands/search.rs
//! Package search across the sync repositories and the AUR

use super::progress::spinner;
use anyhow::{Context, Result};
use aurweave::host::pacman::search_sync;
use aurweave::{AurRpc, Config, InstalledQuery, PackageRecord, Pacman, RegistryClient, RepoMatch};
use std::collections::HashSet;
use tracing::{info, warn};

/// Search the sync repositories, then the AUR
///
/// A failing repository search only warns; the AUR section still runs.
pub fn cmd_search(config: &Config, terms: &[String], limit: usize) -> Result<()> {
    let term = terms.join(" ");
    info!("Searching for packages matching: {}", term);

    println!(":: Repositories");
    match search_repositories(config, terms) {
        Ok((matches, _)) if matches.is_empty() => println!("No results found."),
        Ok((matches, installed)) => {
            for entry in &matches {
                println!("{}", format_repo_entry(entry, installed.contains(&entry.name)));
            }
        }
        Err(e) => warn!("Repository search failed: {:#}", e),
    }

    println!(":: AUR");

    let backend = AurRpc::with_endpoints(
        config.registry.rpc_url.clone(),
        config.registry.pkgbuild_url.clone(),
        config.registry_timeout()?,
    )?;
    let registry = RegistryClient::new(backend);

    let pb = spinner("Searching AUR...");
    let results = registry.search(&term);
    pb.finish_and_clear();
    let results = results.with_context(|| format!("Search for '{}' failed", term))?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} packages matching '{}':", results.len(), term);
    for record in results.iter().take(limit) {
        println!("{}", format_entry(record));
    }
    if results.len() > limit {
        println!("... and {} more (use --limit to show more)", results.len() - limit);
    }
    Ok(())
}

fn search_repositories(config: &Config, terms: &[String]) -> Result<(Vec<RepoMatch>, HashSet<String>)> {
    let matches = search_sync(terms)?;
    let names: Vec<String> = matches.iter().map(|m| m.name.clone()).collect();
    let installed = Pacman::new(config.install.sudo.clone(), false).installed(&names)?;
    Ok((matches, installed))
}

fn format_repo_entry(entry: &RepoMatch, installed: bool) -> String {
    let mut line = format!("  {}/{} {}", entry.repository, entry.name, entry.version);
    if installed {
        line.push_str(" [installed]");
    }
    if let Some(description) = &entry.description {
        line.push_str("\n      ");
        line.push_str(description);
    }
    line
}

fn format_entry(record: &PackageRecord) -> String {
    let mut line = format!(
        "  aur/{} {} (+{} {:.2})",
        record.name, record.version, record.votes, record.popularity
    );
    if record.is_orphaned() {
        line.push_str(" [orphaned]");
    }
    if record.is_out_of_date() {
        line.push_str(" [out of date]");
    }
    if let Some(description) = &record.description {
        line.push_str("\n      ");
        line.push_str(description);
    }
    line
}
