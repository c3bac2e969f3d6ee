// src/host/pacman.rs

//! Query and drive the system pacman
//!
//! This module provides the trusted-source side of aurweave using the
//! `pacman` command-line tool on Arch Linux systems:
//! - the sync-repository name list (`pacman -Slq`) backing the source index
//! - virtual names provided by sync packages (`pacman -Si`)
//! - the installed set (`pacman -Qq`)
//! - batch installation (`sudo pacman -S --needed`)
//! - repository search (`pacman -Ss`)
//! - recursive removal (`sudo pacman -Rsc`)

use crate::error::{Error, Result};
use crate::host::{InstalledQuery, TrustedInstaller};
use std::collections::HashSet;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Run pacman with the given arguments and return stdout
fn pacman_output(args: &[&str]) -> Result<String> {
    let output = Command::new("pacman")
        .args(args)
        .output()
        .map_err(|e| Error::InitError(format!("Failed to run pacman: {}. Is pacman installed?", e)))?;

    if !output.status.success() {
        return Err(Error::InitError(format!(
            "pacman {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Split newline-separated names, dropping blanks
fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// List all installed package names
pub fn list_installed_packages() -> Result<Vec<String>> {
    debug!("Querying installed pacman packages");
    let packages = parse_name_list(&pacman_output(&["-Qq"])?);
    debug!("Found {} installed packages", packages.len());
    Ok(packages)
}

/// List every package name known to the sync repositories
pub fn list_sync_packages() -> Result<Vec<String>> {
    debug!("Querying sync repository packages");
    let packages = parse_name_list(&pacman_output(&["-Slq"])?);
    debug!("Found {} sync packages", packages.len());
    Ok(packages)
}

/// List every virtual name provided by sync packages (e.g. `sh`, `java-runtime`)
pub fn list_sync_provides() -> Result<Vec<String>> {
    debug!("Querying provides of sync repository packages");
    let provides = parse_provides(&pacman_output(&["-Si"])?);
    debug!("Found {} provided names", provides.len());
    Ok(provides)
}

/// A sync-repository package matched by `pacman -Ss`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMatch {
    pub repository: String,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

/// Search the sync repositories by name and description
///
/// pacman exits with status 1 when nothing matches; that is an empty result.
pub fn search_sync(terms: &[String]) -> Result<Vec<RepoMatch>> {
    debug!("Searching sync repositories for {:?}", terms);
    let output = Command::new("pacman")
        .arg("-Ss")
        .args(terms)
        .output()
        .map_err(|e| Error::InitError(format!("Failed to run pacman: {}. Is pacman installed?", e)))?;

    if !output.status.success() {
        if output.status.code() == Some(1) && output.stdout.is_empty() {
            return Ok(Vec::new());
        }
        return Err(Error::InitError(format!(
            "pacman -Ss failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_search_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `pacman -Ss` output
///
/// Each match is a `repo/name version [extras]` line followed by an
/// indented description line.
fn parse_search_output(output: &str) -> Vec<RepoMatch> {
    let mut matches: Vec<RepoMatch> = Vec::new();

    for line in output.lines() {
        if line.starts_with(char::is_whitespace) {
            if let Some(last) = matches.last_mut() {
                let text = line.trim();
                if last.description.is_none() && !text.is_empty() {
                    last.description = Some(text.to_string());
                }
            }
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(qualified), Some(version)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some((repository, name)) = qualified.split_once('/') else {
            continue;
        };
        matches.push(RepoMatch {
            repository: repository.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description: None,
        });
    }

    matches
}

/// Parse the `Provides` fields out of `pacman -Si` output
///
/// Values wrap onto continuation lines indented with spaces; version
/// constraints (`sh=5.2`) are stripped.
fn parse_provides(info: &str) -> Vec<String> {
    let mut provides = Vec::new();
    let mut in_provides = false;

    for line in info.lines() {
        let value = if line.starts_with(' ') {
            if !in_provides {
                continue;
            }
            line.trim()
        } else if let Some((key, value)) = line.split_once(':') {
            in_provides = key.trim() == "Provides";
            if !in_provides {
                continue;
            }
            value.trim()
        } else {
            in_provides = false;
            continue;
        };

        provides.extend(
            value
                .split_whitespace()
                .filter(|s| *s != "None")
                .map(|s| s.split(['>', '<', '=']).next().unwrap_or(s).to_string()),
        );
    }

    provides
}

/// The system pacman as installed-set query and trusted batch installer
#[derive(Debug)]
pub struct Pacman {
    sudo: String,
    noconfirm: bool,
    installed: OnceLock<HashSet<String>>,
}

impl Pacman {
    /// Create a pacman driver that escalates with the given command (e.g. "sudo")
    pub fn new(sudo: impl Into<String>, noconfirm: bool) -> Self {
        Self {
            sudo: sudo.into(),
            noconfirm,
            installed: OnceLock::new(),
        }
    }

    /// Build the batch install command line
    fn install_args(&self, names: &[String]) -> Vec<String> {
        let mut args = vec![
            "pacman".to_string(),
            "-S".to_string(),
            "--needed".to_string(),
        ];
        if self.noconfirm {
            args.push("--noconfirm".to_string());
        }
        args.extend(names.iter().cloned());
        args
    }

    /// Build the recursive removal command line
    fn remove_args(&self, names: &[String]) -> Vec<String> {
        let mut args = vec!["pacman".to_string(), "-Rsc".to_string()];
        if self.noconfirm {
            args.push("--noconfirm".to_string());
        }
        args.extend(names.iter().cloned());
        args
    }

    /// The removal command as it would be run, for dry runs
    pub fn removal_command(&self, names: &[String]) -> String {
        format!("{} {}", self.sudo, self.remove_args(names).join(" "))
    }

    /// Remove `names` together with dependencies nothing else needs
    pub fn remove(&self, names: &[String]) -> Result<()> {
        let args = self.remove_args(names);
        info!("Running: {} {}", self.sudo, args.join(" "));

        let status = Command::new(&self.sudo).args(&args).status().map_err(|e| {
            Error::RemovalFailed {
                packages: names.to_vec(),
                detail: format!("Failed to run {}: {}", self.sudo, e),
            }
        })?;

        if !status.success() {
            return Err(Error::RemovalFailed {
                packages: names.to_vec(),
                detail: format!("pacman exited with code {}", status.code().unwrap_or(-1)),
            });
        }

        Ok(())
    }

    fn installed_set(&self) -> Result<&HashSet<String>> {
        if let Some(set) = self.installed.get() {
            return Ok(set);
        }
        let set: HashSet<String> = list_installed_packages()?.into_iter().collect();
        Ok(self.installed.get_or_init(|| set))
    }
}

impl InstalledQuery for Pacman {
    fn installed(&self, names: &[String]) -> Result<HashSet<String>> {
        let set = self.installed_set()?;
        Ok(names.iter().filter(|n| set.contains(n.as_str())).cloned().collect())
    }
}

impl TrustedInstaller for Pacman {
    fn install_batch(&self, names: &[String]) -> Result<()> {
        let args = self.install_args(names);
        info!("Running: {} {}", self.sudo, args.join(" "));

        let status = Command::new(&self.sudo).args(&args).status().map_err(|e| {
            Error::BatchInstallFailed {
                packages: names.to_vec(),
                detail: format!("Failed to run {}: {}", self.sudo, e),
            }
        })?;

        if !status.success() {
            return Err(Error::BatchInstallFailed {
                packages: names.to_vec(),
                detail: format!("pacman exited with code {}", status.code().unwrap_or(-1)),
            });
        }

        Ok(())
    }
}
