// src/commands/preflight.rs
//! Environment checks before anything is installed

use anyhow::{bail, Result};
use tracing::debug;

/// Refuse to run as root; makepkg will not build as root either
pub fn ensure_not_root() -> Result<()> {
    if nix::unistd::geteuid().is_root() {
        bail!("Do not run aurweave as root; it escalates with sudo only for pacman");
    }
    Ok(())
}

/// Tools a run needs on PATH
pub fn required_tools(sudo: &str, builds: bool) -> Vec<&str> {
    let mut tools = vec!["pacman", sudo];
    if builds {
        tools.extend(["git", "makepkg"]);
    }
    tools
}

/// Tools from `tools` that `found` does not locate
pub fn missing_tools<'a>(tools: &[&'a str], found: impl Fn(&str) -> bool) -> Vec<&'a str> {
    tools.iter().copied().filter(|tool| !found(*tool)).collect()
}

/// Fail if any tool needed for the run is missing
pub fn ensure_tools(sudo: &str, builds: bool) -> Result<()> {
    let tools = required_tools(sudo, builds);
    let missing = missing_tools(&tools, |tool| match which::which(tool) {
        Ok(path) => {
            debug!("Found {} at {}", tool, path.display());
            true
        }
        Err(_) => false,
    });

    if !missing.is_empty() {
        bail!(
            "Required tools not found in PATH: {} (install base-devel and git)",
            missing.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_tools() {
        assert_eq!(required_tools("sudo", false), vec!["pacman", "sudo"]);
        assert_eq!(
            required_tools("doas", true),
            vec!["pacman", "doas", "git", "makepkg"]
        );
    }

    #[test]
    fn test_missing_tools() {
        let tools = required_tools("sudo", true);
        let missing = missing_tools(&tools, |tool| tool != "makepkg");
        assert_eq!(missing, vec!["makepkg"]);
    }
}
