// src/config.rs
//! Configuration file parsing
//!
//! Supports a TOML configuration file with the following sections:
//! - [registry] - AUR endpoints, request timeout, batch size
//! - [index] - Sync index loading
//! - [build] - Clone endpoint, clone timeout, MAKEFLAGS, scratch location
//! - [install] - Confirmation, skip policy, privilege escalation
//!
//! Every key is optional; a missing file means defaults.

use crate::error::{Error, Result};
use crate::executor::SkipPolicy;
use crate::host::makepkg::default_makeflags;
use crate::registry::aur::{DEFAULT_PKGBUILD_URL, DEFAULT_RPC_URL};
use crate::registry::DEFAULT_BATCH_SIZE;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Largest batch the AUR accepts without hitting URL length limits
const MAX_BATCH_SIZE: usize = 250;

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Registry settings
    #[serde(default)]
    pub registry: RegistrySection,

    /// Sync index settings
    #[serde(default)]
    pub index: IndexSection,

    /// Build settings
    #[serde(default)]
    pub build: BuildSection,

    /// Install settings
    #[serde(default)]
    pub install: InstallSection,
}

/// Registry configuration section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// PKGBUILD endpoint (package base passed as `h`)
    #[serde(default = "default_pkgbuild_url")]
    pub pkgbuild_url: String,

    /// Request timeout (e.g., "30s", "2m")
    #[serde(default = "default_registry_timeout")]
    pub timeout: String,

    /// Names per info request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            pkgbuild_url: default_pkgbuild_url(),
            timeout: default_registry_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_pkgbuild_url() -> String {
    DEFAULT_PKGBUILD_URL.to_string()
}

fn default_registry_timeout() -> String {
    "30s".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Sync index configuration section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    /// Also treat names provided by sync packages as trusted
    #[serde(default = "default_true")]
    pub provides: bool,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self { provides: true }
    }
}

fn default_true() -> bool {
    true
}

/// Build configuration section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Base URL of the package git repositories
    #[serde(default = "default_clone_url")]
    pub clone_url: String,

    /// Timeout for `git clone` (e.g., "10m"); makepkg itself is never time-limited
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout: String,

    /// MAKEFLAGS exported to makepkg (default: -j<cpus>)
    #[serde(default)]
    pub makeflags: Option<String>,

    /// Parent directory for build areas (default: system temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            clone_url: default_clone_url(),
            clone_timeout: default_clone_timeout(),
            makeflags: None,
            scratch_dir: None,
        }
    }
}

fn default_clone_url() -> String {
    "https://aur.archlinux.org".to_string()
}

fn default_clone_timeout() -> String {
    "10m".to_string()
}

/// Install configuration section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    /// Skip audit prompts and pass --noconfirm to pacman and makepkg
    #[serde(default)]
    pub noconfirm: bool,

    /// Build dependents of packages skipped at audit anyway
    #[serde(default)]
    pub best_effort: bool,

    /// Privilege escalation command for pacman
    #[serde(default = "default_sudo")]
    pub sudo: String,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            noconfirm: false,
            best_effort: false,
            sudo: default_sudo(),
        }
    }
}

fn default_sudo() -> String {
    "sudo".to_string()
}

impl Config {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location: `$XDG_CONFIG_HOME/aurweave/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("aurweave").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            Error::ConfigError(msg) => Error::ConfigError(format!("{} (in {})", msg, path.display())),
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load an explicit file, or the default file if it exists, or defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("registry.rpc_url", &self.registry.rpc_url)?;
        validate_url("registry.pkgbuild_url", &self.registry.pkgbuild_url)?;
        validate_url("build.clone_url", &self.build.clone_url)?;

        if !(1..=MAX_BATCH_SIZE).contains(&self.registry.batch_size) {
            return Err(Error::ConfigError(format!(
                "registry.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.registry.batch_size
            )));
        }

        self.registry_timeout()?;
        self.clone_timeout()?;

        if self.install.sudo.trim().is_empty() {
            return Err(Error::ConfigError("install.sudo must not be empty".to_string()));
        }

        Ok(())
    }

    /// Registry request timeout
    pub fn registry_timeout(&self) -> Result<Duration> {
        parse_duration("registry.timeout", &self.registry.timeout)
    }

    /// `git clone` timeout
    pub fn clone_timeout(&self) -> Result<Duration> {
        parse_duration("build.clone_timeout", &self.build.clone_timeout)
    }

    /// MAKEFLAGS for builds
    pub fn makeflags(&self) -> String {
        self.build.makeflags.clone().unwrap_or_else(default_makeflags)
    }

    /// Policy for dependents of audit-skipped packages
    pub fn skip_policy(&self) -> SkipPolicy {
        if self.install.best_effort {
            SkipPolicy::BestEffort
        } else {
            SkipPolicy::FailDependents
        }
    }
}

fn validate_url(key: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::ConfigError(format!("Invalid {} '{}': {}", key, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::ConfigError(format!(
            "{} must be an http(s) URL, got scheme '{}'",
            key, scheme
        ))),
    }
}

/// Parse a duration string like "30s", "5m", "1h"
pub fn parse_duration(key: &str, s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 60 * 60)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Assume seconds
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("Invalid duration for {}: '{}'", key, s)))?;

    if num == 0 {
        return Err(Error::ConfigError(format!("{} must be greater than zero", key)));
    }

    Ok(Duration::from_secs(num * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry.batch_size, 100);
        assert!(config.index.provides);
        assert_eq!(config.install.sudo, "sudo");
        assert_eq!(config.registry_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.clone_timeout().unwrap(), Duration::from_secs(600));
        assert_eq!(config.skip_policy(), SkipPolicy::FailDependents);
        assert!(config.makeflags().starts_with("-j"));
    }

    #[test]
    fn test_parse_partial() {
        let config = Config::parse(
            r#"
[registry]
batch_size = 50

[build]
makeflags = "-j2"

[install]
noconfirm = true
best_effort = true
"#,
        )
        .unwrap();

        assert_eq!(config.registry.batch_size, 50);
        assert_eq!(config.registry.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.makeflags(), "-j2");
        assert!(config.install.noconfirm);
        assert_eq!(config.skip_policy(), SkipPolicy::BestEffort);
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::parse("[registry]\nbatch_size = 0\n").is_err());
        assert!(Config::parse("[registry]\nrpc_url = \"not a url\"\n").is_err());
        assert!(Config::parse("[build]\nclone_url = \"ftp://example.com\"\n").is_err());
        assert!(Config::parse("[build]\nclone_timeout = \"soon\"\n").is_err());
        assert!(Config::parse("[build]\ntimeout = \"1h\"\n").is_err());
        assert!(Config::parse("[install]\nsudo = \"\"\n").is_err());
        assert!(Config::parse("[install]\nbogus = 1\n").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("t", "45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("t", "2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("t", "1H").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("t", "0s").is_err());
        assert!(parse_duration("t", "-1").is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[index]\nprovides = false").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(!config.index.provides);

        let config = Config::discover(Some(file.path())).unwrap();
        assert!(!config.index.provides);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
