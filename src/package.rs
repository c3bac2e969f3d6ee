// src/package.rs

//! Package records and dependency strings
//!
//! A `PackageRecord` is the metadata of one untrusted package as returned by
//! the registry. Records are immutable once fetched and live only for the
//! duration of one resolution run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Origin of a package name
///
/// A name belongs to exactly one source. The trusted source is checked
/// first and wins ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    /// Locally indexed repositories (pacman sync databases)
    Trusted,
    /// Network-backed user repository (AUR)
    Untrusted,
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trusted => write!(f, "repository"),
            Self::Untrusted => write!(f, "aur"),
        }
    }
}

/// A dependency as declared by a package, e.g. `glibc>=2.17`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<String>,
}

impl Dependency {
    /// Parse a dependency string like "package>=1.0"
    ///
    /// Format is `name[op version]` with no spaces. A trailing `: description`
    /// (optdepends style) is dropped; epochs such as `>=1:2.0` are kept.
    pub fn parse(dep: &str) -> Self {
        let dep = dep.split(": ").next().unwrap_or(dep).trim();

        if let Some(pos) = dep.find(['>', '<', '=']) {
            Self {
                name: dep[..pos].to_string(),
                constraint: Some(dep[pos..].to_string()),
            }
        } else {
            Self {
                name: dep.to_string(),
                constraint: None,
            }
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}{}", self.name, c),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Metadata and dependency lists of one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    /// Package base the sources are cloned from (split packages share one)
    pub package_base: String,
    pub source: PackageSource,
    pub version: String,
    pub maintainer: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub votes: u32,
    pub popularity: f64,
    pub out_of_date: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Runtime dependencies
    pub depends: Vec<Dependency>,
    /// Build-time-only dependencies
    pub make_depends: Vec<Dependency>,
}

impl PackageRecord {
    /// Create a minimal untrusted record with no dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            package_base: name.clone(),
            name,
            source: PackageSource::Untrusted,
            version: version.into(),
            maintainer: None,
            description: None,
            url: None,
            votes: 0,
            popularity: 0.0,
            out_of_date: None,
            last_modified: None,
            depends: Vec::new(),
            make_depends: Vec::new(),
        }
    }

    /// Set the maintainer
    pub fn with_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.maintainer = Some(maintainer.into());
        self
    }

    /// Add runtime dependencies from dependency strings
    pub fn with_depends<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.depends
            .extend(deps.into_iter().map(|d| Dependency::parse(d.as_ref())));
        self
    }

    /// Add build-time dependencies from dependency strings
    pub fn with_make_depends<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.make_depends
            .extend(deps.into_iter().map(|d| Dependency::parse(d.as_ref())));
        self
    }

    /// Names of all runtime and build-time dependencies
    ///
    /// The union is deduplicated, runtime dependencies first, each list in
    /// declaration order.
    pub fn dependency_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.depends
            .iter()
            .chain(self.make_depends.iter())
            .map(|d| d.name.as_str())
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .collect()
    }

    /// A record with no maintainer is orphaned and carries elevated risk
    pub fn is_orphaned(&self) -> bool {
        self.maintainer.is_none()
    }

    /// Whether the package has been flagged out of date upstream
    pub fn is_out_of_date(&self) -> bool {
        self.out_of_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dependency() {
        let dep = Dependency::parse("glibc>=2.17");
        assert_eq!(dep.name, "glibc");
        assert_eq!(dep.constraint.as_deref(), Some(">=2.17"));

        let dep = Dependency::parse("bash");
        assert_eq!(dep.name, "bash");
        assert!(dep.constraint.is_none());

        let dep = Dependency::parse("perl<6");
        assert_eq!(dep.name, "perl");
        assert_eq!(dep.to_string(), "perl<6");

        let dep = Dependency::parse("ffmpeg>=2:6.0");
        assert_eq!(dep.name, "ffmpeg");
        assert_eq!(dep.constraint.as_deref(), Some(">=2:6.0"));

        // a bare operator still round-trips
        let dep = Dependency::parse("libfoo=");
        assert_eq!(dep.name, "libfoo");
        assert_eq!(dep.to_string(), "libfoo=");
    }

    #[test]
    fn test_parse_dependency_with_description() {
        let dep = Dependency::parse("python-pillow: image support");
        assert_eq!(dep.name, "python-pillow");
        assert!(dep.constraint.is_none());
    }

    #[test]
    fn test_dependency_names_union() {
        let record = PackageRecord::new("foo", "1.0-1")
            .with_depends(["libbar>=2", "libbaz"])
            .with_make_depends(["cmake", "libbar"]);

        assert_eq!(record.dependency_names(), vec!["libbar", "libbaz", "cmake"]);
    }

    #[test]
    fn test_orphaned() {
        let record = PackageRecord::new("foo", "1.0-1");
        assert!(record.is_orphaned());
        assert!(!record.with_maintainer("alice").is_orphaned());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(PackageSource::Trusted.to_string(), "repository");
        assert_eq!(PackageSource::Untrusted.to_string(), "aur");
    }
}
