// src/resolver/plan.rs

//! Installation plan data structures
//!
//! A plan is the frozen, side-effect-free output of partitioning plus
//! resolution. It is serializable so a preview can be shown as JSON.

use crate::error::{Error, Result};
use crate::package::PackageRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What the caller should do with a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Install for real
    Execute,
    /// Report only; the executor performs no side effects
    Preview,
}

/// Result of planning an installation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationPlan {
    /// Requested names that are already installed (informational)
    pub already_installed: BTreeSet<String>,
    /// Names to install from the trusted source as one batch
    pub trusted: BTreeSet<String>,
    /// Untrusted names in install order (dependencies first)
    pub untrusted: Vec<String>,
    /// Names that failed lookup
    pub rejected: BTreeSet<String>,
    /// Record of every untrusted entry
    pub records: BTreeMap<String, PackageRecord>,
}

impl InstallationPlan {
    /// Nothing to install
    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty() && self.untrusted.is_empty()
    }

    /// Total number of packages that would be installed
    pub fn install_count(&self) -> usize {
        self.trusted.len() + self.untrusted.len()
    }

    /// Record of an untrusted entry
    pub fn record(&self, name: &str) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    /// Dependencies of `name` that are themselves untrusted entries of this plan
    pub fn untrusted_dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(record) = self.records.get(name) else {
            return Vec::new();
        };
        record
            .dependency_names()
            .into_iter()
            .filter(|dep| self.records.contains_key(*dep))
            .collect()
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::ParseError(format!("Failed to serialize plan: {e}")))
    }
}

impl fmt::Display for InstallationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.already_installed.is_empty() {
            let names: Vec<&str> = self.already_installed.iter().map(String::as_str).collect();
            writeln!(f, "Already installed: {}", names.join(", "))?;
        }

        if !self.trusted.is_empty() {
            writeln!(f, "Repository packages ({}):", self.trusted.len())?;
            for name in &self.trusted {
                writeln!(f, "  {}", name)?;
            }
        }

        if !self.untrusted.is_empty() {
            writeln!(f, "AUR packages ({}), in build order:", self.untrusted.len())?;
            for (i, name) in self.untrusted.iter().enumerate() {
                write!(f, "  {}. {}", i + 1, name)?;
                if let Some(record) = self.records.get(name) {
                    write!(f, " {}", record.version)?;
                    if record.is_orphaned() {
                        write!(f, " [orphaned]")?;
                    }
                    if record.is_out_of_date() {
                        write!(f, " [out of date]")?;
                    }
                }
                writeln!(f)?;

                let deps = self.untrusted_dependencies_of(name);
                if !deps.is_empty() {
                    writeln!(f, "     after: {}", deps.join(", "))?;
                }
            }
        }

        if self.is_empty() {
            writeln!(f, "Nothing to install")?;
        }
        Ok(())
    }
}

/// A plan together with its run mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedInstall {
    pub plan: InstallationPlan,
    pub mode: RunMode,
}

impl PlannedInstall {
    pub fn new(plan: InstallationPlan, mode: RunMode) -> Self {
        Self { plan, mode }
    }

    pub fn is_preview(&self) -> bool {
        self.mode == RunMode::Preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InstallationPlan {
        let mut plan = InstallationPlan::default();
        plan.already_installed.insert("bash".to_string());
        plan.trusted.insert("git".to_string());
        plan.untrusted = vec!["libfoo".to_string(), "foo".to_string()];
        plan.records.insert(
            "libfoo".to_string(),
            PackageRecord::new("libfoo", "1.0-1").with_maintainer("alice"),
        );
        plan.records.insert(
            "foo".to_string(),
            PackageRecord::new("foo", "2.0-1").with_depends(["libfoo", "glibc"]),
        );
        plan
    }

    #[test]
    fn test_counts() {
        let plan = sample();
        assert!(!plan.is_empty());
        assert_eq!(plan.install_count(), 3);
        assert!(InstallationPlan::default().is_empty());
    }

    #[test]
    fn test_untrusted_dependencies_of() {
        let plan = sample();
        assert_eq!(plan.untrusted_dependencies_of("foo"), vec!["libfoo"]);
        assert!(plan.untrusted_dependencies_of("libfoo").is_empty());
    }

    #[test]
    fn test_render() {
        let text = sample().to_string();
        assert!(text.contains("Already installed: bash"));
        assert!(text.contains("Repository packages (1):"));
        assert!(text.contains("1. libfoo 1.0-1\n"));
        assert!(text.contains("2. foo 2.0-1 [orphaned]"));
        assert!(text.contains("after: libfoo"));
    }

    #[test]
    fn test_json_is_stable() {
        let plan = sample();
        let json = plan.to_json().unwrap();
        let back: InstallationPlan = serde_json::from_str(&json).unwrap();

        assert_eq!(back, plan);
        assert_eq!(back.to_json().unwrap(), json);
    }

    #[test]
    fn test_preview_marker() {
        let planned = PlannedInstall::new(InstallationPlan::default(), RunMode::Preview);
        assert!(planned.is_preview());
    }
}
