// src/planner.rs

//! Installation planning
//!
//! Turns a set of requested names into an `InstallationPlan`:
//!
//! 1. ask the installed-set collaborator once for the whole request
//! 2. drop what is already installed
//! 3. partition the rest into trusted and untrusted by the source index
//! 4. resolve the untrusted names and their closure
//!
//! Planning never has side effects, so a preview and a real run produce
//! the same plan.

use crate::error::{Error, Result};
use crate::host::InstalledQuery;
use crate::index::SourceIndex;
use crate::registry::{RegistryBackend, RegistryClient};
use crate::resolver::{DependencyResolver, InstallationPlan, PlannedInstall, RunMode};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Builds installation plans against one registry session
pub struct InstallationPlanner<'a, B> {
    index: &'a dyn SourceIndex,
    installed: &'a dyn InstalledQuery,
    registry: &'a mut RegistryClient<B>,
}

impl<'a, B: RegistryBackend> InstallationPlanner<'a, B> {
    pub fn new(
        index: &'a dyn SourceIndex,
        installed: &'a dyn InstalledQuery,
        registry: &'a mut RegistryClient<B>,
    ) -> Self {
        Self {
            index,
            installed,
            registry,
        }
    }

    /// Plan the installation of `requested`
    ///
    /// Names are deduplicated and processed in sorted order. Any lookup
    /// failure aborts planning; no partial plan is returned.
    pub fn plan(&mut self, requested: &[String], mode: RunMode) -> Result<PlannedInstall> {
        let names: Vec<String> = requested
            .iter()
            .filter(|name| !name.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut plan = InstallationPlan::default();
        if names.is_empty() {
            return Ok(PlannedInstall::new(plan, mode));
        }

        let installed = self.installed.installed(&names)?;

        let mut untrusted_roots = Vec::new();
        for name in names {
            if installed.contains(&name) {
                debug!("{} is already installed", name);
                plan.already_installed.insert(name);
            } else if self.index.contains(&name) {
                plan.trusted.insert(name);
            } else {
                untrusted_roots.push(name);
            }
        }

        let resolution = DependencyResolver::new(self.index, self.installed, &mut *self.registry)
            .resolve(&untrusted_roots)
            .inspect_err(|e| {
                if let Error::NotFound { packages } = e {
                    warn!("Not found in any source: {}", packages.join(", "));
                }
            })?;

        plan.untrusted = resolution.order;
        plan.records = resolution.records;

        info!(
            "Planned {} repository and {} AUR package(s) ({} already installed)",
            plan.trusted.len(),
            plan.untrusted.len(),
            plan.already_installed.len()
        );

        Ok(PlannedInstall::new(plan, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SyncIndex;
    use crate::package::PackageRecord;
    use std::collections::HashSet;

    struct Fixture(Vec<PackageRecord>);

    impl RegistryBackend for Fixture {
        fn query_info(&self, names: &[String]) -> Result<Vec<PackageRecord>> {
            Ok(self
                .0
                .iter()
                .filter(|r| names.contains(&r.name))
                .cloned()
                .collect())
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition() {
        let index = SyncIndex::from_names(["git", "bash", "pacman"]);
        let installed: HashSet<String> = strings(&["bash"]).into_iter().collect();
        let mut registry = RegistryClient::new(Fixture(vec![
            PackageRecord::new("yay", "12.0-1").with_depends(["git", "pacman"]),
        ]));

        let planned = InstallationPlanner::new(&index, &installed, &mut registry)
            .plan(&strings(&["yay", "git", "bash", "git"]), RunMode::Execute)
            .unwrap();

        let plan = &planned.plan;
        assert_eq!(plan.already_installed, BTreeSet::from(["bash".to_string()]));
        assert_eq!(plan.trusted, BTreeSet::from(["git".to_string()]));
        assert_eq!(plan.untrusted, vec!["yay"]);
        assert!(plan.rejected.is_empty());
        assert!(plan.record("yay").is_some());
        assert_eq!(planned.mode, RunMode::Execute);
    }

    #[test]
    fn test_empty_request() {
        let index = SyncIndex::default();
        let installed: HashSet<String> = HashSet::new();
        let mut registry = RegistryClient::new(Fixture(Vec::new()));

        let planned = InstallationPlanner::new(&index, &installed, &mut registry)
            .plan(&[], RunMode::Preview)
            .unwrap();

        assert!(planned.plan.is_empty());
        assert_eq!(registry.backend_calls(), 0);
    }

    #[test]
    fn test_all_installed_skips_registry() {
        let index = SyncIndex::default();
        let installed: HashSet<String> = strings(&["yay"]).into_iter().collect();
        let mut registry = RegistryClient::new(Fixture(Vec::new()));

        let planned = InstallationPlanner::new(&index, &installed, &mut registry)
            .plan(&strings(&["yay"]), RunMode::Execute)
            .unwrap();

        assert!(planned.plan.is_empty());
        assert_eq!(registry.backend_calls(), 0);
    }

    #[test]
    fn test_unknown_name_fails() {
        let index = SyncIndex::from_names(["git"]);
        let installed: HashSet<String> = HashSet::new();
        let mut registry = RegistryClient::new(Fixture(Vec::new()));

        let err = InstallationPlanner::new(&index, &installed, &mut registry)
            .plan(&strings(&["git", "nope"]), RunMode::Execute)
            .unwrap_err();

        assert!(matches!(err, Error::NotFound { ref packages } if packages == &["nope"]));
    }
}
