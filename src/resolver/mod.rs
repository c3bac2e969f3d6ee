// src/resolver/mod.rs

//! Dependency resolution for untrusted packages
//!
//! Computes the transitive closure of the requested untrusted packages and
//! a linear install order in which every untrusted dependency precedes its
//! dependents. The walk is a depth-first search with three-colour marking
//! (`VisitState`), driven by an explicit stack so deep chains do not grow
//! the call stack.
//!
//! Trusted names stop the descent: they are satisfied by the repository
//! batch (or by makepkg's own dependency sync) and never enter the order.

pub mod plan;

use crate::error::{Error, Result};
use crate::host::InstalledQuery;
use crate::index::SourceIndex;
use crate::package::PackageRecord;
use crate::registry::{RegistryBackend, RegistryClient};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

pub use plan::{InstallationPlan, PlannedInstall, RunMode};

/// Per-name marking during a resolution walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitState {
    #[default]
    Unvisited,
    /// On the current DFS path; meeting it again means a cycle
    InProgress,
    /// Appended to the order
    Resolved,
}

/// Output of a successful resolution
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Untrusted packages, dependencies first, no duplicates
    pub order: Vec<String>,
    /// Record for every name in `order`
    pub records: BTreeMap<String, PackageRecord>,
}

/// A package whose dependency list is being walked
struct Frame {
    name: String,
    deps: Vec<String>,
    next: usize,
}

/// Resolves untrusted packages into a dependency-first install order
///
/// A resolver performs exactly one run; `resolve` consumes it.
pub struct DependencyResolver<'a, B> {
    index: &'a dyn SourceIndex,
    installed: &'a dyn InstalledQuery,
    registry: &'a mut RegistryClient<B>,
    state: HashMap<String, VisitState>,
    order: Vec<String>,
    records: BTreeMap<String, PackageRecord>,
}

impl<'a, B: RegistryBackend> DependencyResolver<'a, B> {
    pub fn new(
        index: &'a dyn SourceIndex,
        installed: &'a dyn InstalledQuery,
        registry: &'a mut RegistryClient<B>,
    ) -> Self {
        Self {
            index,
            installed,
            registry,
            state: HashMap::new(),
            order: Vec::new(),
            records: BTreeMap::new(),
        }
    }

    /// Resolve `roots` (visited in the given order) and their closure
    ///
    /// All or nothing: on error no partial order is returned.
    pub fn resolve(mut self, roots: &[String]) -> Result<Resolution> {
        if roots.is_empty() {
            return Ok(Resolution::default());
        }

        // One request for every root, so all unknown roots are reported together
        let found = self.registry.fetch_info(roots)?;
        let missing: Vec<String> = roots
            .iter()
            .filter(|name| {
                !self.index.contains(name) && found.get(*name).is_none_or(Option::is_none)
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::NotFound { packages: missing });
        }

        for root in roots {
            self.visit_root(root)?;
        }

        info!("Resolved {} untrusted package(s)", self.order.len());
        Ok(Resolution {
            order: self.order,
            records: self.records,
        })
    }

    fn visit_root(&mut self, root: &str) -> Result<()> {
        let mut stack = Vec::new();
        if let Some(frame) = self.enter(root, None)? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let Some(dep) = frame.deps.get(frame.next).cloned() else {
                if let Some(done) = stack.pop() {
                    self.finish(done.name);
                }
                continue;
            };
            frame.next += 1;
            let parent = frame.name.clone();

            if self.state(&dep) == VisitState::InProgress {
                let path: Vec<&str> = stack
                    .iter()
                    .map(|f| f.name.as_str())
                    .skip_while(|name| *name != dep)
                    .collect();
                debug!("Dependency cycle: {} -> {}", path.join(" -> "), dep);
                return Err(Error::CircularDependency { package: dep });
            }

            if let Some(child) = self.enter(&dep, Some(&parent))? {
                stack.push(child);
            }
        }

        Ok(())
    }

    fn state(&self, name: &str) -> VisitState {
        self.state.get(name).copied().unwrap_or_default()
    }

    /// Start visiting `name`; returns `None` if there is nothing to walk
    fn enter(&mut self, name: &str, required_by: Option<&str>) -> Result<Option<Frame>> {
        match self.state(name) {
            VisitState::Resolved => return Ok(None),
            VisitState::InProgress => {
                return Err(Error::CircularDependency {
                    package: name.to_string(),
                });
            }
            VisitState::Unvisited => {}
        }
        if self.index.contains(name) {
            return Ok(None);
        }

        let Some(record) = self.registry.get(name)? else {
            return Err(match required_by {
                Some(parent) => Error::UnresolvedDependency {
                    dependency: name.to_string(),
                    required_by: parent.to_string(),
                },
                None => Error::NotFound {
                    packages: vec![name.to_string()],
                },
            });
        };

        self.state.insert(name.to_string(), VisitState::InProgress);
        let deps = self.pending_dependencies(&record)?;
        debug!("{} needs {} untrusted dependencies: {:?}", name, deps.len(), deps);
        self.records.insert(name.to_string(), record);

        Ok(Some(Frame {
            name: name.to_string(),
            deps,
            next: 0,
        }))
    }

    /// Dependencies of `record` that must come from the untrusted source
    ///
    /// Trusted and already-installed names are dropped; the rest is
    /// prefetched as one batch.
    fn pending_dependencies(&mut self, record: &PackageRecord) -> Result<Vec<String>> {
        let candidates: Vec<String> = record
            .dependency_names()
            .into_iter()
            .filter(|name| !self.index.contains(name))
            .map(str::to_string)
            .collect();
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let installed = self.installed.installed(&candidates)?;
        let deps: Vec<String> = candidates
            .into_iter()
            .filter(|name| !installed.contains(name))
            .collect();

        let unvisited: Vec<String> = deps
            .iter()
            .filter(|name| self.state(name) == VisitState::Unvisited)
            .cloned()
            .collect();
        if !unvisited.is_empty() {
            self.registry.fetch_info(&unvisited)?;
        }

        Ok(deps)
    }

    fn finish(&mut self, name: String) {
        self.state.insert(name.clone(), VisitState::Resolved);
        self.order.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SyncIndex;
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

    fn pkg(name: &str, deps: &[&str]) -> PackageRecord {
        PackageRecord::new(name, "1.0-1").with_depends(deps.iter().copied())
    }

    fn resolve(records: Vec<PackageRecord>, trusted: &[&str], roots: &[&str]) -> Result<Resolution> {
        let index = SyncIndex::from_names(trusted.iter().copied());
        let installed: HashSet<String> = HashSet::new();
        let mut registry = RegistryClient::new(Fixture(records));
        let roots: Vec<String> = roots.iter().map(|s| s.to_string()).collect();
        DependencyResolver::new(&index, &installed, &mut registry).resolve(&roots)
    }

    #[test]
    fn test_chain_is_dependency_first() {
        let res = resolve(vec![pkg("x", &["y"]), pkg("y", &[])], &[], &["x"]).unwrap();
        assert_eq!(res.order, vec!["y", "x"]);
        assert_eq!(res.records.len(), 2);
    }

    #[test]
    fn test_shared_dependency_once() {
        let res = resolve(
            vec![pkg("x", &["y"]), pkg("z", &["y"]), pkg("y", &[])],
            &[],
            &["x", "z"],
        )
        .unwrap();
        assert_eq!(res.order, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_trusted_dependency_stops_descent() {
        let res = resolve(
            vec![pkg("x", &["glibc>=2.17", "y"]), pkg("y", &["bash"])],
            &["glibc", "bash"],
            &["x"],
        )
        .unwrap();
        assert_eq!(res.order, vec!["y", "x"]);
    }

    #[test]
    fn test_make_depends_are_followed() {
        let x = pkg("x", &[]).with_make_depends(["builder"]);
        let res = resolve(vec![x, pkg("builder", &[])], &[], &["x"]).unwrap();
        assert_eq!(res.order, vec!["builder", "x"]);
    }

    #[test]
    fn test_cycle_detected() {
        let err = resolve(vec![pkg("a", &["b"]), pkg("b", &["a"])], &[], &["a"]).unwrap_err();
        match err {
            Error::CircularDependency { package } => assert!(package == "a" || package == "b"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let err = resolve(vec![pkg("a", &["a"])], &[], &["a"]).unwrap_err();
        assert!(matches!(err, Error::CircularDependency { ref package } if package == "a"));
    }

    #[test]
    fn test_missing_roots_reported_together() {
        let err = resolve(vec![pkg("x", &[])], &[], &["nope", "x", "gone"]).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref packages } if packages == &["nope", "gone"]));
    }

    #[test]
    fn test_missing_dependency_names_dependency() {
        let err = resolve(vec![pkg("x", &["ghost"])], &[], &["x"]).unwrap_err();
        match err {
            Error::UnresolvedDependency {
                dependency,
                required_by,
            } => {
                assert_eq!(dependency, "ghost");
                assert_eq!(required_by, "x");
            }
            other => panic!("expected unresolved dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_installed_dependency_skipped() {
        let index = SyncIndex::default();
        let installed: HashSet<String> = ["y".to_string()].into_iter().collect();
        let mut registry = RegistryClient::new(Fixture(vec![pkg("x", &["y"])]));

        let res = DependencyResolver::new(&index, &installed, &mut registry)
            .resolve(&["x".to_string()])
            .unwrap();

        assert_eq!(res.order, vec!["x"]);
    }

    #[test]
    fn test_deep_chain() {
        let depth = 5000;
        let records: Vec<PackageRecord> = (0..depth)
            .map(|i| {
                let name = format!("p{}", i);
                let next = format!("p{}", i + 1);
                if i + 1 < depth {
                    pkg(&name, &[next.as_str()])
                } else {
                    pkg(&name, &[])
                }
            })
            .collect();

        let res = resolve(records, &[], &["p0"]).unwrap();

        assert_eq!(res.order.len(), depth);
        assert_eq!(res.order.first().map(String::as_str), Some("p4999"));
        assert_eq!(res.order.last().map(String::as_str), Some("p0"));
    }

    #[test]
    fn test_dependencies_prefetched_in_one_batch() {
        let records = vec![
            pkg("x", &["a", "b", "c"]),
            pkg("a", &[]),
            pkg("b", &[]),
            pkg("c", &[]),
        ];
        let index = SyncIndex::default();
        let installed: HashSet<String> = HashSet::new();
        let mut registry = RegistryClient::new(Fixture(records));

        DependencyResolver::new(&index, &installed, &mut registry)
            .resolve(&["x".to_string()])
            .unwrap();

        assert_eq!(registry.backend_calls(), 2);
    }
}
