// src/index.rs

//! Trusted source index
//!
//! Answers "is this name satisfiable from the sync repositories?" against a
//! snapshot loaded once at startup. Lookups are O(1) and never touch the
//! network or spawn processes.

use crate::error::{Error, Result};
use crate::host::pacman;
use std::collections::HashSet;
use tracing::{debug, info};

/// Membership test for the trusted source
pub trait SourceIndex {
    /// Whether `name` is provided by the trusted source
    fn contains(&self, name: &str) -> bool;
}

impl<T: SourceIndex + ?Sized> SourceIndex for &T {
    fn contains(&self, name: &str) -> bool {
        (**self).contains(name)
    }
}

/// Snapshot of the pacman sync databases
#[derive(Debug, Clone, Default)]
pub struct SyncIndex {
    names: HashSet<String>,
    /// Virtual names provided by sync packages (e.g. `sh`)
    provides: HashSet<String>,
}

impl SyncIndex {
    /// Build an index from an explicit list of package names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            provides: HashSet::new(),
        }
    }

    /// Register virtual names that resolve to the trusted source
    pub fn with_provides<I, S>(mut self, provides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(provides.into_iter().map(Into::into));
        self
    }

    /// Load the index from the system pacman
    ///
    /// Failure is fatal: an unreadable sync database must not silently turn
    /// every package into an untrusted one.
    pub fn load(with_provides: bool) -> Result<Self> {
        let names = pacman::list_sync_packages()
            .map_err(|e| Error::InitError(format!("Failed to load sync index: {}", e)))?;

        if names.is_empty() {
            return Err(Error::InitError(
                "Sync index is empty; run 'pacman -Sy' first".to_string(),
            ));
        }

        let mut index = Self::from_names(names);

        if with_provides {
            let provides = pacman::list_sync_provides()
                .map_err(|e| Error::InitError(format!("Failed to load sync provides: {}", e)))?;
            index = index.with_provides(provides);
        }

        info!(
            "Loaded sync index: {} packages, {} provided names",
            index.names.len(),
            index.provides.len()
        );
        Ok(index)
    }

    /// Number of real package names in the index
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SourceIndex for SyncIndex {
    fn contains(&self, name: &str) -> bool {
        let found = self.names.contains(name) || self.provides.contains(name);
        if !found {
            debug!("{} is not in the sync index", name);
        }
        found
    }
}
