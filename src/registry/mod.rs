// src/registry/mod.rs

//! Untrusted package registry
//!
//! `RegistryClient` answers "what are the metadata and dependencies of P?"
//! for the untrusted source. It sits on top of a `RegistryBackend` (the AUR
//! RPC in production, in-memory fixtures in tests) and adds:
//!
//! - a per-run cache of records *and* absences, so a name is asked for at
//!   most once
//! - chunking of large batches to respect request size limits
//! - concurrent fetching of chunks, presented as one synchronous call
//!
//! A client lives for exactly one resolution run; it is created by the
//! caller and passed explicitly to the resolver.

pub mod aur;

use crate::error::{Error, Result};
use crate::package::PackageRecord;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

pub use aur::AurRpc;

/// Default number of names per backend request
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Wire access to the untrusted registry
///
/// Implementations report transport problems as `Error::Unavailable`. A
/// name the registry does not know is simply missing from the result.
pub trait RegistryBackend: Send + Sync {
    /// Look up metadata for a batch of names
    fn query_info(&self, names: &[String]) -> Result<Vec<PackageRecord>>;

    /// Free-text search over names and descriptions
    fn search(&self, _term: &str) -> Result<Vec<PackageRecord>> {
        Err(Error::Unavailable(
            "search is not supported by this registry".to_string(),
        ))
    }

    /// Fetch the build script of a package base for review
    fn fetch_pkgbuild(&self, _package_base: &str) -> Result<String> {
        Err(Error::Unavailable(
            "build script download is not supported by this registry".to_string(),
        ))
    }
}

impl<T: RegistryBackend + ?Sized> RegistryBackend for &T {
    fn query_info(&self, names: &[String]) -> Result<Vec<PackageRecord>> {
        (**self).query_info(names)
    }

    fn search(&self, term: &str) -> Result<Vec<PackageRecord>> {
        (**self).search(term)
    }

    fn fetch_pkgbuild(&self, package_base: &str) -> Result<String> {
        (**self).fetch_pkgbuild(package_base)
    }
}

/// Batched, caching front end to a registry backend
pub struct RegistryClient<B> {
    backend: B,
    cache: HashMap<String, Option<PackageRecord>>,
    batch_size: usize,
    backend_calls: usize,
}

impl<B: RegistryBackend> RegistryClient<B> {
    /// Create a client with the default batch size
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: HashMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            backend_calls: 0,
        }
    }

    /// Set the maximum number of names per backend request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fetch records for `names`
    ///
    /// Every requested name appears in the result; names unknown to the
    /// registry map to `None`. Only names not seen earlier in this run are
    /// sent to the backend.
    pub fn fetch_info(
        &mut self,
        names: &[String],
    ) -> Result<BTreeMap<String, Option<PackageRecord>>> {
        let mut seen = HashSet::new();
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.cache.contains_key(name.as_str()) && seen.insert(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            self.fetch_missing(&missing)?;
        }

        Ok(names
            .iter()
            .map(|name| {
                let record = self.cache.get(name).cloned().flatten();
                (name.clone(), record)
            })
            .collect())
    }

    /// Fetch a single record
    pub fn get(&mut self, name: &str) -> Result<Option<PackageRecord>> {
        let name = name.to_string();
        let mut found = self.fetch_info(std::slice::from_ref(&name))?;
        Ok(found.remove(&name).flatten())
    }

    fn fetch_missing(&mut self, missing: &[String]) -> Result<()> {
        let chunks: Vec<&[String]> = missing.chunks(self.batch_size).collect();
        debug!(
            "Fetching {} name(s) from registry in {} request(s)",
            missing.len(),
            chunks.len()
        );

        let backend = &self.backend;
        let results: Vec<(&[String], Result<Vec<PackageRecord>>)> = chunks
            .par_iter()
            .map(|chunk| (*chunk, backend.query_info(chunk)))
            .collect();
        self.backend_calls += results.len();

        let mut first_error = None;
        for (chunk, result) in results {
            match result {
                Ok(records) => {
                    for record in records {
                        self.cache.insert(record.name.clone(), Some(record));
                    }
                    for name in chunk {
                        self.cache.entry(name.clone()).or_insert(None);
                    }
                }
                Err(e) => {
                    warn!("Registry request for {} name(s) failed: {}", chunk.len(), e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Search the registry, most voted first
    pub fn search(&self, term: &str) -> Result<Vec<PackageRecord>> {
        let mut results = self.backend.search(term)?;
        results.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        Ok(results)
    }

    /// Fetch the build script of a package base
    pub fn fetch_pkgbuild(&self, package_base: &str) -> Result<String> {
        self.backend.fetch_pkgbuild(package_base)
    }

    /// Number of requests sent to the backend so far
    pub fn backend_calls(&self) -> usize {
        self.backend_calls
    }

    /// Number of names (present or absent) cached in this run
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
