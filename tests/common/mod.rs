// tests/common/mod.rs

//! Shared fakes for integration tests.

#![allow(dead_code)]

use aurweave::{
    Error, InstalledQuery, PackageBuilder, PackageRecord, RegistryBackend, Result, ScratchArea,
    ScratchProvider, SyncIndex, TempScratch, TrustedInstaller,
};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// In-memory registry that records every batch it is asked for.
#[derive(Default)]
pub struct FakeRegistry {
    records: Vec<PackageRecord>,
    pub requests: Mutex<Vec<Vec<String>>>,
}

impl FakeRegistry {
    pub fn new(records: Vec<PackageRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl RegistryBackend for FakeRegistry {
    fn query_info(&self, names: &[String]) -> Result<Vec<PackageRecord>> {
        self.requests.lock().unwrap().push(names.to_vec());
        Ok(self
            .records
            .iter()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect())
    }
}

/// Registry that is always unreachable.
pub struct OfflineRegistry;

impl RegistryBackend for OfflineRegistry {
    fn query_info(&self, _names: &[String]) -> Result<Vec<PackageRecord>> {
        Err(Error::Unavailable("connection refused".to_string()))
    }
}

/// AUR package `name` depending on `deps`.
pub fn aur(name: &str, deps: &[&str]) -> PackageRecord {
    PackageRecord::new(name, "1.0-1")
        .with_maintainer("someone")
        .with_depends(deps.iter().copied())
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn repo(list: &[&str]) -> SyncIndex {
    SyncIndex::from_names(list.iter().copied())
}

pub fn installed(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Installed-package query that counts how often it is asked.
pub struct FakeInstalled {
    names: HashSet<String>,
    pub queries: Cell<usize>,
}

impl FakeInstalled {
    pub fn new(list: &[&str]) -> Self {
        Self {
            names: installed(list),
            queries: Cell::new(0),
        }
    }
}

impl InstalledQuery for FakeInstalled {
    fn installed(&self, names: &[String]) -> Result<HashSet<String>> {
        self.queries.set(self.queries.get() + 1);
        self.names.installed(names)
    }
}

/// Trusted installer that records batches and can be told to fail.
#[derive(Default)]
pub struct RecordingInstaller {
    pub batches: RefCell<Vec<Vec<String>>>,
    pub fail: bool,
}

impl TrustedInstaller for RecordingInstaller {
    fn install_batch(&self, names: &[String]) -> Result<()> {
        self.batches.borrow_mut().push(names.to_vec());
        if self.fail {
            return Err(Error::BatchInstallFailed {
                packages: names.to_vec(),
                detail: "pacman exited with code 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder that records build order and fails on the named package.
#[derive(Default)]
pub struct RecordingBuilder {
    pub builds: RefCell<Vec<String>>,
    pub fail_on: Option<String>,
}

impl RecordingBuilder {
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Default::default()
        }
    }
}

impl PackageBuilder for RecordingBuilder {
    fn build_and_install(&self, record: &PackageRecord, workdir: &Path) -> Result<()> {
        assert!(workdir.is_dir(), "build ran outside a live scratch area");
        self.builds.borrow_mut().push(record.name.clone());
        if self.fail_on.as_deref() == Some(record.name.as_str()) {
            return Err(Error::SinglePackageInstallFailed {
                package: record.name.clone(),
                detail: "makepkg exited with code 4".to_string(),
            });
        }
        Ok(())
    }
}

struct CountedArea {
    dir: TempDir,
}

impl ScratchArea for CountedArea {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Scratch provider that counts acquisitions.
#[derive(Default)]
pub struct CountingScratch {
    pub acquired: Cell<usize>,
}

impl ScratchProvider for CountingScratch {
    fn acquire(&self) -> Result<Box<dyn ScratchArea>> {
        self.acquired.set(self.acquired.get() + 1);
        let dir = tempfile::tempdir()?;
        Ok(Box::new(CountedArea { dir }))
    }
}

/// Real temporary scratch areas, remembering every path handed out.
#[derive(Default)]
pub struct TrackingScratch {
    inner: TempScratch,
    pub paths: RefCell<Vec<PathBuf>>,
}

impl ScratchProvider for TrackingScratch {
    fn acquire(&self) -> Result<Box<dyn ScratchArea>> {
        let area = self.inner.acquire()?;
        self.paths.borrow_mut().push(area.path().to_path_buf());
        Ok(area)
    }
}
