// src/host/mod.rs

//! External collaborators of the planner and executor
//!
//! The core never talks to pacman, git or makepkg directly. It goes through
//! these traits, which keeps resolution and execution testable against
//! in-memory fakes:
//!
//! - `InstalledQuery` - which names are already installed
//! - `TrustedInstaller` - install trusted packages as one batch
//! - `PackageBuilder` - build and install a single untrusted package
//! - `ScratchProvider` - hand out a working area for build artifacts

pub mod makepkg;
pub mod pacman;
pub mod scratch;

use crate::error::Result;
use crate::package::PackageRecord;
use std::collections::HashSet;
use std::path::Path;

pub use makepkg::MakepkgBuilder;
pub use pacman::{Pacman, RepoMatch};
pub use scratch::TempScratch;

/// Answers "which of these names are already installed?"
pub trait InstalledQuery {
    /// Return the subset of `names` that is installed
    fn installed(&self, names: &[String]) -> Result<HashSet<String>>;
}

/// Installs trusted packages as a single batch
///
/// The batch is atomic from the caller's point of view: it either succeeds
/// or fails as a unit.
pub trait TrustedInstaller {
    fn install_batch(&self, names: &[String]) -> Result<()>;
}

/// Builds and installs one untrusted package inside a scratch directory
pub trait PackageBuilder {
    fn build_and_install(&self, record: &PackageRecord, workdir: &Path) -> Result<()>;
}

/// A working area for build artifacts
///
/// The area is reclaimed when the value is dropped.
pub trait ScratchArea {
    fn path(&self) -> &Path;
}

/// Supplies scratch working areas
pub trait ScratchProvider {
    fn acquire(&self) -> Result<Box<dyn ScratchArea>>;
}

impl InstalledQuery for HashSet<String> {
    fn installed(&self, names: &[String]) -> Result<HashSet<String>> {
        Ok(names
            .iter()
            .filter(|name| self.contains(name.as_str()))
            .cloned()
            .collect())
    }
}
