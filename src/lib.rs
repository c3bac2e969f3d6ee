// src/lib.rs

//! aurweave: install planning across pacman repositories and the AUR
//!
//! Resolves a set of requested package names against two sources, the
//! trusted pacman sync repositories and the untrusted AUR, and installs
//! them safely.
//!
//! # Architecture
//!
//! - `index`: is a name known to the sync repositories?
//! - `registry`: batched, cached AUR metadata lookups
//! - `resolver`: dependency-first ordering of AUR packages, cycle detection
//! - `planner`: partition a request into installed / repository / AUR
//! - `audit`: per-package Proceed/Skip decisions before building
//! - `executor`: repository batch first, then AUR packages one at a time,
//!   halting on the first failure
//! - `host`: pacman, git/makepkg and scratch directories behind traits

pub mod audit;
pub mod config;
mod error;
pub mod executor;
pub mod host;
pub mod index;
pub mod package;
pub mod planner;
pub mod progress;
pub mod registry;
pub mod resolver;

pub use audit::{AuditDecision, AuditGate, AutoApprove, InteractiveAudit};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use executor::{
    ExecutionResult, Executor, ExecutorState, SkipPolicy, SkipReason, SkippedPackage,
};
pub use host::{
    InstalledQuery, MakepkgBuilder, PackageBuilder, Pacman, RepoMatch, ScratchArea, ScratchProvider,
    TempScratch, TrustedInstaller,
};
pub use index::{SourceIndex, SyncIndex};
pub use package::{Dependency, PackageRecord, PackageSource};
pub use planner::InstallationPlanner;
pub use progress::{
    CallbackProgress, InstallPhase, LogProgress, ProgressEvent, ProgressTracker, SilentProgress,
};
pub use registry::{AurRpc, RegistryBackend, RegistryClient};
pub use resolver::{
    DependencyResolver, InstallationPlan, PlannedInstall, Resolution, RunMode, VisitState,
};
