// src/executor.rs

//! Plan execution
//!
//! Runs an `InstallationPlan` as a small state machine:
//!
//! ```text
//! Init -> InstallingTrusted -> InstallingUntrusted(0..n) -> Done
//!              |                        |
//!              +-------> Failed <-------+
//! ```
//!
//! Trusted packages go to the installer as one batch. Untrusted packages
//! are audited and built one at a time in plan order. The first failure
//! halts the run; everything after it is reported as skipped, so the
//! result always shows how far the run got.

use crate::audit::{AuditDecision, AuditGate};
use crate::error::{Error, Result};
use crate::host::{PackageBuilder, ScratchArea, ScratchProvider, TrustedInstaller};
use crate::package::PackageRecord;
use crate::progress::{InstallPhase, ProgressTracker, SilentProgress};
use crate::resolver::PlannedInstall;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What to do with a package whose dependency was skipped at audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Fail the dependent without building it, halting the run
    #[default]
    FailDependents,
    /// Build the dependent anyway and let the build decide
    BestEffort,
}

/// Position of the executor in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutorState {
    Init,
    InstallingTrusted,
    /// Working on the untrusted entry at this index
    InstallingUntrusted(usize),
    Done,
    Failed,
}

/// Why a package was not installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The audit gate declined it
    Audit,
    /// An earlier step failed
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPackage {
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of executing a plan
#[derive(Debug)]
pub struct ExecutionResult {
    /// `Done` or `Failed`
    pub state: ExecutorState,
    /// Installed names: the trusted batch first, then untrusted in order
    pub succeeded: Vec<String>,
    /// The failure that halted the run
    pub failed: Option<Error>,
    /// Names not installed, in plan order
    pub skipped: Vec<SkippedPackage>,
    /// Nothing was executed
    pub preview: bool,
}

impl ExecutionResult {
    fn new() -> Self {
        Self {
            state: ExecutorState::Init,
            succeeded: Vec::new(),
            failed: None,
            skipped: Vec::new(),
            preview: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ExecutorState::Done && self.failed.is_none()
    }

    /// Name of the single package that failed, if any
    pub fn failed_package(&self) -> Option<&str> {
        match &self.failed {
            Some(Error::SinglePackageInstallFailed { package, .. }) => Some(package),
            _ => None,
        }
    }

    /// Names skipped for the given reason, in plan order
    pub fn skipped_for(&self, reason: SkipReason) -> Vec<&str> {
        self.skipped
            .iter()
            .filter(|s| s.reason == reason)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn skipped_names(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.name.as_str()).collect()
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        self.skipped.push(SkippedPackage {
            name: name.to_string(),
            reason,
        });
    }
}

/// Keep a builder's own failure, wrap anything else
fn single_failure(package: &str, error: Error) -> Error {
    match error {
        Error::SinglePackageInstallFailed { .. } => error,
        other => Error::SinglePackageInstallFailed {
            package: package.to_string(),
            detail: other.to_string(),
        },
    }
}

fn batch_failure(packages: &[String], error: Error) -> Error {
    match error {
        Error::BatchInstallFailed { .. } => error,
        other => Error::BatchInstallFailed {
            packages: packages.to_vec(),
            detail: other.to_string(),
        },
    }
}

/// Executes installation plans against host collaborators
pub struct Executor<'a> {
    installer: &'a dyn TrustedInstaller,
    builder: &'a dyn PackageBuilder,
    scratch: &'a dyn ScratchProvider,
    policy: SkipPolicy,
    progress: Box<dyn ProgressTracker + 'a>,
    state: ExecutorState,
}

impl<'a> Executor<'a> {
    pub fn new(
        installer: &'a dyn TrustedInstaller,
        builder: &'a dyn PackageBuilder,
        scratch: &'a dyn ScratchProvider,
    ) -> Self {
        Self {
            installer,
            builder,
            scratch,
            policy: SkipPolicy::default(),
            progress: Box::new(SilentProgress::new()),
            state: ExecutorState::Init,
        }
    }

    pub fn with_policy(mut self, policy: SkipPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressTracker + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Current state (the final state once `execute` returns)
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Execute a planned installation
    ///
    /// A preview returns immediately without touching any collaborator.
    pub fn execute(&mut self, planned: PlannedInstall, gate: &mut dyn AuditGate) -> ExecutionResult {
        let mut result = ExecutionResult::new();
        self.state = ExecutorState::Init;

        if planned.is_preview() {
            info!(
                "Preview: would install {} package(s), nothing executed",
                planned.plan.install_count()
            );
            result.preview = true;
            return self.finish(result, ExecutorState::Done);
        }

        let plan = planned.plan;
        self.progress.set_length(plan.install_count() as u64);

        if !plan.trusted.is_empty() {
            self.state = ExecutorState::InstallingTrusted;
            let batch: Vec<String> = plan.trusted.iter().cloned().collect();
            self.progress.set_phase(&InstallPhase::Repository(batch.len()));

            if let Err(e) = self.installer.install_batch(&batch) {
                warn!("Repository batch failed: {}", e);
                result.failed = Some(batch_failure(&batch, e));
                for name in &plan.untrusted {
                    result.skip(name, SkipReason::Halted);
                }
                return self.finish(result, ExecutorState::Failed);
            }

            info!("Installed {} repository package(s)", batch.len());
            self.progress.increment(batch.len() as u64);
            result.succeeded.extend(batch);
        }

        let mut scratch: Option<Box<dyn ScratchArea>> = None;
        let mut audit_skipped: HashSet<&str> = HashSet::new();

        for (i, name) in plan.untrusted.iter().enumerate() {
            self.state = ExecutorState::InstallingUntrusted(i);

            let outcome = match plan.records.get(name) {
                Some(record) => self.install_one(record, gate, &audit_skipped, &mut scratch),
                None => Err(Error::SinglePackageInstallFailed {
                    package: name.clone(),
                    detail: "no package record in plan".to_string(),
                }),
            };

            match outcome {
                Ok(AuditDecision::Proceed) => {
                    result.succeeded.push(name.clone());
                    self.progress.set_phase(&InstallPhase::Installed(name.clone()));
                }
                Ok(AuditDecision::Skip) => {
                    info!("Skipping {} at audit", name);
                    audit_skipped.insert(name.as_str());
                    result.skip(name, SkipReason::Audit);
                    self.progress.set_phase(&InstallPhase::Skipped(name.clone()));
                }
                Err(e) => {
                    warn!("Halting after failure of {}: {}", name, e);
                    self.progress.set_phase(&InstallPhase::Failed(name.clone()));
                    result.failed = Some(single_failure(name, e));
                    for rest in &plan.untrusted[i + 1..] {
                        result.skip(rest, SkipReason::Halted);
                    }
                    return self.finish(result, ExecutorState::Failed);
                }
            }
            self.progress.increment(1);
        }

        // reclaim the build area before reporting
        drop(scratch);
        self.finish(result, ExecutorState::Done)
    }

    /// Audit and, if approved, build one untrusted package
    fn install_one(
        &self,
        record: &PackageRecord,
        gate: &mut dyn AuditGate,
        audit_skipped: &HashSet<&str>,
        scratch: &mut Option<Box<dyn ScratchArea>>,
    ) -> Result<AuditDecision> {
        if self.policy == SkipPolicy::FailDependents {
            if let Some(dep) = record
                .dependency_names()
                .into_iter()
                .find(|dep| audit_skipped.contains(dep))
            {
                return Err(Error::SinglePackageInstallFailed {
                    package: record.name.clone(),
                    detail: format!("dependency '{}' was skipped at audit", dep),
                });
            }
        }

        self.progress.set_phase(&InstallPhase::Auditing(record.name.clone()));
        if gate.decide(record) == AuditDecision::Skip {
            return Ok(AuditDecision::Skip);
        }

        let area = match scratch {
            Some(area) => area,
            None => scratch.insert(self.scratch.acquire()?),
        };
        debug!("Building {} in {}", record.name, area.path().display());

        self.progress.set_phase(&InstallPhase::Building(record.name.clone()));
        self.builder.build_and_install(record, area.path())?;
        Ok(AuditDecision::Proceed)
    }

    fn finish(&mut self, mut result: ExecutionResult, state: ExecutorState) -> ExecutionResult {
        self.state = state;
        result.state = state;

        let summary = format!(
            "{} installed, {} skipped",
            result.succeeded.len(),
            result.skipped.len()
        );
        match &result.failed {
            Some(e) => self.progress.finish_with_error(&format!("{} ({})", e, summary)),
            None => self.progress.finish_with_message(&summary),
        }
        result
    }
}
