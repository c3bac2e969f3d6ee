// src/commands/install.rs
//! Install and plan commands

use super::preflight;
use super::progress::{spinner, InstallProgress};
use anyhow::{Context, Result};
use aurweave::{
    AuditGate, AurRpc, AutoApprove, Config, ExecutionResult, Executor, InstallationPlanner,
    InteractiveAudit, LogProgress, MakepkgBuilder, Pacman, PlannedInstall, ProgressTracker,
    RegistryClient, RunMode, SkipPolicy, SkipReason, SyncIndex, TempScratch,
};
use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use tracing::info;

/// Flags of the install command
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub noconfirm: bool,
    pub dry_run: bool,
    pub best_effort: bool,
    pub json: bool,
}

/// Collaborators shared by planning and execution
struct Session {
    index: SyncIndex,
    pacman: Pacman,
    registry: RegistryClient<AurRpc>,
}

impl Session {
    fn open(config: &Config, noconfirm: bool) -> Result<Self> {
        let index = SyncIndex::load(config.index.provides).context("Failed to read sync databases")?;
        let pacman = Pacman::new(config.install.sudo.clone(), noconfirm);
        let backend = AurRpc::with_endpoints(
            config.registry.rpc_url.clone(),
            config.registry.pkgbuild_url.clone(),
            config.registry_timeout()?,
        )?;
        let registry = RegistryClient::new(backend).with_batch_size(config.registry.batch_size);

        Ok(Self {
            index,
            pacman,
            registry,
        })
    }

    fn plan(&mut self, packages: &[String], mode: RunMode) -> Result<PlannedInstall> {
        let pb = spinner("Resolving dependencies...");
        let planned = InstallationPlanner::new(&self.index, &self.pacman, &mut self.registry)
            .plan(packages, mode);
        pb.finish_and_clear();
        planned.context("Failed to plan installation")
    }
}

fn print_plan(planned: &PlannedInstall, json: bool) -> Result<()> {
    if json {
        println!("{}", planned.plan.to_json()?);
    } else {
        print!("{}", planned.plan);
    }
    Ok(())
}

/// Show the plan for `packages` without installing anything
pub fn cmd_plan(config: &Config, packages: &[String], json: bool) -> Result<()> {
    let mut session = Session::open(config, false)?;
    let planned = session.plan(packages, RunMode::Preview)?;
    print_plan(&planned, json)
}

/// Resolve, audit and install `packages`
pub fn cmd_install(config: &Config, packages: &[String], opts: InstallOptions) -> Result<()> {
    let noconfirm = opts.noconfirm || config.install.noconfirm;
    let policy = if opts.best_effort {
        SkipPolicy::BestEffort
    } else {
        config.skip_policy()
    };
    let mode = if opts.dry_run {
        RunMode::Preview
    } else {
        RunMode::Execute
    };

    if !opts.dry_run {
        preflight::ensure_not_root()?;
    }

    let mut session = Session::open(config, noconfirm)?;
    let planned = session.plan(packages, mode)?;
    print_plan(&planned, opts.json)?;

    if planned.plan.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }
    if !planned.is_preview() {
        preflight::ensure_tools(&config.install.sudo, !planned.plan.untrusted.is_empty())?;
    }

    let builder = MakepkgBuilder::new(config.build.clone_url.clone())
        .with_clone_timeout(config.clone_timeout()?)
        .with_makeflags(config.makeflags())
        .with_noconfirm(noconfirm);
    let scratch = match &config.build.scratch_dir {
        Some(dir) => TempScratch::in_dir(dir),
        None => TempScratch::new(),
    };

    let total = planned.plan.install_count() as u64;
    let progress: Box<dyn ProgressTracker> = if noconfirm && io::stderr().is_terminal() {
        Box::new(InstallProgress::new(total))
    } else {
        Box::new(LogProgress::new("install"))
    };

    let registry = &session.registry;
    let mut gate: Box<dyn AuditGate + '_> = if noconfirm {
        Box::new(AutoApprove)
    } else {
        Box::new(
            InteractiveAudit::new(io::stdin().lock(), io::stderr())
                .with_pkgbuild_source(move |base: &str| registry.fetch_pkgbuild(base)),
        )
    };

    let mut executor = Executor::new(&session.pacman, &builder, &scratch)
        .with_policy(policy)
        .with_progress(progress);
    let mut result = executor.execute(planned, gate.as_mut());

    print!("{}", render_result(&result));

    match result.failed.take() {
        Some(e) => Err(anyhow::Error::new(e).context("Installation halted")),
        None => {
            info!("Installation finished");
            Ok(())
        }
    }
}

/// Summary of an execution result for the terminal
fn render_result(result: &ExecutionResult) -> String {
    let mut out = String::new();

    if result.preview {
        let _ = writeln!(out, "Dry run: nothing was installed.");
        return out;
    }

    if !result.succeeded.is_empty() {
        let _ = writeln!(out, "Installed: {}", result.succeeded.join(", "));
    }
    let audited = result.skipped_for(SkipReason::Audit);
    if !audited.is_empty() {
        let _ = writeln!(out, "Skipped at audit: {}", audited.join(", "));
    }
    let halted = result.skipped_for(SkipReason::Halted);
    if !halted.is_empty() {
        let _ = writeln!(out, "Not attempted: {}", halted.join(", "));
    }
    if let Some(e) = &result.failed {
        let _ = writeln!(out, "Failed: {}", e);
    }
    out
}
