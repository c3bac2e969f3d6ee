// src/host/makepkg.rs

//! Build and install untrusted packages with git + makepkg
//!
//! Each package is cloned from the registry's git endpoint into the scratch
//! area and built with `makepkg -si`. Key behaviour:
//!
//! - `git clone` is bounded by a timeout; `makepkg` is never killed, it
//!   may be inside `pacman -U`
//! - stdout is passed through, stderr is captured and the tail is attached
//!   to the failure detail
//! - Split packages sharing a package base reuse the existing clone
//! - `MAKEFLAGS` is exported so builds use every CPU

use crate::error::{Error, Result};
use crate::host::PackageBuilder;
use crate::package::PackageRecord;
use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Default timeout for `git clone` (10 minutes)
const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(600);

/// Number of stderr lines kept for failure diagnostics
const STDERR_TAIL_LINES: usize = 40;

/// A subprocess run while building one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildStep {
    Clone,
    Makepkg,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => write!(f, "git clone"),
            Self::Makepkg => write!(f, "makepkg"),
        }
    }
}

/// Builds packages from their git sources with makepkg
#[derive(Debug, Clone)]
pub struct MakepkgBuilder {
    clone_url: String,
    clone_timeout: Duration,
    makeflags: Option<String>,
    noconfirm: bool,
}

impl MakepkgBuilder {
    /// Create a builder cloning from `clone_url` (e.g. "https://aur.archlinux.org")
    pub fn new(clone_url: impl Into<String>) -> Self {
        Self {
            clone_url: clone_url.into().trim_end_matches('/').to_string(),
            clone_timeout: DEFAULT_CLONE_TIMEOUT,
            makeflags: None,
            noconfirm: false,
        }
    }

    /// Set the `git clone` timeout
    pub fn with_clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }

    /// Time limit of a step; `None` waits for the step to exit on its own
    fn step_timeout(&self, step: BuildStep) -> Option<Duration> {
        match step {
            BuildStep::Clone => Some(self.clone_timeout),
            BuildStep::Makepkg => None,
        }
    }

    /// Set the MAKEFLAGS exported to makepkg
    pub fn with_makeflags(mut self, makeflags: impl Into<String>) -> Self {
        self.makeflags = Some(makeflags.into());
        self
    }

    /// Pass `--noconfirm` to makepkg
    pub fn with_noconfirm(mut self, noconfirm: bool) -> Self {
        self.noconfirm = noconfirm;
        self
    }

    /// Git URL of a package base
    fn repo_url(&self, package_base: &str) -> String {
        format!("{}/{}.git", self.clone_url, package_base)
    }

    /// Arguments passed to makepkg
    fn makepkg_args(&self) -> Vec<&'static str> {
        let mut args = vec!["-si"];
        if self.noconfirm {
            args.push("--noconfirm");
        }
        args
    }

    /// Run one step of the build, capturing the stderr tail on failure
    fn run_step(&self, mut command: Command, step: BuildStep, package: &str) -> Result<()> {
        debug!("[{}] running {:?}", package, command);

        let mut child = command
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(package, format!("Failed to spawn {}: {}", step, e)))?;

        let collector = child.stderr.take().map(|stderr| {
            let tag = package.to_string();
            thread::spawn(move || collect_tail(stderr, &tag))
        });

        let waited = match self.step_timeout(step) {
            Some(timeout) => child.wait_timeout(timeout).map(|status| status.ok_or(timeout)),
            None => child.wait().map(Ok),
        }
        .map_err(|e| failure(package, format!("Failed to wait for {}: {}", step, e)))?;

        let status = match waited {
            Ok(status) => status,
            Err(timeout) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = collector.map(|handle| handle.join());
                return Err(failure(
                    package,
                    format!("{} timed out after {:?}", step, timeout),
                ));
            }
        };

        let tail = collector
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        let code = status.code().unwrap_or(-1);
        let detail = if tail.is_empty() {
            format!("{} exited with code {}", step, code)
        } else {
            format!("{} exited with code {}\n{}", step, code, tail)
        };
        Err(failure(package, detail))
    }
}

impl PackageBuilder for MakepkgBuilder {
    fn build_and_install(&self, record: &PackageRecord, workdir: &Path) -> Result<()> {
        let base = &record.package_base;
        if !is_safe_package_base(base) {
            return Err(failure(
                &record.name,
                format!("Refusing to build unsafe package base '{}'", base),
            ));
        }

        let pkgdir = workdir.join(base);
        if pkgdir.exists() {
            debug!("Reusing existing clone of {} for {}", base, record.name);
        } else {
            info!("Cloning {}", self.repo_url(base));
            let mut clone = Command::new("git");
            clone
                .args(["clone", "--depth", "1"])
                .arg(self.repo_url(base))
                .arg(&pkgdir)
                .stdin(Stdio::null());
            self.run_step(clone, BuildStep::Clone, &record.name)?;
        }

        info!("Building and installing {} {}", record.name, record.version);
        let mut makepkg = Command::new("makepkg");
        makepkg.args(self.makepkg_args()).current_dir(&pkgdir);
        if let Some(flags) = &self.makeflags {
            makepkg.env("MAKEFLAGS", flags);
        }
        self.run_step(makepkg, BuildStep::Makepkg, &record.name)?;

        info!("Successfully installed {}", record.name);
        Ok(())
    }
}

fn failure(package: &str, detail: String) -> Error {
    Error::SinglePackageInstallFailed {
        package: package.to_string(),
        detail,
    }
}

/// Read a child's stderr to the end, keeping the last lines
fn collect_tail<R: Read>(stderr: R, tag: &str) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    for line in BufReader::new(stderr).lines() {
        let Ok(line) = line else {
            warn!("[{}] stderr is not valid UTF-8, stopping capture", tag);
            break;
        };
        debug!("[{}] {}", tag, line);
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}

/// Package bases become path components and URL segments
fn is_safe_package_base(base: &str) -> bool {
    !base.is_empty()
        && !base.starts_with('.')
        && !base.starts_with('-')
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '+' | '-'))
}

/// Default MAKEFLAGS using every available CPU
pub fn default_makeflags() -> String {
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    format!("-j{}", cpus)
}
