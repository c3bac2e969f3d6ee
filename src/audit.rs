// src/audit.rs

//! Per-package audit of untrusted packages
//!
//! Before an untrusted package is built the executor asks an `AuditGate`
//! whether to proceed. The gate sees the full record so it can surface
//! provenance: maintainer, votes, out-of-date flag and, interactively, the
//! PKGBUILD itself. Risk flags are informational; no gate rejects a package
//! on its own.

use crate::error::Result;
use crate::package::PackageRecord;
use std::fmt;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Outcome of auditing one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditDecision {
    Proceed,
    Skip,
}

/// Properties of a record that warrant extra care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFlag {
    /// No maintainer; anyone can adopt the package and push changes
    Orphaned,
    /// Flagged out of date upstream
    OutOfDate,
    /// Nobody has vouched for the package
    NoVotes,
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orphaned => write!(f, "package is orphaned (no maintainer)"),
            Self::OutOfDate => write!(f, "package is flagged out of date"),
            Self::NoVotes => write!(f, "package has no votes"),
        }
    }
}

/// Risk flags raised by a record
pub fn risk_flags(record: &PackageRecord) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    if record.is_orphaned() {
        flags.push(RiskFlag::Orphaned);
    }
    if record.is_out_of_date() {
        flags.push(RiskFlag::OutOfDate);
    }
    if record.votes == 0 {
        flags.push(RiskFlag::NoVotes);
    }
    flags
}

/// Human-readable summary of a record shown before the decision
pub struct AuditNotice<'a>(pub &'a PackageRecord);

impl fmt::Display for AuditNotice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        writeln!(f, "==> Audit: {} {} (source: {})", record.name, record.version, record.source)?;
        if record.package_base != record.name {
            writeln!(f, "    Package base: {}", record.package_base)?;
        }
        if let Some(description) = &record.description {
            writeln!(f, "    Description:  {}", description)?;
        }
        writeln!(
            f,
            "    Maintainer:   {}",
            record.maintainer.as_deref().unwrap_or("NONE")
        )?;
        writeln!(f, "    Votes:        {} (popularity {:.2})", record.votes, record.popularity)?;
        if let Some(modified) = record.last_modified {
            writeln!(f, "    Modified:     {}", modified.format("%Y-%m-%d"))?;
        }
        if let Some(url) = &record.url {
            writeln!(f, "    Upstream:     {}", url)?;
        }
        for flag in risk_flags(record) {
            writeln!(f, "    WARNING: {}", flag)?;
        }
        Ok(())
    }
}

/// Decides whether an untrusted package may be built
pub trait AuditGate {
    fn decide(&mut self, record: &PackageRecord) -> AuditDecision;
}

impl<F> AuditGate for F
where
    F: FnMut(&PackageRecord) -> AuditDecision,
{
    fn decide(&mut self, record: &PackageRecord) -> AuditDecision {
        self(record)
    }
}

/// Approves everything; used for `--noconfirm`
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl AuditGate for AutoApprove {
    fn decide(&mut self, record: &PackageRecord) -> AuditDecision {
        warn!(
            "Audit bypassed for {} {} (maintainer: {})",
            record.name,
            record.version,
            record.maintainer.as_deref().unwrap_or("none")
        );
        for flag in risk_flags(record) {
            warn!("{}: {}", record.name, flag);
        }
        AuditDecision::Proceed
    }
}

type PkgbuildSource<'a> = Box<dyn Fn(&str) -> Result<String> + 'a>;

/// Prompts on a terminal (or any reader/writer pair)
///
/// Shows the audit notice and, if a source is configured, the PKGBUILD.
/// Anything but an explicit yes skips the package, including end of input
/// and I/O errors.
pub struct InteractiveAudit<'a, R, W> {
    input: R,
    output: W,
    pkgbuild: Option<PkgbuildSource<'a>>,
}

impl<'a, R: BufRead, W: Write> InteractiveAudit<'a, R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            pkgbuild: None,
        }
    }

    /// Fetch PKGBUILDs (by package base) for review before prompting
    pub fn with_pkgbuild_source(mut self, source: impl Fn(&str) -> Result<String> + 'a) -> Self {
        self.pkgbuild = Some(Box::new(source));
        self
    }

    fn prompt(&mut self, record: &PackageRecord) -> std::io::Result<AuditDecision> {
        write!(self.output, "{}", AuditNotice(record))?;

        if let Some(fetch) = &self.pkgbuild {
            match fetch(&record.package_base) {
                Ok(text) => {
                    writeln!(self.output, "---- PKGBUILD ({}) ----", record.package_base)?;
                    writeln!(self.output, "{}", text.trim_end())?;
                    writeln!(self.output, "---- end of PKGBUILD ----")?;
                }
                Err(e) => writeln!(self.output, "    Could not fetch PKGBUILD: {}", e)?,
            }
        }

        write!(self.output, "Proceed with building {}? [y/N] ", record.name)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            debug!("End of input while auditing {}", record.name);
            return Ok(AuditDecision::Skip);
        }

        Ok(match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => AuditDecision::Proceed,
            _ => AuditDecision::Skip,
        })
    }
}

impl<R: BufRead, W: Write> AuditGate for InteractiveAudit<'_, R, W> {
    fn decide(&mut self, record: &PackageRecord) -> AuditDecision {
        match self.prompt(record) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Audit prompt for {} failed, skipping: {}", record.name, e);
                AuditDecision::Skip
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    fn interactive(answer: &str, record: &PackageRecord) -> (AuditDecision, String) {
        let mut output = Vec::new();
        let decision = InteractiveAudit::new(Cursor::new(answer.as_bytes()), &mut output).decide(record);
        (decision, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_risk_flags() {
        let record = PackageRecord::new("foo", "1.0-1");
        assert_eq!(risk_flags(&record), vec![RiskFlag::Orphaned, RiskFlag::NoVotes]);

        let mut record = record.with_maintainer("alice");
        record.votes = 3;
        assert!(risk_flags(&record).is_empty());
    }

    #[test]
    fn test_auto_approve() {
        let record = PackageRecord::new("foo", "1.0-1");
        assert_eq!(AutoApprove.decide(&record), AuditDecision::Proceed);
    }

    #[test]
    fn test_closure_gate() {
        let mut seen = Vec::new();
        let mut gate = |record: &PackageRecord| {
            seen.push(record.name.clone());
            AuditDecision::Skip
        };

        assert_eq!(gate.decide(&PackageRecord::new("foo", "1")), AuditDecision::Skip);
        assert_eq!(seen, vec!["foo"]);
    }

    #[test]
    fn test_interactive_yes() {
        let record = PackageRecord::new("foo", "1.0-1").with_maintainer("alice");
        let (decision, output) = interactive("y\n", &record);

        assert_eq!(decision, AuditDecision::Proceed);
        assert!(output.contains("Maintainer:   alice"));
        assert!(output.contains("[y/N]"));
    }

    #[test]
    fn test_interactive_defaults_to_skip() {
        let record = PackageRecord::new("foo", "1.0-1");

        assert_eq!(interactive("\n", &record).0, AuditDecision::Skip);
        assert_eq!(interactive("maybe\n", &record).0, AuditDecision::Skip);
        assert_eq!(interactive("", &record).0, AuditDecision::Skip);
        assert_eq!(interactive(" YES \n", &record).0, AuditDecision::Proceed);
    }

    #[test]
    fn test_interactive_flags_orphan() {
        let record = PackageRecord::new("foo", "1.0-1");
        let (_, output) = interactive("n\n", &record);
        assert!(output.contains("Maintainer:   NONE"));
        assert!(output.contains("WARNING: package is orphaned"));
    }

    #[test]
    fn test_interactive_shows_pkgbuild() {
        let record = PackageRecord::new("foo", "1.0-1");
        let mut output = Vec::new();

        let decision = InteractiveAudit::new(Cursor::new(b"y\n".as_slice()), &mut output)
            .with_pkgbuild_source(|base: &str| Ok(format!("pkgname={base}\npkgver=1.0\n")))
            .decide(&record);

        let output = String::from_utf8(output).unwrap();
        assert_eq!(decision, AuditDecision::Proceed);
        assert!(output.contains("pkgname=foo"));
    }

    #[test]
    fn test_interactive_pkgbuild_failure_still_prompts() {
        let record = PackageRecord::new("foo", "1.0-1");
        let mut output = Vec::new();

        let decision = InteractiveAudit::new(Cursor::new(b"n\n".as_slice()), &mut output)
            .with_pkgbuild_source(|_: &str| Err(Error::Unavailable("offline".to_string())))
            .decide(&record);

        let output = String::from_utf8(output).unwrap();
        assert_eq!(decision, AuditDecision::Skip);
        assert!(output.contains("Could not fetch PKGBUILD"));
    }
}
