// src/commands/progress.rs
//! Terminal progress for installation runs
//!
//! An overall bar counts installed packages; a spinner line below shows the
//! current phase. Build output from makepkg is printed above the bars.

use aurweave::ProgressTracker;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Installation progress tracker for multi-package operations
pub struct InstallProgress {
    _multi: MultiProgress,
    overall: ProgressBar,
    status: ProgressBar,
}

impl InstallProgress {
    /// Create a new installation progress tracker
    pub fn new(total_packages: u64) -> Self {
        let multi = MultiProgress::new();

        let overall = ProgressBar::new(total_packages);
        overall.set_style(
            ProgressStyle::default_bar()
                .template("Installing ({pos}/{len}) [{bar:40.green/dim}] {percent}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        let status = ProgressBar::new_spinner();
        status.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status.enable_steady_tick(Duration::from_millis(100));

        let overall = multi.add(overall);
        let status = multi.add(status);

        Self {
            _multi: multi,
            overall,
            status,
        }
    }
}

impl ProgressTracker for InstallProgress {
    fn set_message(&self, message: &str) {
        self.status.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.overall.inc(amount);
    }

    fn set_length(&self, length: u64) {
        self.overall.set_length(length);
    }

    fn position(&self) -> u64 {
        self.overall.position()
    }

    fn length(&self) -> u64 {
        self.overall.length().unwrap_or(0)
    }

    // the command prints its own summary after the run
    fn finish_with_message(&self, _message: &str) {
        self.status.finish_and_clear();
        self.overall.finish_and_clear();
    }

    fn finish_with_error(&self, _message: &str) {
        self.status.finish_and_clear();
        self.overall.abandon();
    }

    fn is_finished(&self) -> bool {
        self.overall.is_finished()
    }
}

/// Spinner for network lookups (resolution, search)
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
