// src/progress.rs

//! Progress tracking for installation runs
//!
//! The executor reports through the `ProgressTracker` trait so the same run
//! can drive a terminal progress bar, log lines, or nothing at all.
//!
//! Implementations:
//! - `LogProgress`: Logs progress to tracing
//! - `SilentProgress`: No-op for scripted/quiet modes
//! - `CallbackProgress`: Forwards events to a closure
//!
//! The indicatif-based tracker lives in the binary.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, warn};

/// Step of an installation run, rendered as the progress message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPhase {
    /// Installing the trusted batch
    Repository(usize),
    /// Waiting for the audit decision
    Auditing(String),
    /// Cloning, building and installing
    Building(String),
    /// Skipped by the audit gate or a halted run
    Skipped(String),
    /// Installed
    Installed(String),
    Failed(String),
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository(n) => write!(f, "Installing {} repository package(s)...", n),
            Self::Auditing(name) => write!(f, "Auditing {}...", name),
            Self::Building(name) => write!(f, "Building {}...", name),
            Self::Skipped(name) => write!(f, "{} [skipped]", name),
            Self::Installed(name) => write!(f, "{} [done]", name),
            Self::Failed(name) => write!(f, "{} [FAILED]", name),
        }
    }
}

/// Core trait for progress tracking
///
/// Implementations should be thread-safe (Send + Sync).
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Set the total (length) of the progress
    fn set_length(&self, length: u64);

    /// Get current position
    fn position(&self) -> u64;

    /// Get total length
    fn length(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error/abandonment message
    fn finish_with_error(&self, message: &str);

    /// Check if progress is finished
    fn is_finished(&self) -> bool;

    /// Report the current phase
    fn set_phase(&self, phase: &InstallPhase) {
        self.set_message(&phase.to_string());
    }
}

impl<T: ProgressTracker + ?Sized> ProgressTracker for Box<T> {
    fn set_message(&self, message: &str) {
        (**self).set_message(message)
    }

    fn increment(&self, amount: u64) {
        (**self).increment(amount)
    }

    fn set_length(&self, length: u64) {
        (**self).set_length(length)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn length(&self) -> u64 {
        (**self).length()
    }

    fn finish_with_message(&self, message: &str) {
        (**self).finish_with_message(message)
    }

    fn finish_with_error(&self, message: &str) {
        (**self).finish_with_error(message)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// Silent progress tracker (no-op)
///
/// Use this for quiet mode, scripted usage, or when progress output
/// is not desired.
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    /// Create a new silent progress tracker
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Logs every message and step to tracing at info level. Useful for
/// non-interactive environments.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl LogProgress {
    /// Create a new logging progress tracker
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn increment(&self, amount: u64) {
        let position = self.position.fetch_add(amount, Ordering::Relaxed) + amount;
        let length = self.length.load(Ordering::Relaxed);
        if length > 0 {
            info!("{}: {}/{}", self.name, position, length);
        }
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        warn!("{}: ERROR - {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Events emitted by callback progress tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Message updated
    Message(String),
    /// Position changed
    Position { current: u64, total: u64 },
    /// Progress finished successfully
    Finished(String),
    /// Progress finished with error
    Error(String),
}

/// Callback-based progress tracker
///
/// Calls a user-provided function on progress updates.
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    /// Create a new callback progress tracker
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn set_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Message(message.to_string()));
    }

    fn increment(&self, amount: u64) {
        let current = self.position.fetch_add(amount, Ordering::Relaxed) + amount;
        let total = self.length.load(Ordering::Relaxed);
        (self.callback)(ProgressEvent::Position { current, total });
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Finished(message.to_string()));
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Error(message.to_string()));
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_silent_progress() {
        let progress = SilentProgress::new();
        progress.set_length(3);

        progress.set_phase(&InstallPhase::Building("foo".to_string()));
        progress.increment(2);
        assert_eq!(progress.position(), 2);
        assert_eq!(progress.length(), 3);

        assert!(!progress.is_finished());
        progress.finish_with_message("done");
        assert!(progress.is_finished());
    }

    #[test]
    fn test_log_progress() {
        let progress = LogProgress::new("install");
        progress.set_length(4);

        progress.increment(1);
        progress.increment(1);
        assert_eq!(progress.position(), 2);

        progress.finish_with_error("boom");
        assert!(progress.is_finished());
    }

    #[test]
    fn test_callback_progress() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let progress = CallbackProgress::new(move |event| {
            events_clone.lock().unwrap().push(event);
        });
        progress.set_length(2);

        progress.set_phase(&InstallPhase::Auditing("foo".to_string()));
        progress.increment(1);
        progress.finish_with_message("done");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 3);

        assert!(matches!(&captured[0], ProgressEvent::Message(m) if m == "Auditing foo..."));
        assert!(matches!(&captured[1], ProgressEvent::Position { current: 1, total: 2 }));
        assert!(matches!(&captured[2], ProgressEvent::Finished(m) if m == "done"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(InstallPhase::Repository(2).to_string(), "Installing 2 repository package(s)...");
        assert_eq!(InstallPhase::Failed("foo".to_string()).to_string(), "foo [FAILED]");
    }
}
