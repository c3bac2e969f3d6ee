// src/error.rs

//! Error types for aurweave
//!
//! Resolution errors (`NotFound`, `Unavailable`, `CircularDependency`,
//! `UnresolvedDependency`) abort planning. Execution errors
//! (`BatchInstallFailed`, `SinglePackageInstallFailed`) are carried inside
//! an `ExecutionResult` so the caller can see how far a run got.

use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while planning or executing an installation
#[derive(Error, Debug)]
pub enum Error {
    /// Requested package is unknown to both the trusted and untrusted source
    #[error("Package(s) not found in any source: {}", .packages.join(", "))]
    NotFound { packages: Vec<String> },

    /// The untrusted registry could not be reached (retryable by the caller)
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    /// Package participates in a dependency cycle
    #[error("Circular dependency detected: {package}")]
    CircularDependency { package: String },

    /// A dependency of a requested package could not be fetched
    #[error("Could not resolve dependency '{dependency}' (required by {required_by})")]
    UnresolvedDependency {
        dependency: String,
        required_by: String,
    },

    /// The trusted batch installer reported failure
    #[error("Trusted batch install failed for {}: {detail}", .packages.join(", "))]
    BatchInstallFailed {
        packages: Vec<String>,
        detail: String,
    },

    /// Building or installing a single untrusted package failed
    #[error("Failed to build and install '{package}': {detail}")]
    SinglePackageInstallFailed { package: String, detail: String },

    /// Removing installed packages failed
    #[error("Failed to remove {}: {detail}", .packages.join(", "))]
    RemovalFailed {
        packages: Vec<String>,
        detail: String,
    },

    /// Environment or collaborator could not be initialized
    #[error("Initialization error: {0}")]
    InitError(String),

    /// Malformed response or input
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Discriminant of [`Error`], convenient for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unavailable,
    CircularDependency,
    UnresolvedDependency,
    BatchInstallFailed,
    SinglePackageInstallFailed,
    RemovalFailed,
    Init,
    Parse,
    Config,
    Io,
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::CircularDependency { .. } => ErrorKind::CircularDependency,
            Self::UnresolvedDependency { .. } => ErrorKind::UnresolvedDependency,
            Self::BatchInstallFailed { .. } => ErrorKind::BatchInstallFailed,
            Self::SinglePackageInstallFailed { .. } => ErrorKind::SinglePackageInstallFailed,
            Self::RemovalFailed { .. } => ErrorKind::RemovalFailed,
            Self::InitError(_) => ErrorKind::Init,
            Self::ParseError(_) => ErrorKind::Parse,
            Self::ConfigError(_) => ErrorKind::Config,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Whether a caller may reasonably retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
