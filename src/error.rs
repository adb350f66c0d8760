//! Error types for srex.
//!
//! Two levels of error exist:
//! - [`OrganizeError`] ends a run. Only root validation, provisioning,
//!   configuration and worker pool setup produce one (plus the non-fatal
//!   [`OrganizeError::EmptyDirectory`] signal).
//! - [`ClassifyError`] belongs to a single file. It is turned into a
//!   `Failed` outcome at the walker boundary and never aborts a run.

use crate::config::ConfigError;
use crate::outcome::FailureKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop (or short-circuit) an organization run.
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// The root path does not exist or is not a directory.
    #[error("The directory '{}' does not exist or is not a directory", .path.display())]
    InvalidRoot { path: PathBuf },

    /// A category directory could not be created for a non-permission reason.
    #[error("Failed to create directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating a category directory was refused by the filesystem.
    #[error("Permission denied to create directory '{}'", .path.display())]
    PermissionDenied { path: PathBuf },

    /// Nothing to classify. Not a failure.
    #[error("The directory '{}' is empty. No files to classify", .path.display())]
    EmptyDirectory { path: PathBuf },

    /// The configuration could not be loaded or compiled.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker pool could not be built.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    /// Any other I/O failure tied to a path (e.g. opening the outcome log).
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrganizeError {
    /// Returns false only for the "nothing to do" signal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::EmptyDirectory { .. })
    }

    /// Process exit code for this error: 0 for nothing-to-do, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() { 1 } else { 0 }
    }

    /// Maps a failed directory creation to the permission or generic variant.
    pub(crate) fn from_create_dir(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path }
        } else {
            Self::Directory { path, source }
        }
    }
}

/// Errors raised while classifying and moving a single file.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error(
        "Permission denied to move file '{}' to '{}'",
        .source_path.display(),
        .destination.display()
    )]
    PermissionDenied {
        source_path: PathBuf,
        destination: PathBuf,
    },

    #[error(
        "Error moving file '{}' to '{}': {cause}",
        .source_path.display(),
        .destination.display()
    )]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        cause: std::io::Error,
    },
}

impl ClassifyError {
    /// The outcome-level kind of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::PermissionDenied { .. } => FailureKind::PermissionDenied,
            Self::MoveFailed { .. } => FailureKind::MoveFailed,
        }
    }
}

/// Result type for run-level operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
