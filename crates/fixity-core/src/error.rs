//! Error types for auditing operations.
//!
//! Errors split into two groups. Per-file and per-directory problems
//! ([`HashError`], [`WalkWarning`]) are collected and reported alongside the
//! results. Setup and sink problems ([`AuditError`] and the snapshot errors it
//! wraps) abort the run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::FilePath;

/// Fatal errors that abort a save or check run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Root path does not exist.
    #[error("Root path not found: {path}")]
    RootNotFound { path: PathBuf },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Root path could not be inspected.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The baseline could not be loaded.
    #[error(transparent)]
    SnapshotLoad(#[from] SnapshotLoadError),

    /// The snapshot could not be written.
    #[error(transparent)]
    SnapshotWrite(#[from] SnapshotWriteError),

    /// The run was cancelled before completion.
    #[error("Operation interrupted")]
    Interrupted,
}

impl AuditError {
    /// Create an error for an unusable root path.
    pub fn root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::RootNotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Failure to hash a single file.
#[derive(Debug, Error)]
pub enum HashError {
    /// Permission denied opening or reading the file.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// The file disappeared before it could be read.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Hashing took longer than the configured per-file limit.
    #[error("Timed out after {elapsed:?} hashing {path}")]
    Timeout { path: PathBuf, elapsed: Duration },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Create a hash error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Coarse classification used in reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PermissionDenied { .. } => FailureKind::PermissionDenied,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Io { .. } => FailureKind::ReadError,
        }
    }
}

/// Kind of per-file hashing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PermissionDenied,
    NotFound,
    Timeout,
    ReadError,
}

/// A file that could not be hashed, recorded instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFailure {
    /// Root-relative path of the file.
    pub path: FilePath,
    /// Kind of failure.
    pub kind: FailureKind,
    /// Human-readable message.
    pub message: String,
}

impl HashFailure {
    /// Record a failure for `path`.
    pub fn new(path: FilePath, error: &HashError) -> Self {
        Self {
            path,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// The baseline snapshot could not be loaded.
#[derive(Debug, Error)]
pub enum SnapshotLoadError {
    /// No snapshot exists at the configured location.
    #[error("Snapshot not found: {path}")]
    NotFound { path: PathBuf },

    /// The snapshot file could not be read.
    #[error("Cannot read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A record did not have exactly a path and a digest.
    #[error("Malformed record at line {line} of {path}: expected 2 fields, found {fields}")]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        fields: usize,
    },

    /// A stored path is absolute or climbs out of the audit root.
    #[error("Path at line {line} of {path} is outside the audit root: {value:?}")]
    OutsideRoot {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// A digest column was not valid hex.
    #[error("Invalid digest at line {line} of {path}: {value:?}")]
    InvalidDigest {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// A digest length does not fit the configured algorithm.
    #[error(
        "Digest at line {line} of {path} is {actual} bytes, but {algorithm} produces {expected}"
    )]
    AlgorithmMismatch {
        path: PathBuf,
        line: u64,
        algorithm: String,
        expected: usize,
        actual: usize,
    },
}

/// The snapshot sink could not be written.
#[derive(Debug, Error)]
pub enum SnapshotWriteError {
    /// The snapshot file could not be created or truncated.
    #[error("Cannot create snapshot {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing a batch failed.
    #[error("Cannot write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Kind of walk warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory or entry.
    ReadError,
    /// Two entries normalized to the same path.
    DuplicatePath,
}

/// Non-fatal problem encountered while walking the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl WalkWarning {
    /// Create a new walk warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from an I/O error, classifying permission problems.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        Self {
            message: format!("Skipped {}: {error}", path.display()),
            path,
            kind,
        }
    }

    /// Create a warning for a path that collides with an earlier entry.
    pub fn duplicate(path: impl Into<PathBuf>, key: &FilePath) -> Self {
        let path = path.into();
        Self {
            message: format!("{} normalizes to already seen path {key}", path.display()),
            path,
            kind: WarningKind::DuplicatePath,
        }
    }
}
