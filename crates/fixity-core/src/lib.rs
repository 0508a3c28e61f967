//! Core types for fixity.
//!
//! This crate provides the data model shared by the fixity crates:
//! normalized path keys, digests and hash algorithms, baseline snapshots,
//! walked file sets, reconciliation reports, configuration and errors.

mod config;
mod digest;
mod error;
mod path;
mod report;
mod snapshot;

pub use config::{AuditConfig, AuditConfigBuilder, DEFAULT_SNAPSHOT_FILE};
pub use digest::{Digest, HashAlgorithm};
pub use error::{
    AuditError, FailureKind, HashError, HashFailure, SnapshotLoadError, SnapshotWriteError,
    WalkWarning, WarningKind,
};
pub use path::{FilePath, FolderPath, encode_component};
pub use report::ReconciliationReport;
pub use snapshot::{FileSet, FolderSet, Snapshot};
