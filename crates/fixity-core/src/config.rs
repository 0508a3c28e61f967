//! Audit configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::digest::HashAlgorithm;
use crate::error::AuditError;

/// Default snapshot file name.
pub const DEFAULT_SNAPSHOT_FILE: &str = "fixity.csv";

/// Configuration for save and check runs.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AuditConfig {
    /// Root directory to audit.
    pub root: PathBuf,

    /// Where the baseline snapshot is written and read.
    #[builder(default = "PathBuf::from(DEFAULT_SNAPSHOT_FILE)")]
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Where a check report is written, if anywhere.
    #[builder(default)]
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Hash algorithm for both saving and checking.
    #[builder(default)]
    #[serde(default)]
    pub algorithm: HashAlgorithm,

    /// Files hashed and written per batch.
    #[builder(default = "500")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of hashing threads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Read size when streaming file content into the hasher.
    #[builder(default = "4096")]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Give up on a single file after this long.
    #[builder(default)]
    #[serde(default)]
    pub file_timeout: Option<Duration>,

    /// Glob patterns excluded from the walk.
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Fold path case when building keys.
    #[builder(default = "false")]
    #[serde(default)]
    pub case_insensitive: bool,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_FILE)
}

fn default_batch_size() -> usize {
    500
}

fn default_chunk_size() -> usize {
    4096
}

impl AuditConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.batch_size == Some(0) {
            return Err("Batch size must be at least 1".to_string());
        }
        if self.chunk_size == Some(0) {
            return Err("Chunk size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl AuditConfig {
    /// Create a new audit config builder.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder::default()
    }

    /// Create a simple config for auditing a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot_path: default_snapshot_path(),
            report_path: None,
            algorithm: HashAlgorithm::default(),
            batch_size: default_batch_size(),
            workers: 0,
            chunk_size: default_chunk_size(),
            file_timeout: None,
            exclude_patterns: Vec::new(),
            case_insensitive: false,
        }
    }

    /// Re-check invariants for configs built without the builder.
    pub fn validate(&self) -> Result<(), AuditError> {
        let invalid = |message: &str| AuditError::InvalidConfig {
            message: message.to_string(),
        };
        if self.root.as_os_str().is_empty() {
            return Err(invalid("Root path cannot be empty"));
        }
        if self.batch_size == 0 {
            return Err(invalid("Batch size must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("Chunk size must be at least 1"));
        }
        Ok(())
    }

    /// Output files the walk must not pick up.
    pub fn output_files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.snapshot_path.as_path()).chain(self.report_path.as_deref())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
