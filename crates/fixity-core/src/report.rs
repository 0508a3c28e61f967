//! Reconciliation results.

use serde::{Deserialize, Serialize};

use crate::path::{FilePath, FolderPath};

/// Outcome of comparing a fresh walk against a baseline.
///
/// Every list is sorted. Files whose digest matches the baseline appear in
/// none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// In both sets, digest differs.
    #[serde(rename = "corrupt_files")]
    pub corrupt: Vec<FilePath>,

    /// Present now, absent from the baseline.
    #[serde(rename = "new_files")]
    pub new: Vec<FilePath>,

    /// In the baseline, absent now.
    #[serde(rename = "missing_files")]
    pub missing: Vec<FilePath>,

    /// Folders that contain files now but held none in the baseline.
    pub new_folders: Vec<FolderPath>,

    /// Folders that held files in the baseline but contain none now.
    pub missing_folders: Vec<FolderPath>,

    /// In both sets, but the current content could not be hashed.
    #[serde(rename = "unverified_files", default)]
    pub unverified: Vec<FilePath>,
}

impl ReconciliationReport {
    /// Check if the tree matches the baseline exactly.
    pub fn is_clean(&self) -> bool {
        self.corrupt.is_empty()
            && self.new.is_empty()
            && self.missing.is_empty()
            && self.new_folders.is_empty()
            && self.missing_folders.is_empty()
            && self.unverified.is_empty()
    }

    /// Number of file-level findings.
    pub fn file_findings(&self) -> usize {
        self.corrupt.len() + self.new.len() + self.missing.len() + self.unverified.len()
    }
}
