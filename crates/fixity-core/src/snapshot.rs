//! Baseline snapshots and freshly walked file sets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::path::{FilePath, FolderPath};

/// Trusted mapping of file path to content digest, taken at save time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: BTreeMap<FilePath, Digest>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a digest, returning the one it replaced.
    pub fn insert(&mut self, path: FilePath, digest: Digest) -> Option<Digest> {
        self.entries.insert(path, digest)
    }

    /// Stored digest for a path.
    pub fn get(&self, path: &FilePath) -> Option<&Digest> {
        self.entries.get(path)
    }

    /// Check if the snapshot has an entry for a path.
    pub fn contains(&self, path: &FilePath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&FilePath, &Digest)> {
        self.entries.iter()
    }

    /// Distinct parent folders of all entries.
    pub fn folders(&self) -> FolderSet {
        self.entries.keys().map(FilePath::parent).collect()
    }
}

impl FromIterator<(FilePath, Digest)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (FilePath, Digest)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Files discovered by a fresh walk, keyed by normalized path.
///
/// Each key keeps the on-disk location it was found at, so case-folded keys
/// can still be opened.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    root: PathBuf,
    files: BTreeMap<FilePath, PathBuf>,
}

impl FileSet {
    /// Create an empty set rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    /// Root directory the set was walked from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add a file. Returns `false` if the key was already present, in which
    /// case the first location is kept.
    pub fn insert(&mut self, key: FilePath, location: PathBuf) -> bool {
        if self.files.contains_key(&key) {
            return false;
        }
        self.files.insert(key, location);
        true
    }

    /// Check if a path was discovered.
    pub fn contains(&self, key: &FilePath) -> bool {
        self.files.contains_key(key)
    }

    /// On-disk location of a discovered path.
    pub fn location(&self, key: &FilePath) -> Option<&Path> {
        self.files.get(key).map(PathBuf::as_path)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no files were discovered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate `(key, location)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&FilePath, &Path)> {
        self.files.iter().map(|(k, v)| (k, v.as_path()))
    }

    /// Iterate keys in path order.
    pub fn paths(&self) -> impl Iterator<Item = &FilePath> {
        self.files.keys()
    }

    /// Distinct parent folders of all files.
    pub fn folders(&self) -> FolderSet {
        self.files.keys().map(FilePath::parent).collect()
    }
}

/// Distinct folders of a file set or snapshot, used for change reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSet(BTreeSet<FolderPath>);

impl FolderSet {
    /// Folders in `self` that are absent from `other`, in order.
    pub fn difference(&self, other: &FolderSet) -> Vec<FolderPath> {
        self.0.difference(&other.0).cloned().collect()
    }

    /// Check if a folder is present.
    pub fn contains(&self, folder: &FolderPath) -> bool {
        self.0.contains(folder)
    }

    /// Number of folders.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate folders in order.
    pub fn iter(&self) -> impl Iterator<Item = &FolderPath> {
        self.0.iter()
    }
}

impl FromIterator<FolderPath> for FolderSet {
    fn from_iter<I: IntoIterator<Item = FolderPath>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
