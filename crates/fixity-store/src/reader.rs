//! Streamed snapshot loading.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use fixity_core::{
    Digest, FilePath, HashAlgorithm, Snapshot, SnapshotLoadError, encode_component,
};

use crate::HEADER;

/// Default number of rows handed over per batch while loading.
pub const DEFAULT_LOAD_BATCH: usize = 500;

/// Reads snapshot records written by [`SnapshotWriter`](crate::SnapshotWriter).
///
/// Rows are parsed one at a time into a reused record buffer and handed over
/// in bounded batches. A leading `path,digest` header is optional.
///
/// A file without the header is read as a legacy snapshot, whose rows start
/// with the root directory they were saved from. When a root is set, that
/// prefix is stripped, matching either the root as given or its canonical
/// form. Any row that is still absolute or climbs out through `..` is an
/// error.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    algorithm: HashAlgorithm,
    case_insensitive: bool,
    batch_size: usize,
    root: Option<PathBuf>,
}

impl SnapshotReader {
    /// Create a reader expecting digests produced by `algorithm`.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            case_insensitive: false,
            batch_size: DEFAULT_LOAD_BATCH,
            root: None,
        }
    }

    /// Root directory to strip from the rows of a legacy snapshot.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Fold path case while loading, matching a case-insensitive walk.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// Rows per batch. Zero is treated as one.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load the whole snapshot into memory.
    ///
    /// If a path appears more than once, the later row wins.
    pub fn load(&self, path: &Path) -> Result<Snapshot, SnapshotLoadError> {
        let mut snapshot = Snapshot::new();
        let mut duplicates = 0u64;
        self.for_each_batch(path, |batch| {
            for (key, digest) in batch {
                if snapshot.insert(key, digest).is_some() {
                    duplicates += 1;
                }
            }
        })?;

        if duplicates > 0 {
            tracing::warn!(
                "Snapshot {} lists {} path(s) more than once; later rows were kept",
                path.display(),
                duplicates
            );
        }
        tracing::debug!("Loaded {} entries from {}", snapshot.len(), path.display());
        Ok(snapshot)
    }

    /// Stream the snapshot, calling `on_batch` with up to `batch_size` rows at
    /// a time. Returns the number of rows read.
    pub fn for_each_batch<F>(&self, path: &Path, mut on_batch: F) -> Result<u64, SnapshotLoadError>
    where
        F: FnMut(Vec<(FilePath, Digest)>),
    {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SnapshotLoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => SnapshotLoadError::Read {
                path: path.to_path_buf(),
                source: csv::Error::from(e),
            },
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut record = csv::StringRecord::new();
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut rows = 0u64;
        let mut first = true;
        let mut prefixes = Vec::new();

        loop {
            let more = reader
                .read_record(&mut record)
                .map_err(|source| SnapshotLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            if !more {
                break;
            }

            if first {
                first = false;
                if record.iter().eq(HEADER) {
                    continue;
                }
                prefixes = self.root_prefixes();
                tracing::debug!(
                    "Snapshot {} has no header, stripping root prefixes {:?}",
                    path.display(),
                    prefixes
                );
            }

            let line = record.position().map(|p| p.line()).unwrap_or(0);
            batch.push(self.parse_row(path, line, &record, &prefixes)?);
            rows += 1;

            if batch.len() >= self.batch_size {
                on_batch(std::mem::replace(
                    &mut batch,
                    Vec::with_capacity(self.batch_size),
                ));
            }
        }

        if !batch.is_empty() {
            on_batch(batch);
        }

        Ok(rows)
    }

    fn parse_row(
        &self,
        path: &Path,
        line: u64,
        record: &csv::StringRecord,
        prefixes: &[String],
    ) -> Result<(FilePath, Digest), SnapshotLoadError> {
        if record.len() != 2 {
            return Err(SnapshotLoadError::MalformedRecord {
                path: path.to_path_buf(),
                line,
                fields: record.len(),
            });
        }

        let unified = record[0].replace('\\', "/");
        let stored = unified.trim_start_matches("./");
        let relative = prefixes
            .iter()
            .find_map(|prefix| stored.strip_prefix(prefix.as_str()))
            .unwrap_or(stored);
        let key = FilePath::from_stored(relative, self.case_insensitive).ok_or_else(|| {
            SnapshotLoadError::OutsideRoot {
                path: path.to_path_buf(),
                line,
                value: record[0].to_string(),
            }
        })?;

        let raw_digest = &record[1];
        let digest = Digest::from_hex(raw_digest).map_err(|_| SnapshotLoadError::InvalidDigest {
            path: path.to_path_buf(),
            line,
            value: raw_digest.to_string(),
        })?;

        let expected = self.algorithm.output_len();
        if digest.len() != expected {
            return Err(SnapshotLoadError::AlgorithmMismatch {
                path: path.to_path_buf(),
                line,
                algorithm: self.algorithm.to_string(),
                expected,
                actual: digest.len(),
            });
        }

        Ok((key, digest))
    }

    fn root_prefixes(&self) -> Vec<String> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut prefixes = vec![stored_prefix(root)];
        if let Ok(canonical) = root.canonicalize() {
            prefixes.push(stored_prefix(&canonical));
        }
        prefixes.retain(|prefix| !prefix.is_empty());
        prefixes.dedup();
        prefixes
    }
}

/// A directory as it appears at the front of legacy snapshot rows.
fn stored_prefix(dir: &Path) -> String {
    let mut out = String::new();
    for component in dir.components() {
        match component {
            Component::Prefix(prefix) => {
                out.push_str(&prefix.as_os_str().to_string_lossy().replace('\\', "/"));
            }
            Component::RootDir => out.push('/'),
            Component::CurDir => {}
            Component::ParentDir => out.push_str("../"),
            Component::Normal(part) => {
                out.push_str(&encode_component(part));
                out.push('/');
            }
        }
    }
    out
}

/// Load a snapshot with default reader settings.
pub fn load_snapshot(path: &Path, algorithm: HashAlgorithm) -> Result<Snapshot, SnapshotLoadError> {
    SnapshotReader::new(algorithm).load(path)
}
