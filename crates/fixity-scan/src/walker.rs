//! JWalk-based parallel tree walker.
//!
//! Only regular files are collected. Symbolic links are neither followed nor
//! included, which rules out cycles; sockets, devices and other special files
//! are skipped.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

use fixity_core::{AuditConfig, AuditError, FilePath, FileSet, WalkWarning, WarningKind};

/// Result of walking a root directory.
#[derive(Debug)]
pub struct WalkOutput {
    /// Regular files found, keyed by normalized path.
    pub files: FileSet,
    /// Entries that were skipped.
    pub warnings: Vec<WalkWarning>,
    /// Directories visited, including the root.
    pub dirs_visited: u64,
    /// Symbolic links and special files skipped by policy.
    pub skipped_special: u64,
}

/// Enumerates regular files under a root directory.
pub struct TreeWalker {
    root: PathBuf,
    workers: usize,
    case_insensitive: bool,
    exclude: GlobSet,
    outputs: Vec<PathBuf>,
}

impl TreeWalker {
    /// Create a walker from run configuration.
    ///
    /// Fails with [`AuditError::InvalidConfig`] if an exclude pattern is not a
    /// valid glob.
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| AuditError::InvalidConfig {
                message: format!("Invalid exclude pattern '{pattern}': {e}"),
            })?;
            builder.add(glob);
        }
        let exclude = builder.build().map_err(|e| AuditError::InvalidConfig {
            message: e.to_string(),
        })?;

        Ok(Self {
            root: config.root.clone(),
            workers: config.workers,
            case_insensitive: config.case_insensitive,
            exclude,
            outputs: config.output_files().filter_map(resolve).collect(),
        })
    }

    /// Walk the tree.
    ///
    /// A missing root is fatal. Unreadable directories and entries are skipped
    /// and reported as warnings.
    pub fn walk(&self) -> Result<WalkOutput, AuditError> {
        let root_path = self
            .root
            .canonicalize()
            .map_err(|e| AuditError::root(&self.root, e))?;

        if !root_path.is_dir() {
            return Err(AuditError::NotADirectory { path: root_path });
        }

        let parallelism = match self.workers {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(&root_path)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true);

        let mut output = WalkOutput {
            files: FileSet::new(&root_path),
            warnings: Vec::new(),
            dirs_visited: 0,
            skipped_special: 0,
        };

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let warning = match err.io_error() {
                        Some(io) => WalkWarning::from_io(path, io),
                        None => WalkWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    tracing::warn!("{}", warning.message);
                    output.warnings.push(warning);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                output.dirs_visited += 1;
                continue;
            }
            if !file_type.is_file() {
                output.skipped_special += 1;
                continue;
            }

            let path = entry.path();
            if self.outputs.iter().any(|o| *o == path) {
                tracing::debug!("Skipping output file {}", path.display());
                continue;
            }

            let Ok(relative) = path.strip_prefix(&root_path) else {
                continue;
            };
            if self.is_excluded(relative) {
                continue;
            }
            let Some(key) = FilePath::from_relative(relative, self.case_insensitive) else {
                continue;
            };

            if !output.files.insert(key.clone(), path.clone()) {
                let warning = WalkWarning::duplicate(&path, &key);
                tracing::warn!("{}", warning.message);
                output.warnings.push(warning);
            }
        }

        tracing::debug!(
            files = output.files.len(),
            dirs = output.dirs_visited,
            warnings = output.warnings.len(),
            "Walk finished for {}",
            root_path.display()
        );

        Ok(output)
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        self.exclude.is_match(relative)
            || relative
                .file_name()
                .is_some_and(|name| self.exclude.is_match(name))
    }
}

/// Absolute location of an output file, whether or not it exists yet.
fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(found) = path.canonicalize() {
        return Some(found);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.canonicalize().ok()?,
        _ => std::env::current_dir().ok()?.canonicalize().ok()?,
    };
    Some(parent.join(name))
}
