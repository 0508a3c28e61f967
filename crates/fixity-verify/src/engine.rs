//! Save and check runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use fixity_core::{
    AuditConfig, AuditError, Digest, FilePath, FileSet, HashFailure, ReconciliationReport,
    WalkWarning,
};
use fixity_scan::{HashEvent, HashProgress, HashScheduler, TreeWalker};
use fixity_store::{SnapshotReader, SnapshotWriter};
use tokio::sync::broadcast;

use crate::reconcile::reconcile;

/// Result of a save run.
#[derive(Debug)]
pub struct SaveSummary {
    /// Where the snapshot was written.
    pub snapshot_path: PathBuf,
    /// Rows written to the snapshot.
    pub files_written: u64,
    /// Distinct folders that contained files.
    pub folders: usize,
    /// Files left out of the snapshot because they could not be hashed.
    pub failures: Vec<HashFailure>,
    /// Entries skipped while walking.
    pub warnings: Vec<WalkWarning>,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Result of a check run.
#[derive(Debug)]
pub struct CheckOutcome {
    /// Differences against the baseline.
    pub report: ReconciliationReport,
    /// Entries in the baseline.
    pub baseline_entries: usize,
    /// Files found by the walk.
    pub files_found: usize,
    /// Files re-hashed for comparison.
    pub files_hashed: u64,
    /// Files that could not be hashed.
    pub failures: Vec<HashFailure>,
    /// Entries skipped while walking.
    pub warnings: Vec<WalkWarning>,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Runs saves and checks for one configuration.
pub struct Auditor {
    config: AuditConfig,
    scheduler: HashScheduler,
}

impl Auditor {
    /// Create an auditor, validating the configuration.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        config.validate()?;
        let scheduler = HashScheduler::from_config(&config);
        Ok(Self { config, scheduler })
    }

    /// Configuration in use.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Subscribe to hashing progress.
    pub fn subscribe(&self) -> broadcast::Receiver<HashProgress> {
        self.scheduler.subscribe()
    }

    /// Flag that interrupts the current run at the next batch boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.scheduler.cancel_handle()
    }

    /// Hash the whole tree and write a fresh snapshot.
    ///
    /// The snapshot is truncated before the first batch is written, so a
    /// save always rebuilds it. If the run fails part way, the batches
    /// written so far stay on disk.
    pub fn save(&self) -> Result<SaveSummary, AuditError> {
        let started = Instant::now();
        let walk = TreeWalker::new(&self.config)?.walk()?;
        let folders = walk.files.folders().len();

        tracing::info!(
            "Saving {} files in {} folders from {} with {}",
            walk.files.len(),
            folders,
            walk.files.root().display(),
            self.config.algorithm
        );

        let mut writer = SnapshotWriter::create(&self.config.snapshot_path)?;
        let mut failures = Vec::new();
        let mut folder_counter = FolderCounter::new(folders);

        self.scheduler
            .run::<AuditError, _>(&walk.files, |batch| {
                folder_counter.log(batch, "Folder");
                let rows = batch.iter().filter_map(|event| match &event.outcome {
                    Ok(digest) => Some((&event.path, digest)),
                    Err(failure) => {
                        failures.push(failure.clone());
                        None
                    }
                });
                writer.append_batch(rows)?;
                Ok(())
            })?;

        let files_written = writer.finish()?;

        tracing::info!(
            "Saved {} hashes to {} ({} failed)",
            files_written,
            self.config.snapshot_path.display(),
            failures.len()
        );

        Ok(SaveSummary {
            snapshot_path: self.config.snapshot_path.clone(),
            files_written,
            folders,
            failures,
            warnings: walk.warnings,
            elapsed: started.elapsed(),
        })
    }

    /// Compare the tree against the saved snapshot.
    ///
    /// The baseline is loaded before anything is hashed; if it is missing
    /// or unreadable the run stops there. Only files that the baseline
    /// knows about are re-hashed.
    pub fn check(&self) -> Result<CheckOutcome, AuditError> {
        let started = Instant::now();
        let baseline = SnapshotReader::new(self.config.algorithm)
            .case_insensitive(self.config.case_insensitive)
            .batch_size(self.config.batch_size)
            .root(&self.config.root)
            .load(&self.config.snapshot_path)?;

        let walk = TreeWalker::new(&self.config)?.walk()?;
        let to_hash = known_files(&walk.files, |path| baseline.contains(path));
        let folders = to_hash.folders().len();

        tracing::info!(
            "Checking {} of {} files against {} baseline entries",
            to_hash.len(),
            walk.files.len(),
            baseline.len()
        );

        let mut fresh: HashMap<FilePath, Digest> = HashMap::with_capacity(to_hash.len());
        let mut failures = Vec::new();
        let mut folder_counter = FolderCounter::new(folders);

        let summary = self
            .scheduler
            .run::<AuditError, _>(&to_hash, |batch| {
                folder_counter.log(batch, "Checking folder");
                for event in batch {
                    match &event.outcome {
                        Ok(digest) => {
                            fresh.insert(event.path.clone(), digest.clone());
                        }
                        Err(failure) => failures.push(failure.clone()),
                    }
                }
                Ok(())
            })?;

        let report = reconcile(walk.files.paths(), &baseline, &fresh);

        tracing::info!(
            corrupt = report.corrupt.len(),
            new = report.new.len(),
            missing = report.missing.len(),
            new_folders = report.new_folders.len(),
            missing_folders = report.missing_folders.len(),
            "Check complete"
        );

        Ok(CheckOutcome {
            report,
            baseline_entries: baseline.len(),
            files_found: walk.files.len(),
            files_hashed: summary.hashed,
            failures,
            warnings: walk.warnings,
            elapsed: started.elapsed(),
        })
    }
}

/// Save a snapshot for `config`.
pub fn save(config: &AuditConfig) -> Result<SaveSummary, AuditError> {
    Auditor::new(config.clone())?.save()
}

/// Check the tree described by `config` against its snapshot.
pub fn check(config: &AuditConfig) -> Result<CheckOutcome, AuditError> {
    Auditor::new(config.clone())?.check()
}

/// Subset of a walked set whose keys pass `keep`.
fn known_files(files: &FileSet, keep: impl Fn(&FilePath) -> bool) -> FileSet {
    let mut subset = FileSet::new(files.root());
    for (key, location) in files.iter().filter(|&(key, _)| keep(key)) {
        subset.insert(key.clone(), location.to_path_buf());
    }
    subset
}

/// Logs one line per folder boundary in dispatch order.
struct FolderCounter {
    seen: usize,
    total: usize,
}

impl FolderCounter {
    fn new(total: usize) -> Self {
        Self { seen: 0, total }
    }

    fn log(&mut self, batch: &[HashEvent], label: &str) {
        for event in batch.iter().filter(|e| e.folder_changed) {
            self.seen += 1;
            tracing::info!("{label} {}/{}: {}", self.seen, self.total, event.folder());
        }
    }
}
