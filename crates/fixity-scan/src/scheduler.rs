//! Batched parallel hashing.
//!
//! Work is dispatched in folder order and cut into fixed-size batches. Each
//! batch is hashed on a rayon pool with an indexed parallel map, so every
//! result stays paired with its input path whatever order workers finish in.
//! Completed batches are handed back on the calling thread, which is the only
//! place results are consumed.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::broadcast;

use fixity_core::{AuditConfig, AuditError, Digest, FilePath, FileSet, FolderPath, HashFailure};

use crate::hasher::FileHasher;
use crate::progress::{HashProgress, ProgressTracker};

/// Default number of files per batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Outcome of hashing one file.
#[derive(Debug, Clone)]
pub struct HashEvent {
    /// File the outcome belongs to.
    pub path: FilePath,
    /// Digest, or the reason there is none.
    pub outcome: Result<Digest, HashFailure>,
    /// The file's folder differs from the previous file in dispatch order.
    pub folder_changed: bool,
}

impl HashEvent {
    /// Folder containing the file.
    pub fn folder(&self) -> FolderPath {
        self.path.parent()
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default)]
pub struct HashSummary {
    /// Files hashed successfully.
    pub hashed: u64,
    /// Files that failed to hash.
    pub failed: u64,
    /// Folders entered.
    pub folders: u64,
    /// Batches handed to the consumer.
    pub batches: u64,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Distributes hashing across worker threads in bounded batches.
pub struct HashScheduler {
    hasher: FileHasher,
    batch_size: usize,
    workers: usize,
    cancelled: Arc<AtomicBool>,
    progress_tx: broadcast::Sender<HashProgress>,
}

impl HashScheduler {
    /// Create a scheduler that hashes with `hasher`.
    pub fn new(hasher: FileHasher) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            hasher,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
            progress_tx,
        }
    }

    /// Create a scheduler from run configuration.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(FileHasher::from_config(config))
            .with_batch_size(config.batch_size)
            .with_workers(config.workers)
    }

    /// Set the number of files per batch. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the number of worker threads (0 = rayon's global pool).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// The hasher used for each file.
    pub fn hasher(&self) -> &FileHasher {
        &self.hasher
    }

    /// Subscribe to progress updates, sent once per batch.
    pub fn subscribe(&self) -> broadcast::Receiver<HashProgress> {
        self.progress_tx.subscribe()
    }

    /// Flag that stops the run before the next batch is handed over.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Hash every file in `files`, calling `on_batch` with each completed batch.
    ///
    /// Events arrive in dispatch order: grouped by folder, then by file name.
    /// A failure to hash one file is reported in its event and never stops
    /// the others. If `on_batch` fails, or the run is cancelled, no further
    /// batches are produced; a cancelled batch is discarded without being
    /// handed over.
    pub fn run<E, F>(&self, files: &FileSet, mut on_batch: F) -> Result<HashSummary, E>
    where
        E: From<AuditError>,
        F: FnMut(&[HashEvent]) -> Result<(), E>,
    {
        let pool = self.build_pool()?;

        let mut order: Vec<(&FilePath, &Path)> = files.iter().collect();
        order.sort_by_cached_key(|&(key, _)| (key.parent(), key.file_name()));

        let folders_total = files.folders().len() as u64;
        let mut tracker = ProgressTracker::new(order.len() as u64, folders_total);
        let mut summary = HashSummary::default();
        let mut last_folder: Option<FolderPath> = None;

        for batch in order.chunks(self.batch_size) {
            if self.is_cancelled() {
                return Err(AuditError::Interrupted.into());
            }

            let outcomes = match &pool {
                Some(pool) => pool.install(|| self.hash_batch(batch)),
                None => self.hash_batch(batch),
            };

            if self.is_cancelled() {
                tracing::debug!("Discarding in-flight batch of {} files", batch.len());
                return Err(AuditError::Interrupted.into());
            }

            let mut events = Vec::with_capacity(batch.len());
            for (&(key, _), outcome) in batch.iter().zip(outcomes) {
                let folder = key.parent();
                let folder_changed = last_folder.as_ref() != Some(&folder);

                match &outcome {
                    Ok(_) => summary.hashed += 1,
                    Err(failure) => {
                        tracing::warn!("Could not hash {}: {}", failure.path, failure.message);
                        summary.failed += 1;
                    }
                }
                if folder_changed {
                    summary.folders += 1;
                }
                tracker.record(&folder, folder_changed, outcome.is_err());

                events.push(HashEvent {
                    path: key.clone(),
                    outcome,
                    folder_changed,
                });
                last_folder = Some(folder);
            }

            on_batch(&events)?;
            summary.batches += 1;
            let _ = self.progress_tx.send(tracker.snapshot());
        }

        summary.elapsed = tracker.elapsed();
        Ok(summary)
    }

    fn hash_batch(&self, batch: &[(&FilePath, &Path)]) -> Vec<Result<Digest, HashFailure>> {
        batch
            .par_iter()
            .map(|(key, location)| {
                self.hasher
                    .hash_file(location)
                    .map_err(|e| HashFailure::new((*key).clone(), &e))
            })
            .collect()
    }

    fn build_pool(&self) -> Result<Option<ThreadPool>, AuditError> {
        if self.workers == 0 {
            return Ok(None);
        }
        ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("fixity-hash-{i}"))
            .build()
            .map(Some)
            .map_err(|e| AuditError::InvalidConfig {
                message: format!("Cannot start {} hashing threads: {e}", self.workers),
            })
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixity_core::{FailureKind, HashAlgorithm};
    use std::fs;
    use tempfile::TempDir;

    fn file_set(root: &Path, names: &[&str]) -> FileSet {
        let mut set = FileSet::new(root);
        for name in names {
            let location = root.join(name);
            fs::create_dir_all(location.parent().unwrap()).unwrap();
            fs::write(&location, name.as_bytes()).unwrap();
            set.insert(FilePath::new(name), location);
        }
        set
    }

    fn collect(scheduler: &HashScheduler, files: &FileSet) -> (Vec<HashEvent>, HashSummary) {
        let mut events = Vec::new();
        let summary = scheduler
            .run::<AuditError, _>(files, |batch| {
                events.extend_from_slice(batch);
                Ok(())
            })
            .unwrap();
        (events, summary)
    }

    #[test]
    fn test_every_path_paired_with_its_digest() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..40).map(|i| format!("d{}/f{i:02}.txt", i % 3)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let files = file_set(temp.path(), &refs);

        let scheduler = HashScheduler::new(FileHasher::new(HashAlgorithm::Sha256))
            .with_batch_size(7)
            .with_workers(4);
        let (events, summary) = collect(&scheduler, &files);

        assert_eq!(events.len(), 40);
        assert_eq!(summary.hashed, 40);
        assert_eq!(summary.batches, 6);
        for event in &events {
            let expected = scheduler
                .hasher()
                .hash_reader(event.path.as_str().as_bytes())
                .unwrap();
            assert_eq!(event.outcome.as_ref().unwrap(), &expected);
        }
    }

    #[test]
    fn test_folder_changed_follows_dispatch_order() {
        let temp = TempDir::new().unwrap();
        let files = file_set(
            temp.path(),
            &["a/b.txt", "a/b/c.txt", "a/c.txt", "top.txt", "z/1.txt"],
        );

        let scheduler = HashScheduler::new(FileHasher::default()).with_batch_size(2);
        let (events, summary) = collect(&scheduler, &files);

        let order: Vec<(&str, bool)> = events
            .iter()
            .map(|e| (e.path.as_str(), e.folder_changed))
            .collect();
        assert_eq!(
            order,
            vec![
                ("top.txt", true),
                ("a/b.txt", true),
                ("a/c.txt", false),
                ("a/b/c.txt", true),
                ("z/1.txt", true),
            ]
        );
        assert_eq!(summary.folders, 4);
    }

    #[test]
    fn test_failure_does_not_stop_siblings() {
        let temp = TempDir::new().unwrap();
        let mut files = file_set(temp.path(), &["ok1.txt", "ok2.txt"]);
        files.insert(FilePath::new("gone.txt"), temp.path().join("gone.txt"));

        let scheduler = HashScheduler::new(FileHasher::default());
        let (events, summary) = collect(&scheduler, &files);

        assert_eq!(summary.hashed, 2);
        assert_eq!(summary.failed, 1);
        let failed: Vec<_> = events.iter().filter_map(|e| e.outcome.as_ref().err()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path.as_str(), "gone.txt");
        assert_eq!(failed[0].kind, FailureKind::NotFound);
    }

    #[test]
    fn test_cancel_discards_batch() {
        let temp = TempDir::new().unwrap();
        let files = file_set(temp.path(), &["a.txt", "b.txt", "c.txt"]);

        let scheduler = HashScheduler::new(FileHasher::default()).with_batch_size(1);
        let cancel = scheduler.cancel_handle();
        let mut delivered = 0;
        let result = scheduler.run::<AuditError, _>(&files, |batch| {
            delivered += batch.len();
            cancel.store(true, Ordering::Relaxed);
            Ok(())
        });

        assert!(matches!(result, Err(AuditError::Interrupted)));
        assert_eq!(delivered, 1);
    }

    #[test]
    fn test_consumer_error_stops_run() {
        let temp = TempDir::new().unwrap();
        let files = file_set(temp.path(), &["a.txt", "b.txt"]);

        let scheduler = HashScheduler::new(FileHasher::default()).with_batch_size(1);
        let mut calls = 0;
        let result = scheduler.run(&files, |_| {
            calls += 1;
            Err(AuditError::InvalidConfig {
                message: "sink closed".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_progress_broadcast() {
        let temp = TempDir::new().unwrap();
        let files = file_set(temp.path(), &["a/1.txt", "b/2.txt", "b/3.txt"]);

        let scheduler = HashScheduler::new(FileHasher::default()).with_batch_size(2);
        let mut rx = scheduler.subscribe();
        collect(&scheduler, &files);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.files_done, 2);
        assert_eq!(first.files_total, 3);
        let last = rx.try_recv().unwrap();
        assert_eq!(last.files_done, 3);
        assert_eq!(last.folders_done, 2);
        assert_eq!(last.folders_total, 2);
    }

    #[test]
    fn test_empty_set() {
        let temp = TempDir::new().unwrap();
        let files = FileSet::new(temp.path());
        let (events, summary) = collect(&HashScheduler::new(FileHasher::default()), &files);
        assert!(events.is_empty());
        assert_eq!(summary.batches, 0);
    }
}
