//! Hashing progress reporting.

use std::time::{Duration, Instant};

use fixity_core::FolderPath;

/// Progress information during a hashing run.
#[derive(Debug, Clone)]
pub struct HashProgress {
    /// Files hashed or failed so far.
    pub files_done: u64,
    /// Files scheduled in total.
    pub files_total: u64,
    /// Folders entered so far, in dispatch order.
    pub folders_done: u64,
    /// Distinct folders scheduled in total.
    pub folders_total: u64,
    /// Files that could not be hashed.
    pub failures: u64,
    /// Folder of the last completed file.
    pub current_folder: Option<FolderPath>,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl HashProgress {
    /// Create initial progress state.
    pub fn new(files_total: u64, folders_total: u64) -> Self {
        Self {
            files_done: 0,
            files_total,
            folders_done: 0,
            folders_total,
            failures: 0,
            current_folder: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Completed fraction between 0.0 and 1.0.
    pub fn fraction(&self) -> f64 {
        if self.files_total == 0 {
            1.0
        } else {
            self.files_done as f64 / self.files_total as f64
        }
    }

    /// Calculate hashing rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_done as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    state: HashProgress,
}

impl ProgressTracker {
    pub fn new(files_total: u64, folders_total: u64) -> Self {
        Self {
            start_time: Instant::now(),
            state: HashProgress::new(files_total, folders_total),
        }
    }

    pub fn record(&mut self, folder: &FolderPath, folder_changed: bool, failed: bool) {
        self.state.files_done += 1;
        if failed {
            self.state.failures += 1;
        }
        if folder_changed {
            self.state.folders_done += 1;
            self.state.current_folder = Some(folder.clone());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> HashProgress {
        HashProgress {
            elapsed: self.start_time.elapsed(),
            ..self.state.clone()
        }
    }
}
