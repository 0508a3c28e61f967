//! Tree walking and hashing engine for fixity.
//!
//! This crate turns a root directory into `(path, digest)` pairs:
//!
//! - **Tree walking** via jwalk, regular files only, symlinks never followed
//! - **Streaming hashing** in fixed-size chunks (SHA-256, SHA-512, BLAKE3)
//! - **Batched scheduling** on a rayon pool with folder-boundary events
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use fixity_scan::{AuditConfig, HashScheduler, TreeWalker};
//!
//! let config = AuditConfig::new("/path/to/audit");
//! let walk = TreeWalker::new(&config).unwrap().walk().unwrap();
//!
//! let scheduler = HashScheduler::from_config(&config);
//! scheduler
//!     .run::<fixity_scan::AuditError, _>(&walk.files, |batch| {
//!         for event in batch {
//!             if event.folder_changed {
//!                 println!("Entering {}", event.folder());
//!             }
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

mod hasher;
mod progress;
mod scheduler;
mod walker;

pub use hasher::{DEFAULT_CHUNK_SIZE, FileHasher};
pub use progress::HashProgress;
pub use scheduler::{DEFAULT_BATCH_SIZE, HashEvent, HashScheduler, HashSummary};
pub use walker::{TreeWalker, WalkOutput};

// Re-export core types for convenience
pub use fixity_core::{
    AuditConfig, AuditError, Digest, FilePath, FileSet, FolderPath, HashAlgorithm, HashError,
    HashFailure, WalkWarning, WarningKind,
};
