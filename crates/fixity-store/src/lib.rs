//! Snapshot storage for fixity.
//!
//! A snapshot is a CSV table with one `path,digest` row per file:
//!
//! ```text
//! path,digest
//! docs/readme.md,9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! ```
//!
//! [`SnapshotWriter`] streams rows out batch by batch during a save, and
//! [`SnapshotReader`] streams them back in bounded batches during a check.

mod reader;
mod writer;

pub use reader::{DEFAULT_LOAD_BATCH, SnapshotReader, load_snapshot};
pub use writer::SnapshotWriter;

/// Column names of the snapshot table.
pub const HEADER: [&str; 2] = ["path", "digest"];
