//! Streamed snapshot writing.

use std::fs::File;
use std::path::{Path, PathBuf};

use fixity_core::{Digest, FilePath, SnapshotWriteError};

use crate::HEADER;

/// Appends `(path, digest)` rows to a snapshot file batch by batch.
///
/// Creating a writer truncates the target: a save always rebuilds the
/// snapshot from scratch, so entries for deleted files cannot linger. Each
/// [`append_batch`](Self::append_batch) is flushed before returning, which
/// makes every completed batch durable even if the run stops later.
pub struct SnapshotWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

impl SnapshotWriter {
    /// Create or truncate the snapshot at `path` and write the header row.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SnapshotWriteError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| SnapshotWriteError::Create {
            path: path.clone(),
            source,
        })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(HEADER)
            .and_then(|()| writer.flush().map_err(csv::Error::from))
            .map_err(|source| SnapshotWriteError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Snapshot opened for writing at {}", path.display());

        Ok(Self {
            path,
            writer,
            rows: 0,
        })
    }

    /// Location being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Write a batch of rows and flush it.
    pub fn append_batch<'a, I>(&mut self, rows: I) -> Result<usize, SnapshotWriteError>
    where
        I: IntoIterator<Item = (&'a FilePath, &'a Digest)>,
    {
        let mut written = 0;
        for (path, digest) in rows {
            self.writer
                .write_record([path.as_str(), digest.to_hex().as_str()])
                .map_err(|source| self.write_error(source))?;
            written += 1;
        }
        self.writer
            .flush()
            .map_err(|e| self.write_error(csv::Error::from(e)))?;
        self.rows += written as u64;
        Ok(written)
    }

    /// Flush and sync the file to disk, returning the number of rows written.
    pub fn finish(mut self) -> Result<u64, SnapshotWriteError> {
        self.writer
            .flush()
            .and_then(|()| self.writer.get_ref().sync_all())
            .map_err(|e| self.write_error(csv::Error::from(e)))?;
        tracing::debug!("Snapshot {} complete with {} rows", self.path.display(), self.rows);
        Ok(self.rows)
    }

    fn write_error(&self, source: csv::Error) -> SnapshotWriteError {
        SnapshotWriteError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
