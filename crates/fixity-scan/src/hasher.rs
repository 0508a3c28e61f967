//! Streaming content hashing.
//!
//! Files are read in fixed-size chunks and fed into an incremental
//! accumulator, so memory use does not depend on file size.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha512};

use fixity_core::{AuditConfig, Digest, HashAlgorithm, HashError};

/// Default read size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Incremental hash state for one file.
enum Accumulator {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
    Sha1(Sha1),
    Md5(Md5),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Md5 => Self::Md5(Md5::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(bytes),
            Self::Sha512(h) => h.update(bytes),
            Self::Blake3(h) => {
                h.update(bytes);
            }
            Self::Sha1(h) => h.update(bytes),
            Self::Md5(h) => h.update(bytes),
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Sha256(h) => Digest::new(h.finalize().to_vec()),
            Self::Sha512(h) => Digest::new(h.finalize().to_vec()),
            Self::Blake3(h) => Digest::new(h.finalize().as_bytes().to_vec()),
            Self::Sha1(h) => Digest::new(h.finalize().to_vec()),
            Self::Md5(h) => Digest::new(h.finalize().to_vec()),
        }
    }
}

/// Why a stream stopped early.
enum StreamError {
    Io(std::io::Error),
    Timeout(Duration),
}

/// Computes file digests with a fixed algorithm and read size.
#[derive(Debug, Clone)]
pub struct FileHasher {
    algorithm: HashAlgorithm,
    chunk_size: usize,
    timeout: Option<Duration>,
}

impl FileHasher {
    /// Create a hasher for the given algorithm with default settings.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
        }
    }

    /// Create a hasher from run configuration.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.algorithm)
            .with_chunk_size(config.chunk_size)
            .with_timeout(config.file_timeout)
    }

    /// Set the read size. Zero is treated as one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Abort a single file after `timeout`.
    ///
    /// The deadline is checked between reads, so a read that blocks
    /// indefinitely is not interrupted.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Algorithm in use.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash the content of a file.
    pub fn hash_file(&self, path: &Path) -> Result<Digest, HashError> {
        let started = Instant::now();
        let file = File::open(path).map_err(|e| HashError::io(path, e))?;
        self.stream(file, started).map_err(|e| match e {
            StreamError::Io(source) => HashError::io(path, source),
            StreamError::Timeout(elapsed) => HashError::Timeout {
                path: path.to_path_buf(),
                elapsed,
            },
        })
    }

    /// Hash everything a reader yields. The timeout does not apply.
    pub fn hash_reader<R: Read>(&self, reader: R) -> std::io::Result<Digest> {
        let unlimited = Self {
            timeout: None,
            ..self.clone()
        };
        unlimited
            .stream(reader, Instant::now())
            .map_err(|e| match e {
                StreamError::Io(source) => source,
                StreamError::Timeout(_) => std::io::Error::from(ErrorKind::TimedOut),
            })
    }

    fn stream<R: Read>(&self, mut reader: R, started: Instant) -> Result<Digest, StreamError> {
        let mut accumulator = Accumulator::new(self.algorithm);
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            if let Some(limit) = self.timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(StreamError::Timeout(elapsed));
                }
            }

            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::Io(e)),
            };
            accumulator.update(&buffer[..bytes_read]);
        }

        Ok(accumulator.finalize())
    }
}

impl Default for FileHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}
