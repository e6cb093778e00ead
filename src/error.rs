//! Error types for compacted de Bruijn graph construction.
//!
//! Every failure is fatal for the run: configuration problems abort before
//! any work starts, database problems abort as soon as they are detected,
//! and invariant violations indicate a defect in the input or the code.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for all construction operations
#[derive(Error, Debug)]
pub enum CdbgError {
    /// Invalid run parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// The database was counted with a different k than the one configured
    #[error("Expected k value {expected}, but {path} is a {found}-mer database")]
    KmerLengthMismatch {
        expected: usize,
        found: usize,
        path: PathBuf,
    },

    /// Missing, unreadable or malformed k-mer database
    #[error("K-mer database error ({path}): {message}")]
    Database { path: PathBuf, message: String },

    /// A vertex ended up neither on a unitig nor on a detached cycle
    #[error("Construction invariant violated: {0}")]
    InvariantViolation(String),

    /// Malformed FASTA/FASTQ input to the counter
    #[error("Sequence input error ({path}): {message}")]
    Sequence { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hash function save/load failure
    #[error("Hash function persistence error: {0}")]
    Persist(#[from] bincode::Error),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Thread pool build error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A producer or worker thread panicked
    #[error("Concurrency error: {0}")]
    Concurrency(String),
}

impl CdbgError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn database(path: &Path, message: impl Into<String>) -> Self {
        Self::Database {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn sequence(path: &Path, message: impl Into<String>) -> Self {
        Self::Sequence {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::Concurrency(message.into())
    }

    /// Whether this error is one of the configuration-class failures
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::KmerLengthMismatch { .. })
    }
}

/// Result type alias for construction operations
pub type Result<T> = std::result::Result<T, CdbgError>;
