//! Crate-wide error types.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the ingestion binary.
///
/// Per-file problems during the batch are not represented here; they are
/// classified into [`crate::ingest::FileFailure`] and counted, never
/// propagated. Only startup-time failures (bad config, missing corpus,
/// unreachable store, unloadable model) surface as `Error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures while enumerating or reading the source corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus directory {} does not exist or is not a directory", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no .{extension} files found in {}", .dir.display())]
    NoFilesFound { dir: PathBuf, extension: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures from the embedding model.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot embed empty text")]
    EmptyInput,
}

/// Failures from the document store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to MongoDB: {0}")]
    Connect(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),
}
