//! Corpus ingestion: enumeration, document shaping, and the batch pipeline.

pub mod corpus;
pub mod document;
pub mod pipeline;

pub use corpus::{read_corpus_file, CorpusScanner};
pub use document::{content_hash, DocumentMetadata, StoredDocument};
pub use pipeline::{CorpusIngestor, FileFailure, FileOutcome};
