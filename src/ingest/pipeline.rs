//! The batch loop: read, hash, embed, and insert each corpus file in turn.

use crate::embedding::TextEmbedder;
use crate::error::{CorpusError, Result};
use crate::ingest::corpus::{read_corpus_file, CorpusScanner};
use crate::ingest::document::StoredDocument;
use crate::report::RunStats;
use crate::store::{DocumentSink, InsertOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

/// Terminal state for one file. Every file reaches exactly one of these per
/// run; there are no retries.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Inserted,
    Duplicate,
    Failed(FileFailure),
}

/// Why a file failed. The batch continues past every one of these.
#[derive(Debug, Clone)]
pub enum FileFailure {
    Read(String),
    EmptyText,
    Embedding(String),
    Storage(String),
}

impl FileFailure {
    pub fn reason(&self) -> String {
        match self {
            FileFailure::Read(error) => format!("read failed: {error}"),
            FileFailure::EmptyText => "file is empty or whitespace-only".to_string(),
            FileFailure::Embedding(error) => format!("embedding failed: {error}"),
            FileFailure::Storage(error) => format!("storage failed: {error}"),
        }
    }
}

/// Drives a corpus through the pipeline one file at a time, accumulating
/// per-outcome counters.
pub struct CorpusIngestor {
    scanner: CorpusScanner,
    embedder: Arc<dyn TextEmbedder>,
}

impl CorpusIngestor {
    pub fn new(scanner: CorpusScanner, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { scanner, embedder }
    }

    /// Run the batch against `sink`. Fatal only when the corpus directory is
    /// missing or holds no matching files; per-file problems are counted and
    /// the loop moves on.
    pub async fn run(&self, sink: &dyn DocumentSink) -> Result<RunStats> {
        let files = self.scanner.scan()?;
        if files.is_empty() {
            return Err(CorpusError::NoFilesFound {
                dir: self.scanner.dir().to_path_buf(),
                extension: self.scanner.extension().to_string(),
            }
            .into());
        }

        tracing::info!(count = files.len(), "starting corpus ingestion");

        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut stats = RunStats::start();
        for path in &files {
            let name = file_name(path);
            let outcome = self.process_file(sink, path).await;
            match &outcome {
                FileOutcome::Inserted => tracing::info!(file = %name, "document inserted"),
                FileOutcome::Duplicate => tracing::warn!(file = %name, "duplicate document skipped"),
                FileOutcome::Failed(failure) => {
                    tracing::error!(file = %name, reason = %failure.reason(), "document failed")
                }
            }
            stats.record(&name, &outcome);
            bar.set_message(format!(
                "inserted {} duplicates {} failed {}",
                stats.inserted, stats.duplicates, stats.failed
            ));
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(stats)
    }

    /// One file, start to terminal outcome: read it, require non-empty text,
    /// hash and embed, then attempt exactly one insert.
    async fn process_file(&self, sink: &dyn DocumentSink, path: &Path) -> FileOutcome {
        let raw = match read_corpus_file(path) {
            Ok(raw) => raw,
            Err(error) => return FileOutcome::Failed(FileFailure::Read(error.to_string())),
        };

        let text = raw.trim();
        if text.is_empty() {
            return FileOutcome::Failed(FileFailure::EmptyText);
        }

        let embedding = match self.embedder.embed_one(text).await {
            Ok(embedding) => embedding,
            Err(error) => return FileOutcome::Failed(FileFailure::Embedding(error.to_string())),
        };

        let document = StoredDocument::assemble(&file_name(path), text.to_string(), embedding);

        match sink.insert(&document).await {
            Ok(InsertOutcome::Inserted) => FileOutcome::Inserted,
            Ok(InsertOutcome::Duplicate) => FileOutcome::Duplicate,
            Err(error) => FileOutcome::Failed(FileFailure::Storage(error.to_string())),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<unnamed>")
        .to_string()
}
