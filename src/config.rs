//! Layered configuration: built-in defaults, an optional TOML file, and
//! `CORPUS_INGEST_*` environment overrides (e.g.
//! `CORPUS_INGEST_MONGO__URI=mongodb://db:27017`).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub mongo: MongoConfig,
    pub embedding: EmbeddingConfig,
    /// Log file written in addition to stdout.
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            mongo: MongoConfig::default(),
            embedding: EmbeddingConfig::default(),
            log_file: PathBuf::from("corpus-ingest.log"),
        }
    }
}

/// Where the source files live and which ones count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory scanned for source files (non-recursive).
    pub dir: PathBuf,
    /// File extension filter, without the leading dot.
    pub extension: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("corpus"),
            extension: "txt".to_string(),
        }
    }
}

/// Connection and naming for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// Connection string. For a replica set, list the members and the set
    /// name, e.g. `mongodb://localhost:3001,localhost:3002,localhost:3003/?replicaSet=rs`.
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// How long the driver waits to find a usable server before giving up.
    pub server_selection_timeout_secs: u64,
    /// Write-concern timeout for majority-acknowledged inserts.
    pub write_timeout_ms: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "politics".to_string(),
            collection: "speeches".to_string(),
            server_selection_timeout_secs: 5,
            write_timeout_ms: 5000,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Where downloaded model files are cached between runs.
    pub cache_dir: PathBuf,
    /// Output vector length of the configured model. Every stored document
    /// must carry an embedding of exactly this length.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".fastembed_cache"),
            dimension: 384,
        }
    }
}

impl AppConfig {
    /// Load configuration, layering an optional file and the environment on
    /// top of the defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CORPUS_INGEST")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: AppConfig = builder.build()?.try_deserialize()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.corpus.extension, "txt");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.mongo.collection, "speeches");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ingest.toml");
        let mut file = std::fs::File::create(&path).expect("create config file");
        writeln!(
            file,
            "[mongo]\nuri = \"mongodb://db:3001/?replicaSet=rs\"\ndatabase = \"history\"\n"
        )
        .expect("write config file");

        let config = AppConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.mongo.uri, "mongodb://db:3001/?replicaSet=rs");
        assert_eq!(config.mongo.database, "history");
        // Untouched sections keep their defaults.
        assert_eq!(config.mongo.collection, "speeches");
        assert_eq!(config.corpus.extension, "txt");
    }
}
