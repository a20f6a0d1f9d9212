//! Embedding generation via fastembed.

use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Seam between the pipeline and the embedding model, so the batch loop can
/// be exercised in tests without loading ONNX weights.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Output vector length; constant for a given model configuration.
    fn dimension(&self) -> usize;

    /// Embed one text into a fixed-length vector.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedding model wrapper with thread-safe sharing.
///
/// fastembed's TextEmbedding is blocking, so we hold it behind an Arc and
/// use spawn_blocking to call into it from async contexts. Loaded once at
/// startup and shared for the whole run; the model files are downloaded into
/// the configured cache directory on first use.
pub struct EmbeddingModel {
    model: Arc<fastembed::TextEmbedding>,
    dimension: usize,
}

impl EmbeddingModel {
    /// Load the default model (all-MiniLM-L6-v2, 384-dimension output),
    /// storing downloaded model files in `cache_dir`.
    ///
    /// Limits ONNX intra-op threads to avoid excessive memory usage on
    /// machines with many cores.
    pub fn load(cache_dir: &Path, dimension: usize) -> Result<Self> {
        if std::env::var("OMP_NUM_THREADS").is_err() {
            // SAFETY: Called once during single-threaded init before any ONNX
            // threads are spawned.
            unsafe { std::env::set_var("OMP_NUM_THREADS", "2") };
        }

        let options = fastembed::InitOptions::default()
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(true);

        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            dimension,
        })
    }

    /// Output vector length for the configured model.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate embeddings for multiple texts (blocking).
    pub fn embed_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()).into())
    }

    /// Generate embeddings for multiple texts (async, spawns blocking task).
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|text| text.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput.into());
        }

        let model = self.model.clone();
        let embeddings = tokio::task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
        })
        .await
        .map_err(|e| anyhow::anyhow!("embedding task failed: {}", e))??;

        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }

        Ok(embeddings)
    }

    /// Generate the embedding for a single text (async, spawns blocking task).
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("model returned no vector".into()).into())
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingModel {
    fn dimension(&self) -> usize {
        EmbeddingModel::dimension(self)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        EmbeddingModel::embed_one(self, text).await
    }
}
