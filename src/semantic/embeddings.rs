//! Embedding providers.
//!
//! - [`Embedder`]: text -> raw model output, shared freely across requests
//! - [`FastEmbedder`]: local fastembed model with configurable cache directory
//!
//! Providers return [`RawEmbedding`] rather than a flat vector; callers run
//! the output through [`normalize`](super::normalize::normalize).

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use super::normalize::RawEmbedding;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Pooling the caller asks the provider to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pooling {
    #[default]
    Mean,
}

/// Options passed along with every embedding request.
///
/// These are requests, not guarantees: a provider may ignore them and return
/// unpooled token vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    pub pooling: Pooling,
    pub normalize: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            pooling: Pooling::Mean,
            normalize: true,
        }
    }
}

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Model download timed out after {0} seconds")]
    DownloadTimeout(u64),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// A text embedding function.
///
/// Implementations are constructed once per process and then shared; `embed`
/// must not depend on per-call mutable state visible to other callers.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str, options: &EmbedOptions) -> Result<RawEmbedding, EmbeddingError>;

    fn embed_batch(
        &self,
        texts: &[String],
        options: &EmbedOptions,
    ) -> Result<Vec<RawEmbedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text, options)).collect()
    }
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl FastEmbedder {
    /// Load the named model, downloading it into `cache_dir/models` on
    /// first use.
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;
        let timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let (model, dimensions) = within_timeout(timeout, move || {
            let mut model = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;
            let dimensions = Self::probe_dimensions(&mut model)?;
            Ok((model, dimensions))
        })?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn run(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" | "allminiml6v2q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
            }
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-base-en-v1.5-q" | "bgebaseenv15q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5 (add -q suffix for quantized)",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

/// Run `load` on its own thread and give up after `timeout`.
///
/// A load that times out keeps running in the background until fastembed
/// returns; its result is discarded.
fn within_timeout<T, F>(timeout: Duration, load: F) -> Result<T, EmbeddingError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EmbeddingError> + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("model-load".into())
        .spawn(move || {
            let _ = tx.send(load());
        })
        .map_err(|e| EmbeddingError::InitFailed(format!("Failed to spawn model loader: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
            Err(EmbeddingError::DownloadTimeout(timeout.as_secs()))
        }
        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => Err(EmbeddingError::InitFailed(
            "model loader exited without a result".to_string(),
        )),
    }
}

impl Embedder for FastEmbedder {
    /// fastembed pools and L2-normalizes itself, so the options are already
    /// satisfied. The output is a batch holding one pooled document vector.
    fn embed(&self, text: &str, _options: &EmbedOptions) -> Result<RawEmbedding, EmbeddingError> {
        let rows = self.run(vec![text])?;
        if rows.is_empty() {
            return Err(EmbeddingError::EmbeddingFailed("No embedding returned".to_string()));
        }
        Ok(RawEmbedding::Batch(rows.into_iter().map(RawEmbedding::Flat).collect()))
    }

    fn embed_batch(
        &self,
        texts: &[String],
        _options: &EmbedOptions,
    ) -> Result<Vec<RawEmbedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let rows = self.run(texts.iter().map(String::as_str).collect())?;
        if rows.len() != texts.len() {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                rows.len()
            )));
        }
        Ok(rows.into_iter().map(RawEmbedding::Flat).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::normalize::normalize;

    #[test]
    #[ignore = "requires model download"]
    fn test_model_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let model = FastEmbedder::new("all-MiniLM-L6-v2", temp_dir.path().to_path_buf(), None)
            .unwrap();
        assert_eq!(model.name(), "all-MiniLM-L6-v2");
        assert_eq!(model.dimensions(), 384);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embedding_normalizes_to_model_dimension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let model = FastEmbedder::new("all-MiniLM-L6-v2", temp_dir.path().to_path_buf(), None)
            .unwrap();

        let raw = model.embed("Right to information", &EmbedOptions::default()).unwrap();
        assert!(matches!(&raw, RawEmbedding::Batch(items)
            if items.len() == 1 && matches!(items[0], RawEmbedding::Flat(_))));
        let vector = normalize(raw).unwrap();
        assert_eq!(vector.len(), 384);

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_invalid_model_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = FastEmbedder::new("nonexistent-model", temp_dir.path().to_path_buf(), None);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[test]
    fn test_slow_model_load_times_out() {
        let result = within_timeout(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert!(matches!(result, Err(EmbeddingError::DownloadTimeout(0))));
    }

    #[test]
    fn test_model_load_within_timeout_returns_result() {
        let loaded = within_timeout(Duration::from_secs(5), || Ok(384usize)).unwrap();
        assert_eq!(loaded, 384);

        let failed = within_timeout(Duration::from_secs(5), || {
            Err::<(), _>(EmbeddingError::InitFailed("weights missing".into()))
        });
        assert!(matches!(failed, Err(EmbeddingError::InitFailed(_))));
    }

    #[test]
    fn test_default_options_request_mean_pooling() {
        let options = EmbedOptions::default();
        assert_eq!(options.pooling, Pooling::Mean);
        assert!(options.normalize);
    }

    #[test]
    fn test_default_embed_batch_calls_embed_per_text() {
        struct Lengths;
        impl Embedder for Lengths {
            fn embed(&self, text: &str, _: &EmbedOptions) -> Result<RawEmbedding, EmbeddingError> {
                Ok(RawEmbedding::Flat(vec![text.len() as f32]))
            }
        }

        let texts = vec!["a".to_string(), "abc".to_string()];
        let out = Lengths.embed_batch(&texts, &EmbedOptions::default()).unwrap();
        assert_eq!(out, vec![RawEmbedding::Flat(vec![1.0]), RawEmbedding::Flat(vec![3.0])]);
    }
}
