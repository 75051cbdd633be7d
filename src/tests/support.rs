//! Shared fixtures: corpus entries and fake embedding providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::knowledge::{EntryKind, KnowledgeEntry};
use crate::semantic::{EmbedOptions, Embedder, EmbedderFactory, EmbeddingError, RawEmbedding};

/// A law entry with the given tags and embedding.
pub fn law(title: &str, tags: &[&str], embedding: Option<Vec<f32>>) -> KnowledgeEntry {
    KnowledgeEntry {
        id: 0,
        kind: EntryKind::Law,
        title: title.to_string(),
        description: None,
        details: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        reference_link: None,
        embedding,
        benefits: None,
        eligibility: None,
        application: None,
        documents: None,
        level: None,
        category: None,
    }
}

/// Unit vector whose cosine similarity with `[1, 0]` is `score`.
pub fn unit_at(score: f32) -> Vec<f32> {
    vec![score, (1.0 - score * score).sqrt()]
}

/// Returns the same output for every input, or fails every call.
#[derive(Clone)]
pub struct FixedEmbedder {
    output: Option<RawEmbedding>,
    calls: Arc<AtomicUsize>,
}

impl FixedEmbedder {
    pub fn new(output: RawEmbedding) -> Self {
        Self {
            output: Some(output),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn flat(vector: Vec<f32>) -> Self {
        Self::new(RawEmbedding::Flat(vector))
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Embedder for FixedEmbedder {
    fn embed(&self, _text: &str, _options: &EmbedOptions) -> Result<RawEmbedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output
            .clone()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("inference crashed".to_string()))
    }
}

/// Counts factory invocations and embed calls across every embedder it
/// produces.
pub struct CountingFactory {
    embedder: FixedEmbedder,
    inits: Arc<AtomicUsize>,
    fail_first: usize,
    init_delay: Duration,
}

impl CountingFactory {
    pub fn new(embedder: FixedEmbedder) -> Self {
        Self {
            embedder,
            inits: Arc::new(AtomicUsize::new(0)),
            fail_first: 0,
            init_delay: Duration::ZERO,
        }
    }

    /// Make initialization slow enough for concurrent callers to pile up.
    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    /// Fail the first `attempts` initializations.
    pub fn failing_first(mut self, attempts: usize) -> Self {
        self.fail_first = attempts;
        self
    }

    pub fn factory(&self) -> EmbedderFactory {
        let embedder = self.embedder.clone();
        let inits = self.inits.clone();
        let fail_first = self.fail_first;
        let delay = self.init_delay;

        Arc::new(move || {
            let attempt = inits.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(delay);
            if attempt < fail_first {
                return Err(EmbeddingError::InitFailed("model weights missing".to_string()));
            }
            Ok(Arc::new(embedder.clone()) as Arc<dyn Embedder>)
        })
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embedder.calls.load(Ordering::SeqCst)
    }
}

/// Toy model: one one-hot vector per word over a fixed vocabulary, returned
/// unpooled so callers have to mean-pool.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str, _options: &EmbedOptions) -> Result<RawEmbedding, EmbeddingError> {
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| {
                let word = word.to_lowercase();
                self.vocabulary
                    .iter()
                    .map(|term| if *term == word { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();
        Ok(RawEmbedding::Batch(vec![RawEmbedding::Tokens(tokens)]))
    }
}
