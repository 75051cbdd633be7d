//! Semantic search service over the loaded knowledge base.
//!
//! Provides the request-time interface:
//! - Lazily constructs the shared embedding model on first search
//! - Embeds and normalizes the query, then ranks the corpus
//! - Serves tag-based recommendations from the same corpus

use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;

use crate::config::Config;
use crate::knowledge::{self, Corpus, KnowledgeBaseError, KnowledgeEntry};
use crate::semantic::embeddings::{EmbedOptions, Embedder, EmbeddingError, FastEmbedder};
use crate::semantic::normalize::{normalize, EmbeddingShapeError};
use crate::semantic::rank::{rank_by_similarity, RankOptions, SearchHit};
use crate::semantic::recommend::{recommend, Recommendation, UserProfile};

/// Errors that fail a single search request.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search unavailable: {0}")]
    SearchUnavailable(#[from] EmbeddingError),

    #[error("Unexpected embedding shape: {0}")]
    UnexpectedEmbeddingShape(#[from] EmbeddingShapeError),
}

/// Builds the embedding function. Runs at most once per successful
/// initialization, on the blocking pool.
pub type EmbedderFactory =
    Arc<dyn Fn() -> Result<Arc<dyn Embedder>, EmbeddingError> + Send + Sync>;

/// Status snapshot for health reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceStatus {
    pub entries: usize,
    pub searchable: usize,
    pub degraded: bool,
    pub dimensions: Option<usize>,
    pub embedder_ready: bool,
}

/// Service answering search and recommendation requests.
///
/// The corpus is read-only and shared without locking. The embedder is
/// created on first use: concurrent first searches wait on the same
/// initialization, and a failed initialization is retried by the next
/// request.
pub struct SearchService {
    corpus: Arc<Corpus>,
    options: RankOptions,
    recommend_limit: usize,
    factory: EmbedderFactory,
    embedder: Arc<OnceCell<Arc<dyn Embedder>>>,
}

impl SearchService {
    pub fn new(
        corpus: Arc<Corpus>,
        options: RankOptions,
        recommend_limit: usize,
        factory: EmbedderFactory,
    ) -> Self {
        Self {
            corpus,
            options,
            recommend_limit,
            factory,
            embedder: Arc::new(OnceCell::new()),
        }
    }

    /// Load the knowledge base and wire up the fastembed model from config.
    pub fn from_config(config: &Config) -> Result<Self, KnowledgeBaseError> {
        let corpus = knowledge::load(&config.knowledge_base, config.base_path())?;
        log::info!(
            "Knowledge base ready: {} entries ({} searchable)",
            corpus.len(),
            corpus.searchable_len()
        );

        let model = config.search.model.clone();
        let cache_dir = config.base_path().to_path_buf();
        let timeout = Duration::from_secs(config.search.download_timeout_secs);
        let factory: EmbedderFactory = Arc::new(move || {
            let embedder = FastEmbedder::new(&model, cache_dir.clone(), Some(timeout))?;
            log::info!("Loaded {} ({} dimensions)", embedder.name(), embedder.dimensions());
            Ok(Arc::new(embedder) as Arc<dyn Embedder>)
        });

        Ok(Self::new(
            Arc::new(corpus),
            config.search.rank_options(),
            config.search.recommend_limit,
            factory,
        ))
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn options(&self) -> &RankOptions {
        &self.options
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            entries: self.corpus.len(),
            searchable: self.corpus.searchable_len(),
            degraded: self.corpus.is_degraded(),
            dimensions: self.corpus.dimensions(),
            embedder_ready: self.embedder.get().is_some(),
        }
    }

    /// Search the knowledge base for `query`.
    ///
    /// A blank query returns no results without touching the model.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        if self.corpus.is_degraded() || self.corpus.is_empty() {
            log::debug!("knowledge base empty or unavailable, returning no results");
            return Ok(vec![]);
        }

        let query_vector = self.embed_query(query).await?;
        let hits = rank_by_similarity(self.corpus.entries(), &query_vector, &self.options);

        log::debug!("query {:?}: {} results", query, hits.len());
        Ok(hits)
    }

    /// Look up an entry by its corpus position.
    pub fn entry(&self, id: usize) -> Option<&KnowledgeEntry> {
        self.corpus.get(id)
    }

    /// Recommend entries for a user profile by tag overlap.
    pub fn recommend(&self, profile: &UserProfile) -> Vec<Recommendation> {
        recommend(self.corpus.entries(), profile, self.recommend_limit)
    }

    /// Force initialization of the embedding model.
    ///
    /// Normally this happens lazily on the first search.
    pub async fn initialize(&self) -> Result<(), SearchError> {
        self.embedder().await?;
        Ok(())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, SearchError> {
        let embedder = self.embedder().await?;
        let text = query.to_string();

        let raw = tokio::task::spawn_blocking(move || embedder.embed(&text, &EmbedOptions::default()))
            .await
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("inference task failed: {e}")))??;

        Ok(normalize(raw)?)
    }

    /// The cell is filled on the blocking pool, so an initialization keeps
    /// running and remains the only one even if the caller that started it is
    /// dropped. Later callers block on the same cell until it completes.
    async fn embedder(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        if let Some(embedder) = self.embedder.get() {
            return Ok(embedder.clone());
        }

        let cell = self.embedder.clone();
        let factory = self.factory.clone();
        tokio::task::spawn_blocking(move || {
            cell.get_or_try_init(|| {
                log::info!("Initializing embedding model");
                let started = Instant::now();

                let embedder = factory()
                    .inspect_err(|e| log::error!("Failed to initialize embedding model: {e}"))?;

                log::info!(
                    "Embedding model ready in {:.2}s",
                    started.elapsed().as_secs_f32()
                );
                Ok::<_, EmbeddingError>(embedder)
            })
            .cloned()
        })
        .await
        .map_err(|e| EmbeddingError::InitFailed(format!("initialization task failed: {e}")))?
    }
}
