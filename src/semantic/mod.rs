//! Semantic search over the knowledge base.
//!
//! Local embedding generation via fastembed-rs and a linear cosine scan over
//! the in-memory corpus.
//!
//! # Architecture
//!
//! - `embeddings`: embedding provider trait and fastembed wrapper
//! - `normalize`: flattens raw model output to a single vector
//! - `preprocess`: document text for embedding
//! - `similarity`: cosine similarity with a mismatch sentinel
//! - `rank`: similarity ranking with relevance floor and top-K
//! - `recommend`: tag-overlap ranking for user profiles
//! - `service`: request-time search service

pub mod embeddings;
mod normalize;
mod preprocess;
mod rank;
mod recommend;
mod service;
mod similarity;

pub use embeddings::{EmbedOptions, Embedder, EmbeddingError, FastEmbedder};
pub use normalize::{normalize, RawEmbedding};
pub use preprocess::{content_hash, document_text};
pub use rank::{RankOptions, SearchHit, DEFAULT_MIN_SCORE, DEFAULT_SEARCH_LIMIT};
pub use recommend::{Recommendation, UserProfile, DEFAULT_RECOMMEND_LIMIT};
pub use service::{EmbedderFactory, SearchError, SearchService, ServiceStatus};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
