pub mod dedup;
pub mod embeddings;
pub mod models;
pub mod ranking;

pub mod prelude {
    pub use super::dedup::Deduplicator;
    pub use super::embeddings::CachedEmbedder;
    pub use super::models::create_model;
    pub use super::ranking::Ranker;
    pub use nr_core::{ArticleRecord, EmbeddingModel, Error, Result, SortOrder};
}

pub use dedup::Deduplicator;
pub use embeddings::CachedEmbedder;
pub use models::{create_model, HashingModel, HttpEmbeddingModel};
pub use ranking::{lexical_score, semantic_score, Ranker};
