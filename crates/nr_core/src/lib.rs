pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod relevance;
pub mod similarity;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::EmbeddingModel;
pub use normalize::normalize;
pub use provider::NewsProvider;
pub use relevance::is_relevant;
pub use similarity::{cosine_distance, cosine_similarity};
pub use storage::EmbeddingStore;
pub use types::{ArticleRecord, ProviderReport, SearchOutcome, SortOrder};
