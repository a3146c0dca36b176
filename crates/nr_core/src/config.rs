//! Tunables for the search pipeline.
//!
//! Every struct has a `Default` matching the production settings and a
//! `validate` that rejects values the pipeline cannot run with.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_EPS: f64 = 0.20;
pub const DEFAULT_MIN_NEIGHBORS: usize = 1;
pub const DEFAULT_CACHE_CAPACITY: u64 = 50_000;
pub const DEFAULT_DIMENSION: usize = 384;

/// Near-duplicate clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Maximum cosine distance for two articles to be neighbours.
    pub eps: f64,
    /// Neighbours (including the point itself) needed to be a core point.
    pub min_neighbors: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.eps) {
            return Err(Error::Config(format!("eps must be within [0, 2], got {}", self.eps)));
        }
        if self.min_neighbors == 0 {
            return Err(Error::Config("min_neighbors must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Weights of the hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub lexical_weight: f64,
    pub semantic_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            lexical_weight: 0.6,
            semantic_weight: 0.4,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lexical_weight < 0.0 || self.semantic_weight < 0.0 {
            return Err(Error::Config("ranking weights must be non-negative".to_string()));
        }
        Ok(())
    }
}

/// Embedding model selection and cache sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    /// `hashing` (offline, default) or `openai` (OpenAI-compatible HTTP API).
    pub model: String,
    /// Base URL of the embeddings API, e.g. `https://api.openai.com/v1`.
    pub model_url: Option<String>,
    /// Remote model identifier, e.g. `text-embedding-3-small`.
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub dimension: usize,
    pub cache_capacity: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: "hashing".to_string(),
            model_url: None,
            model_name: None,
            api_key: None,
            dimension: DEFAULT_DIMENSION,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::Config("embedding dimension must be greater than 0".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config(
                "embedding cache capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to do when article or keyword embeddings cannot be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingFailurePolicy {
    /// Fail the whole search.
    #[default]
    Fail,
    /// Skip deduplication and rank on the lexical subscore alone.
    LexicalOnly,
}

impl std::str::FromStr for EmbeddingFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "lexical-only" | "lexical_only" => Ok(Self::LexicalOnly),
            other => Err(format!("Invalid embedding failure policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub dedup: DedupConfig,
    pub ranking: RankingConfig,
    /// Per-attempt timeout for a single provider fetch.
    pub provider_timeout: Duration,
    /// Extra attempts after a failed or timed-out provider fetch.
    pub provider_retries: u32,
    /// Upper bound on the whole fetch phase.
    pub request_timeout: Duration,
    /// Articles embedded concurrently.
    pub embed_concurrency: usize,
    pub on_embedding_failure: EmbeddingFailurePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dedup: DedupConfig::default(),
            ranking: RankingConfig::default(),
            provider_timeout: Duration::from_secs(10),
            provider_retries: 1,
            request_timeout: Duration::from_secs(30),
            embed_concurrency: 8,
            on_embedding_failure: EmbeddingFailurePolicy::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        self.dedup.validate()?;
        self.ranking.validate()?;
        if self.provider_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(Error::Config("timeouts must be greater than 0".to_string()));
        }
        if self.embed_concurrency == 0 {
            return Err(Error::Config("embed_concurrency must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// API credentials for the news providers. A provider without a key is skipped.
#[derive(Clone, Default)]
pub struct ProviderKeys {
    pub newsdata: Option<String>,
    pub newsapi: Option<String>,
    pub gnews: Option<String>,
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_deref().map(|_| "<redacted>");
        f.debug_struct("ProviderKeys")
            .field("newsdata", &redact(&self.newsdata))
            .field("newsapi", &redact(&self.newsapi))
            .field("gnews", &redact(&self.gnews))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.dedup.eps, 0.20);
        assert_eq!(config.dedup.min_neighbors, 1);
        assert_eq!(config.ranking.lexical_weight, 0.6);
        assert_eq!(config.ranking.semantic_weight, 0.4);
        assert_eq!(config.provider_retries, 1);
        assert_eq!(config.on_embedding_failure, EmbeddingFailurePolicy::Fail);
        assert!(config.validate().is_ok());

        let inference = InferenceConfig::default();
        assert_eq!(inference.cache_capacity, 50_000);
        assert!(inference.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dedup = DedupConfig { eps: -0.1, ..Default::default() };
        assert!(dedup.validate().is_err());

        let dedup = DedupConfig { min_neighbors: 0, ..Default::default() };
        assert!(dedup.validate().is_err());

        let config = SearchConfig {
            embed_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SearchConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let inference = InferenceConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(inference.validate().is_err());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("fail".parse::<EmbeddingFailurePolicy>().unwrap(), EmbeddingFailurePolicy::Fail);
        assert_eq!(
            "lexical-only".parse::<EmbeddingFailurePolicy>().unwrap(),
            EmbeddingFailurePolicy::LexicalOnly
        );
        assert!("retry".parse::<EmbeddingFailurePolicy>().is_err());
    }

    #[test]
    fn test_provider_keys_debug_redacts() {
        let keys = ProviderKeys {
            gnews: Some("secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", keys);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
