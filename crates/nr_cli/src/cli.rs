use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nr_core::config::{
    DedupConfig, EmbeddingFailurePolicy, InferenceConfig, ProviderKeys, SearchConfig,
    DEFAULT_CACHE_CAPACITY, DEFAULT_DIMENSION, DEFAULT_EPS,
};
use nr_core::SortOrder;

use crate::duration::HumanDuration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Search news providers, collapse duplicate stories and rank the rest",
    long_about = None
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[arg(long, env = "NEWSDATA_API_KEY", hide_env_values = true)]
    pub newsdata_api_key: Option<String>,
    #[arg(long, env = "NEWSAPI_API_KEY", hide_env_values = true)]
    pub newsapi_api_key: Option<String>,
    #[arg(long, env = "GNEWS_API_KEY", hide_env_values = true)]
    pub gnews_api_key: Option<String>,
    #[arg(
        long,
        env = "NR_EMBED_MODEL",
        default_value = "hashing",
        help = "Embedding model. Available models: hashing (default), openai"
    )]
    pub model: String,
    /// Base URL of an OpenAI-compatible embeddings API
    #[arg(long, env = "NR_EMBED_URL")]
    pub model_url: Option<String>,
    /// Remote embedding model identifier
    #[arg(long)]
    pub model_name: Option<String>,
    #[arg(long, env = "NR_EMBED_API_KEY", hide_env_values = true)]
    pub embed_api_key: Option<String>,
    #[arg(long, default_value_t = DEFAULT_DIMENSION)]
    pub dimension: usize,
    /// Embeddings kept in memory
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: u64,
    /// Persist embeddings in this SQLite file
    #[arg(long, env = "NR_EMBED_CACHE")]
    pub embed_cache: Option<PathBuf>,
    /// Maximum cosine distance between two articles telling the same story
    #[arg(long, default_value_t = DEFAULT_EPS)]
    pub eps: f64,
    #[arg(long, default_value = "10s")]
    pub provider_timeout: HumanDuration,
    #[arg(long, default_value = "30s")]
    pub request_timeout: HumanDuration,
    #[arg(long, default_value_t = 1)]
    pub retries: u32,
    /// What to do when embeddings cannot be computed: fail or lexical-only
    #[arg(long, default_value = "fail")]
    pub on_embedding_failure: EmbeddingFailurePolicy,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search every configured provider for a keyword
    Search {
        #[arg(required = true, num_args = 1..)]
        keyword: Vec<String>,
        /// desc (best first) or asc
        #[arg(long, default_value = "desc")]
        order: SortOrder,
        /// Only show articles from these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// Write the results as CSV into this directory
        #[arg(long)]
        export: Option<PathBuf>,
        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List known providers and whether they are configured
    Providers,
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

impl Cli {
    pub fn provider_keys(&self) -> ProviderKeys {
        ProviderKeys {
            newsdata: self.newsdata_api_key.clone(),
            newsapi: self.newsapi_api_key.clone(),
            gnews: self.gnews_api_key.clone(),
        }
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: self.model.clone(),
            model_url: self.model_url.clone(),
            model_name: self.model_name.clone(),
            api_key: self.embed_api_key.clone(),
            dimension: self.dimension,
            cache_capacity: self.cache_capacity,
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            dedup: DedupConfig {
                eps: self.eps,
                ..Default::default()
            },
            provider_timeout: self.provider_timeout.0,
            provider_retries: self.retries,
            request_timeout: self.request_timeout.0,
            on_embedding_failure: self.on_embedding_failure,
            ..Default::default()
        }
    }
}
