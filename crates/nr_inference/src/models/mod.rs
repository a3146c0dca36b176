use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use nr_core::config::InferenceConfig;
use nr_core::{EmbeddingModel, Error, Result};
use std::fmt;

pub mod hashing;

pub use hashing::HashingModel;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for any OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbeddingModel {
    client: Arc<Client>,
    api_key: Option<String>,
    base_url: String,
    model_name: String,
    dimension: usize,
}

impl HttpEmbeddingModel {
    pub fn new(
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: Option<String>,
        dimension: usize,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("embedding dimension must be greater than 0".to_string()));
        }
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_name: model_name.into(),
            dimension,
        })
    }
}

impl fmt::Debug for HttpEmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmbeddingModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model_name,
        };

        let mut builder = self.client
            .post(format!("{}/embeddings", self.base_url))
            .json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await?
            .error_for_status()?
            .json::<EmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("embeddings response contained no data".to_string()))
    }
}

/// Build the embedding model named in the config.
pub fn create_model(config: &InferenceConfig) -> Result<Arc<dyn EmbeddingModel>> {
    config.validate()?;
    match config.model.as_str() {
        "hashing" => Ok(Arc::new(HashingModel::new(config.dimension)?)),
        "openai" => Ok(Arc::new(HttpEmbeddingModel::new(
            config.model_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL),
            config.model_name.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL),
            config.api_key.clone(),
            config.dimension,
        )?)),
        other => Err(Error::Config(format!(
            "Unknown embedding model '{}'. Available models: hashing, openai",
            other
        ))),
    }
}
