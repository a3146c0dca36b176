//! Cached access to the embedding model.
//!
//! [`CachedEmbedder`] is the single object through which article texts and
//! search keywords are embedded. Vectors are cached by exact text in a bounded
//! LRU cache shared by every request; concurrent lookups of the same text are
//! coalesced so the model runs at most once per key.

use std::fmt;
use std::sync::Arc;

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use nr_core::{ArticleRecord, EmbeddingModel, EmbeddingStore, Error, Result};

pub struct CachedEmbedder {
    model: Arc<dyn EmbeddingModel>,
    cache: Cache<String, Arc<Vec<f32>>>,
    store: Option<Arc<dyn EmbeddingStore>>,
}

impl fmt::Debug for CachedEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedEmbedder")
            .field("model", &self.model.name())
            .field("capacity", &self.cache.policy().max_capacity())
            .field("store", &self.store.as_ref().map(|_| "<dyn EmbeddingStore>"))
            .finish()
    }
}

impl CachedEmbedder {
    pub fn new(model: Arc<dyn EmbeddingModel>, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            model,
            cache,
            store: None,
        }
    }

    /// Read through to (and write back into) a persistent store on cache misses.
    pub fn with_store(mut self, store: Arc<dyn EmbeddingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub async fn embed(&self, text: &str) -> Result<Arc<Vec<f32>>> {
        let model = self.model.clone();
        let store = self.store.clone();
        let owned = text.to_string();

        self.cache
            .try_get_with(text.to_string(), async move {
                compute(model.as_ref(), store.as_deref(), &owned).await.map(Arc::new)
            })
            .await
            .map_err(|shared| match Arc::try_unwrap(shared) {
                Ok(err) => err,
                Err(shared) => Error::Embedding(shared.to_string()),
            })
    }

    pub async fn embed_article(&self, article: &ArticleRecord) -> Result<Vec<f32>> {
        let embedding = self.embed(&article.embedding_text()).await?;
        Ok(embedding.as_ref().clone())
    }

    pub fn contains(&self, text: &str) -> bool {
        self.cache.contains_key(text)
    }

    /// Number of cached vectors once pending evictions have been applied.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

async fn compute(
    model: &dyn EmbeddingModel,
    store: Option<&dyn EmbeddingStore>,
    text: &str,
) -> Result<Vec<f32>> {
    if let Some(store) = store {
        match store.get(text).await {
            Ok(Some(embedding)) if embedding.len() == model.dimension() => {
                tracing::debug!(len = text.len(), "embedding served from persistent store");
                return Ok(embedding);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "embedding store lookup failed"),
        }
    }

    let embedding = model.embed(text).await?;
    if embedding.len() != model.dimension() {
        return Err(Error::Embedding(format!(
            "{} returned a vector of length {}, expected {}",
            model.name(),
            embedding.len(),
            model.dimension()
        )));
    }

    if let Some(store) = store {
        if let Err(e) = store.put(text, &embedding).await {
            tracing::warn!(error = %e, "failed to persist embedding");
        }
    }
    Ok(embedding)
}
