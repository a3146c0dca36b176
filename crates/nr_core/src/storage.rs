use async_trait::async_trait;
use crate::Result;

/// Persistent backing store for computed embeddings, keyed by the exact text.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Look up a previously stored embedding
    async fn get(&self, text: &str) -> Result<Option<Vec<f32>>>;

    /// Store an embedding, evicting the least recently used entries past capacity
    async fn put(&self, text: &str, embedding: &[f32]) -> Result<()>;

    /// Number of stored embeddings
    async fn len(&self) -> Result<usize>;
}
