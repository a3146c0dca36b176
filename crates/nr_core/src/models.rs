use async_trait::async_trait;
use std::fmt;
use crate::Result;

#[async_trait]
pub trait EmbeddingModel: Send + Sync + fmt::Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Length of every vector this model returns
    fn dimension(&self) -> usize;

    /// Generate an embedding for a piece of text. Identical text must yield an identical vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
