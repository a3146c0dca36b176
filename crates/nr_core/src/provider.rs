use async_trait::async_trait;
use crate::types::ArticleRecord;
use crate::Result;

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Returns the name of the news provider
    fn name(&self) -> &str;

    /// Fetches articles matching the keyword, already normalized
    async fn fetch(&self, keyword: &str) -> Result<Vec<ArticleRecord>>;
}
