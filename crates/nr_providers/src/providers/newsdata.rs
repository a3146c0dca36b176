use std::fmt;

use async_trait::async_trait;
use nr_core::{normalize, ArticleRecord, Error, NewsProvider, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{ensure_success, get_json, parse_base_url};

pub const NAME: &str = "newsdata";
pub const DEFAULT_BASE_URL: &str = "https://newsdata.io";

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    status: Option<String>,
    // an object describing the failure when status is "error"
    results: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    title: Option<String>,
    link: Option<String>,
    source_id: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image_url: Option<String>,
}

/// NewsData.io `/api/1/news`.
#[derive(Clone)]
pub struct NewsDataProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for NewsDataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsDataProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl NewsDataProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }
}

#[async_trait]
impl NewsProvider for NewsDataProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, keyword: &str) -> Result<Vec<ArticleRecord>> {
        let request = self
            .client
            .get(format!("{}/api/1/news", self.base_url))
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("q", keyword),
                ("language", "en"),
            ]);

        let (status, response) = get_json::<NewsDataResponse>(NAME, request).await?;
        if response.status.as_deref() == Some("error") {
            let detail = response
                .results
                .as_ref()
                .and_then(|r| r.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(Error::Provider(format!("{}: {}", NAME, detail)));
        }
        ensure_success(NAME, status)?;

        let items: Vec<NewsDataArticle> = match response.results {
            Some(results @ serde_json::Value::Array(_)) => serde_json::from_value(results)?,
            _ => Vec::new(),
        };

        let articles: Vec<ArticleRecord> = items
            .into_iter()
            .map(|item| {
                normalize(
                    item.title.as_deref(),
                    item.link.as_deref(),
                    item.source_id.as_deref(),
                    item.description.as_deref(),
                    item.pub_date.as_deref(),
                    item.image_url.as_deref(),
                )
            })
            .collect();
        tracing::debug!(provider = NAME, count = articles.len(), "fetched articles");
        Ok(articles)
    }
}
