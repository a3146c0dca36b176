use std::fmt;

use async_trait::async_trait;
use nr_core::{normalize, ArticleRecord, Error, NewsProvider, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{ensure_success, get_json, parse_base_url};

pub const NAME: &str = "gnews";
pub const DEFAULT_BASE_URL: &str = "https://gnews.io";

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GNewsArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    image: Option<String>,
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

/// GNews `/api/v4/search`, newest first.
#[derive(Clone)]
pub struct GNewsProvider {
    client: Client,
    api_key: String,
    base_url: String,
    country: String,
    max: u32,
}

impl fmt::Debug for GNewsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GNewsProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("country", &self.country)
            .field("max", &self.max)
            .finish()
    }
}

impl GNewsProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            country: "us".to_string(),
            max: 10,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }
}

#[async_trait]
impl NewsProvider for GNewsProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, keyword: &str) -> Result<Vec<ArticleRecord>> {
        let max = self.max.to_string();
        let request = self
            .client
            .get(format!("{}/api/v4/search", self.base_url))
            .query(&[
                ("token", self.api_key.as_str()),
                ("q", keyword),
                ("lang", "en"),
                ("country", self.country.as_str()),
                ("sortby", "publishedAt"),
                ("max", max.as_str()),
            ]);

        let (status, response) = get_json::<GNewsResponse>(NAME, request).await?;
        if let Some(errors) = response.errors {
            return Err(Error::Provider(format!("{}: {}", NAME, errors)));
        }
        ensure_success(NAME, status)?;

        let articles: Vec<ArticleRecord> = response
            .articles
            .into_iter()
            .map(|item| {
                normalize(
                    item.title.as_deref(),
                    item.url.as_deref(),
                    item.source.as_ref().and_then(|s| s.name.as_deref()),
                    item.description.as_deref(),
                    item.published_at.as_deref(),
                    item.image.as_deref(),
                )
            })
            .collect();
        tracing::debug!(provider = NAME, count = articles.len(), "fetched articles");
        Ok(articles)
    }
}
