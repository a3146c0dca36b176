use std::fmt;

use async_trait::async_trait;
use nr_core::{normalize, ArticleRecord, Error, NewsProvider, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{ensure_success, get_json, parse_base_url};

pub const NAME: &str = "newsapi";
pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    url_to_image: Option<String>,
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

/// NewsAPI `/v2/everything`.
#[derive(Clone)]
pub struct NewsApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    page_size: u32,
}

impl fmt::Debug for NewsApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsApiProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl NewsApiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 20,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, keyword: &str) -> Result<Vec<ArticleRecord>> {
        let page_size = self.page_size.to_string();
        let request = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[
                ("q", keyword),
                ("apiKey", self.api_key.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ]);

        let (status, response) = get_json::<NewsApiResponse>(NAME, request).await?;
        if response.status.as_deref() == Some("error") {
            return Err(Error::Provider(format!(
                "{}: {}",
                NAME,
                response.message.as_deref().unwrap_or("unknown error")
            )));
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
                    item.url_to_image.as_deref(),
                )
            })
            .collect();
        tracing::debug!(provider = NAME, count = articles.len(), "fetched articles");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_maps_articles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("q", "gasoline"))
            .and(query_param("apiKey", "newsapi-key"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 1,
                "articles": [{
                    "source": { "id": null, "name": "Reuters" },
                    "title": "Gasoline demand slips",
                    "description": "US gasoline demand fell last week.",
                    "url": "https://example.com/demand",
                    "urlToImage": "https://example.com/demand.png",
                    "publishedAt": "2024-05-02T08:30:00Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = NewsApiProvider::new("newsapi-key").with_base_url(&server.uri()).unwrap();
        let articles = provider.fetch("gasoline").await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, "REUTERS");
        assert_eq!(articles[0].summary, "US gasoline demand fell last week.");
        assert_eq!(articles[0].image, "https://example.com/demand.png");
    }

    #[tokio::test]
    async fn test_error_status_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid"
            })))
            .mount(&server)
            .await;

        let provider = NewsApiProvider::new("nope").with_base_url(&server.uri()).unwrap();
        let err = provider.fetch("gasoline").await.unwrap_err();
        assert!(err.to_string().contains("Your API key is invalid"));
    }

    #[tokio::test]
    async fn test_missing_articles_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&server)
            .await;

        let provider = NewsApiProvider::new("k").with_base_url(&server.uri()).unwrap();
        assert!(provider.fetch("gasoline").await.unwrap().is_empty());
    }
}
