//! HTTP fetchers for the supported news APIs.
//!
//! Every provider maps its own JSON shape through [`nr_core::normalize`], so the
//! rest of the pipeline only ever sees canonical `ArticleRecord`s.

use std::sync::Arc;

use nr_core::config::ProviderKeys;
use nr_core::{Error, NewsProvider, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

pub mod gnews;
pub mod newsapi;
pub mod newsdata;

pub use gnews::GNewsProvider;
pub use newsapi::NewsApiProvider;
pub use newsdata::NewsDataProvider;

/// Names of every provider this crate knows, in registration order.
pub const PROVIDER_NAMES: [&str; 3] = [newsdata::NAME, newsapi::NAME, gnews::NAME];

/// Build the providers that have an API key, in registration order.
pub fn providers_from_keys(keys: &ProviderKeys) -> Vec<Arc<dyn NewsProvider>> {
    let mut providers: Vec<Arc<dyn NewsProvider>> = Vec::new();
    if let Some(key) = present(&keys.newsdata) {
        providers.push(Arc::new(NewsDataProvider::new(key)));
    }
    if let Some(key) = present(&keys.newsapi) {
        providers.push(Arc::new(NewsApiProvider::new(key)));
    }
    if let Some(key) = present(&keys.gnews) {
        providers.push(Arc::new(GNewsProvider::new(key)));
    }
    providers
}

fn present(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<String> {
    let parsed = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid provider URL '{}': {}", base_url, e)))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Send the request and decode the body, keeping the HTTP status so callers can
/// read provider error payloads that arrive with a 4xx.
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<(StatusCode, T)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(parsed) => Ok((status, parsed)),
        Err(_) if !status.is_success() => {
            Err(Error::Provider(format!("{} returned HTTP {}", provider, status)))
        }
        Err(e) => Err(Error::Provider(format!("{} sent an unreadable response: {}", provider, e))),
    }
}

pub(crate) fn ensure_success(provider: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Provider(format!("{} returned HTTP {}", provider, status)))
    }
}
