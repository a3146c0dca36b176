use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use nr_core::{ArticleRecord, Error, ProviderReport, SortOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub order: Option<String>,
    /// Comma-separated source names to keep.
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub keyword: String,
    pub total: usize,
    pub unique_sources: usize,
    pub average_score: f64,
    pub articles: Vec<ArticleRecord>,
    pub providers: Vec<ProviderReport>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .manager
            .provider_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let keyword = params.q.as_deref().map(str::trim).unwrap_or_default();
    if keyword.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query parameter 'q' is required"));
    }

    let order = match params.order.as_deref() {
        Some(order) => order
            .parse::<SortOrder>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
        None => SortOrder::default(),
    };

    let mut outcome = state.manager.search_with(keyword, order).await.map_err(|e| {
        tracing::error!(error = %e, keyword, "search failed");
        let status = match e {
            Error::Embedding(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, e.to_string())
    })?;

    let sources: Vec<&str> = params
        .source
        .as_deref()
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    outcome.retain_sources(&sources);

    Ok(Json(SearchResponse {
        total: outcome.articles.len(),
        unique_sources: outcome.unique_sources(),
        average_score: outcome.average_score(),
        keyword: outcome.keyword,
        articles: outcome.articles,
        providers: outcome.providers,
    }))
}
