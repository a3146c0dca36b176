use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/providers", get(handlers::list_providers))
        .route("/api/search", get(handlers::search))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve the API until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> nr_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use nr_core::{ArticleRecord, Error, Result};
}
