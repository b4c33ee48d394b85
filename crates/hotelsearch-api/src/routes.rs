//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use hotelsearch_core::config::ServerConfig;
use hotelsearch_core::error::HotelSearchError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/search", post(handlers::search))
        .route("/ingest", post(handlers::ingest))
        .route("/records", put(handlers::put_record))
        .route(
            "/records/{id}",
            get(handlers::get_record).delete(handlers::delete_record),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured host and port.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), HotelSearchError> {
    let addr = format!("{}:{}", config.host, config.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HotelSearchError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| HotelSearchError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
