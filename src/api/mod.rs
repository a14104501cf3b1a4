mod dto;
mod error;
mod handlers;
mod state;

pub use state::AppState;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Build the application router
pub fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let landing = ServeFile::new(server.static_dir.join(&server.landing_page));

    Router::new()
        .route_service("/", landing)
        .route(
            "/api/data",
            get(handlers::get_data).post(handlers::save_data),
        )
        .route("/data", get(handlers::get_data).post(handlers::save_data))
        .route("/health", get(handlers::health))
        .fallback_service(ServeDir::new(&server.static_dir))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
