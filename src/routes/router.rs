use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers::{handle_rx_signal, health};

pub fn create_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/rx-signal", get(handle_rx_signal))
        .layer(TraceLayer::new_for_http())
        // CORS для локального дев-сервера фронтенда
        .layer(CorsLayer::permissive())
        .with_state(config)
}
