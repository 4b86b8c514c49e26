//! Router assembly.
//!
//! Binds the WebSocket endpoint and health check, and serves the static
//! web client (an external collaborator of this server) from `STATIC_DIR`
//! when present.

pub mod ws;

use std::path::PathBuf;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_service = ServeDir::new(static_dir()).append_index_html_on_directories(true);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
        .fallback_service(static_service)
}

/// Directory served at `/`. The canvas UI lives outside this repository;
/// point `STATIC_DIR` at its build output to serve it alongside the API.
fn static_dir() -> PathBuf {
    std::env::var("STATIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("public"))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
