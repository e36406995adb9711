//! HTTP surface: turn submission, edit submission, health.

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::services::{Dispatcher, SuggestionService};
use crate::ScriptError;

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub suggestions: Arc<dyn SuggestionService>,
    pub backend_name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/edit", post(handlers::edit))
        .route("/api/health", get(handlers::health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, state: AppState) -> Result<(), ScriptError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Scene editor API listening on http://{}", addr);
    info!("  POST /api/chat    - Stream a chat turn");
    info!("  POST /api/edit    - Rewrite one scene");
    info!("  GET  /api/health  - Liveness");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
