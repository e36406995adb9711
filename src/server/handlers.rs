//! Request handlers for the editor API.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::ApiError;
use super::AppState;
use crate::models::{EditRequest, SceneRewrite, SceneSnapshot, TurnRequest};
use crate::services::encode_event;
use crate::ScriptError;

/// POST /api/chat - stream one conversational turn
///
/// Text fragments are written raw; each suggestion is one JSON envelope.
/// A failure after streaming has begun aborts the body.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.messages.is_empty() {
        return Err(ScriptError::Validation("At least one message is required".to_string()).into());
    }
    info!(
        messages = request.messages.len(),
        scenes = request.referenced_scenes.len(),
        "Chat turn requested"
    );

    let events = state
        .dispatcher
        .dispatch(&request.messages, request.referenced_scenes)
        .await?;

    let body = events.map(|item| {
        item.map(|event| encode_event(&event)).inspect_err(|e| {
            warn!("Aborting chat stream: {}", e);
        })
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

/// POST /api/edit - rewrite one scene
pub async fn edit(
    State(state): State<AppState>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<SceneRewrite>, ApiError> {
    let Json(request) = payload?;
    if request.scene_id.trim().is_empty() {
        return Err(ScriptError::Validation("sceneId is required".to_string()).into());
    }

    let scene = SceneSnapshot {
        content: request.original_content,
        tag: request.original_tag,
    };
    let instruction = request.user_prompt.unwrap_or_default();
    let rewrite = state.suggestions.request_edit(&scene, &instruction).await?;
    info!(scene_id = %request.scene_id, "Edit suggestion produced");
    Ok(Json(rewrite))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.backend_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
