//! Global chat posting over HTTP.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::store::NewGlobalMessage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/global-chat", post(post_global_message))
}

#[derive(Debug, Deserialize)]
pub struct GlobalChatRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct GlobalChatResponse {
    pub id: i64,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

async fn post_global_message(
    State(state): State<AppState>,
    Json(body): Json<GlobalChatRequest>,
) -> Result<(StatusCode, Json<GlobalChatResponse>), ApiError> {
    let username = body.username.trim();
    let text = body.text.trim();
    if username.is_empty() || text.is_empty() {
        return Err(ApiError::bad_request("Username and text are required"));
    }

    // Persist-then-broadcast: a message the store rejected never reaches the
    // hub, and only the poster learns about the failure.
    let stored = state
        .store
        .create_global_message(NewGlobalMessage {
            author: username.to_string(),
            content: text.to_string(),
        })
        .await?;

    let response = GlobalChatResponse {
        id: stored.id,
        username: stored.author.clone(),
        text: stored.content.clone(),
        timestamp: stored.created_at,
    };

    if state.global.submit(stored).await.is_err() {
        return Err(ApiError::internal("Chat is shutting down"));
    }

    Ok((StatusCode::CREATED, Json(response)))
}
