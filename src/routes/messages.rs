//! Forum message posting.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::{can_post_as, AuthUser};
use crate::error::ApiError;
use crate::models::Message;
use crate::realtime::envelope::Envelope;
use crate::store::NewMessage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/forums/{id}/messages", post(post_message))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}

async fn post_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(forum_id): Path<i64>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let author = body.author.trim();
    let content = body.content.trim();
    if author.is_empty() || content.is_empty() {
        return Err(ApiError::bad_request("Author and content are required"));
    }

    if !can_post_as(&identity, author) {
        return Err(ApiError::forbidden("Cannot post under another author's name"));
    }

    // Persist first; only a stored message is ever broadcast.
    let message = state
        .store
        .create_message(NewMessage {
            forum_id,
            author: author.to_string(),
            content: content.to_string(),
        })
        .await?;

    state
        .rooms
        .broadcast(forum_id, &Envelope::message_created(&message))
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}
