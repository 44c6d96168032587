//! Forum creation. Validation beyond what the realtime path needs lives in
//! the CRUD service; this endpoint exists to emit the `forum_created` event.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::Forum;
use crate::realtime::envelope::Envelope;
use crate::store::NewForum;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/forums", post(create_forum))
}

#[derive(Debug, Deserialize)]
pub struct CreateForumRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

async fn create_forum(
    State(state): State<AppState>,
    Json(body): Json<CreateForumRequest>,
) -> Result<(StatusCode, Json<Forum>), ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let forum = state
        .store
        .create_forum(NewForum {
            title: title.to_string(),
            description: body.description.trim().to_string(),
        })
        .await?;

    state
        .rooms
        .broadcast(forum.id, &Envelope::forum_created(&forum))
        .await;

    Ok((StatusCode::CREATED, Json(forum)))
}
