pub mod forums;
pub mod global_chat;
pub mod health;
pub mod messages;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::realtime::server::router())
        .merge(forums::router())
        .merge(messages::router())
        .merge(global_chat::router())
}
