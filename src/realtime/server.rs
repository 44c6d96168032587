//! WebSocket upgrade handlers and per-connection socket tasks.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use crate::store::NewGlobalMessage;
use crate::AppState;

use super::connection::Connection;
use super::envelope::{ChatFrame, ChatPost, Envelope};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/{forum_id}", get(forum_ws_upgrade))
        .route("/ws/global", get(global_ws_upgrade))
}

async fn forum_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(forum_id): Path<i64>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_forum_socket(socket, state, forum_id))
}

async fn global_ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_global_socket(socket, state))
}

/// Socket task for a per-forum room. Inbound frames are liveness only; all
/// application traffic flows outward through the room registry.
async fn run_forum_socket(socket: WebSocket, state: AppState, forum_id: i64) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (conn, mut outbound) = Connection::channel();
    let conn_id = conn.id();
    state.rooms.register(forum_id, conn);

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // The registry dropped us after a send failure.
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        tracing::debug!(?err, forum_id, conn_id, "room ws read error");
                        break;
                    }
                }
            }
        }
    }

    state.rooms.unregister(forum_id, conn_id);
    tracing::info!(forum_id, conn_id, "room client disconnected");
}

/// Socket task for the global chat. Registers, backfills history, then
/// forwards live frames; inbound text frames are chat posts.
async fn run_global_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Register before backfilling so no live message can slip between the
    // history read and the first live frame. Live traffic queues on the
    // connection channel and is only drained after backfill completes below,
    // so the client always sees history first.
    let (conn, mut outbound) = Connection::channel();
    let conn_id = conn.id();
    state.global.register(conn);

    if !send_backfill(&state, &mut ws_tx).await {
        state.global.unregister(conn_id);
        return;
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound_post(&state, &mut ws_tx, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        tracing::debug!(?err, conn_id, "global ws read error");
                        break;
                    }
                }
            }
        }
    }

    state.global.unregister(conn_id);
    tracing::info!(conn_id, "global chat client disconnected");
}

/// Write the recent history to a fresh connection, oldest first. Returns
/// false if the socket died mid-backfill.
async fn send_backfill(state: &AppState, ws_tx: &mut SplitSink<WebSocket, Message>) -> bool {
    let history = match state.store.global_history(state.config.history_limit).await {
        Ok(history) => history,
        Err(err) => {
            // The client just misses backfill; live traffic still flows.
            tracing::error!(%err, "failed to load global chat history");
            return true;
        }
    };

    for msg in &history {
        let frame = match serde_json::to_string(&ChatFrame::from(msg)) {
            Ok(f) => f,
            Err(err) => {
                tracing::error!(?err, "failed to serialize history entry");
                continue;
            }
        };
        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
            return false;
        }
    }
    true
}

/// Validate, persist, and enqueue a chat post read off the global socket.
/// Failures are reported to the posting socket only.
async fn handle_inbound_post(
    state: &AppState,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    text: &str,
) {
    let post: ChatPost = match serde_json::from_str(text) {
        Ok(p) => p,
        Err(_) => {
            send_error(ws_tx, "Invalid JSON format").await;
            return;
        }
    };

    if post.username.trim().is_empty() || post.text.trim().is_empty() {
        send_error(ws_tx, "Username and text are required").await;
        return;
    }

    let stored = match state
        .store
        .create_global_message(NewGlobalMessage {
            author: post.username.trim().to_string(),
            content: post.text.trim().to_string(),
        })
        .await
    {
        Ok(stored) => stored,
        Err(err) => {
            tracing::error!(%err, "failed to persist global chat message");
            send_error(ws_tx, "Failed to save message").await;
            return;
        }
    };

    if state.global.submit(stored).await.is_err() {
        send_error(ws_tx, "Chat is shutting down").await;
    }
}

async fn send_error(ws_tx: &mut SplitSink<WebSocket, Message>, message: &str) {
    if let Ok(frame) = serde_json::to_string(&Envelope::error(message)) {
        let _ = ws_tx.send(Message::Text(frame.into())).await;
    }
}
