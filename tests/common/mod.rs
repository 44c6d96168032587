//! Shared harness for integration tests: in-memory state, seeded tokens, and
//! a real listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use forum_api::auth::{Identity, StaticTokenAuth};
use forum_api::config::Config;
use forum_api::store::MemoryStore;
use forum_api::{realtime, AppState};

pub const ALICE_TOKEN: &str = "alice-token";
pub const ADMIN_TOKEN: &str = "admin-token";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

/// Start a server with default realtime settings (60 s TTL, 10 s sweep).
pub async fn spawn_server() -> TestServer {
    spawn_server_with(Config::default()).await
}

/// Start a server with custom realtime settings. The store is seeded with
/// nothing; tokens resolve "alice" (user) and "root" (admin).
pub async fn spawn_server_with(config: Config) -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let auth = Arc::new(StaticTokenAuth::new());
    auth.insert(
        ALICE_TOKEN,
        Identity {
            user_id: 1,
            username: "alice".to_string(),
            role: "user".to_string(),
        },
    );
    auth.insert(
        ADMIN_TOKEN,
        Identity {
            user_id: 2,
            username: "root".to_string(),
            role: "admin".to_string(),
        },
    );

    let sweep_interval = config.sweep_interval;
    let (state, hub_inbound) = AppState::new(config, store.clone(), auth);
    realtime::spawn_hub_tasks(state.global.clone(), hub_inbound, sweep_interval);

    let app = forum_api::routes::router().with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state, store }
}

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a WebSocket to the given path (e.g. `/ws/1`, `/ws/global`).
pub async fn connect_ws(addr: SocketAddr, path: &str) -> WsClient {
    let url = format!("ws://{addr}{path}");
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws_stream
}

/// Read the next text frame as JSON, failing after `timeout`.
pub async fn next_json(ws: &mut WsClient, timeout: Duration) -> serde_json::Value {
    let msg = tokio::time::timeout(timeout, ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("ws read error");
    let text = msg.into_text().expect("not a text frame");
    serde_json::from_str(&text).expect("frame is not JSON")
}

/// Assert that no frame arrives within `window`.
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    let result = tokio::time::timeout(window, ws.next()).await;
    assert!(result.is_err(), "expected no frame, got {result:?}");
}
