use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forum_api::auth::StaticTokenAuth;
use forum_api::config::Config;
use forum_api::store::MemoryStore;
use forum_api::{realtime, AppState};

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;
    let sweep_interval = config.sweep_interval;

    // In-memory store and static token table for the default deployment;
    // SQL- and auth-service-backed gateways plug in behind the same traits.
    let store = Arc::new(MemoryStore::new());
    let auth = Arc::new(StaticTokenAuth::from_env());

    let (state, hub_inbound) = AppState::new(config, store, auth);
    let (dispatcher, sweeper) =
        realtime::spawn_hub_tasks(state.global.clone(), hub_inbound, sweep_interval);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(forum_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "forum-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .expect("server error");

    // Close the hub's inbound queue so the dispatcher drains and both
    // background tasks exit.
    state.global.close();
    let _ = dispatcher.await;
    let _ = sweeper.await;
}
