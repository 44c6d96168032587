pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod store;

use std::sync::Arc;

use tokio::sync::mpsc;

use auth::AuthGateway;
use config::Config;
use realtime::hub::{GlobalChatHub, HubEvent};
use realtime::registry::RoomRegistry;
use store::MessageStore;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn MessageStore>,
    pub auth: Arc<dyn AuthGateway>,
    pub rooms: Arc<RoomRegistry>,
    pub global: Arc<GlobalChatHub>,
}

impl AppState {
    /// Assemble the state and the hub's inbound receiver. The caller passes
    /// the receiver to `realtime::spawn_hub_tasks` (exactly once).
    pub fn new(
        config: Config,
        store: Arc<dyn MessageStore>,
        auth: Arc<dyn AuthGateway>,
    ) -> (Self, mpsc::Receiver<HubEvent>) {
        let rooms = Arc::new(RoomRegistry::new(config.write_deadline));
        let (global, inbound) = GlobalChatHub::new(
            config.history_limit,
            config.message_ttl,
            config.write_deadline,
        );
        let state = Self {
            config: Arc::new(config),
            store,
            auth,
            rooms,
            global,
        };
        (state, inbound)
    }
}
