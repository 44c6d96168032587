//! Real-time message distribution: per-forum rooms, the global chat hub, its
//! dispatcher, and the expiry sweeper.

pub mod connection;
pub mod dispatcher;
pub mod envelope;
pub mod hub;
pub mod registry;
pub mod server;
pub mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use hub::{GlobalChatHub, HubEvent};

/// Spawn the hub's dispatcher and sweeper tasks. Both exit once the hub's
/// inbound queue is closed.
pub fn spawn_hub_tasks(
    hub: Arc<GlobalChatHub>,
    inbound: mpsc::Receiver<HubEvent>,
    sweep_interval: Duration,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let dispatcher = tokio::spawn(dispatcher::run(hub.clone(), inbound));
    let sweeper = tokio::spawn(sweeper::run(hub, sweep_interval));
    (dispatcher, sweeper)
}
