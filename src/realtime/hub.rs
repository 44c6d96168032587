//! The single site-wide chat hub: connection set, bounded history, and the
//! inbound event queue consumed by the dispatcher.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::models::GlobalMessage;

use super::connection::Connection;

/// Depth of the hub's inbound event queue. Producers (posting clients and the
/// sweeper) briefly block when the dispatcher falls this far behind.
const INBOUND_QUEUE: usize = 256;

/// An event consumed by the hub's dispatcher. Routing sweeps through the same
/// queue as messages keeps the history buffer single-writer.
#[derive(Debug)]
pub enum HubEvent {
    /// A validated, already-persisted chat message to record and fan out.
    Message(GlobalMessage),
    /// Evict expired history entries and notify clients.
    Sweep,
}

/// The hub's inbound queue has shut down; the post cannot be delivered.
#[derive(Debug)]
pub struct HubClosed;

/// Shared state of the global chat room.
///
/// The history buffer is mutated only from the dispatcher loop; the mutex
/// exists so connection handlers and tests can take consistent read
/// snapshots.
pub struct GlobalChatHub {
    connections: DashMap<u64, Connection>,
    history: Mutex<VecDeque<GlobalMessage>>,
    /// Taken by `close()` at shutdown; `None` means the hub no longer accepts
    /// posts and the dispatcher will drain and exit.
    inbound: Mutex<Option<mpsc::Sender<HubEvent>>>,
    capacity: usize,
    ttl: Duration,
    write_deadline: Duration,
}

impl GlobalChatHub {
    /// Create the hub and the receiving end of its inbound queue. The caller
    /// hands the receiver to exactly one dispatcher task.
    pub fn new(
        capacity: usize,
        ttl: Duration,
        write_deadline: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<HubEvent>) {
        let (inbound, rx) = mpsc::channel(INBOUND_QUEUE);
        let hub = Arc::new(Self {
            connections: DashMap::new(),
            history: Mutex::new(VecDeque::new()),
            inbound: Mutex::new(Some(inbound)),
            capacity,
            ttl,
            write_deadline,
        });
        (hub, rx)
    }

    /// Close the inbound queue. Queued events still drain, then the
    /// dispatcher exits and the sweeper stops on its next tick.
    pub fn close(&self) {
        self.inbound.lock().take();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn register(&self, conn: Connection) {
        self.connections.insert(conn.id(), conn);
        tracing::info!(clients = self.connections.len(), "global chat client registered");
    }

    pub fn unregister(&self, conn_id: u64) {
        self.connections.remove(&conn_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Enqueue a persisted message for the dispatcher.
    pub async fn submit(&self, message: GlobalMessage) -> Result<(), HubClosed> {
        self.send_event(HubEvent::Message(message)).await
    }

    /// Enqueue a sweep event for the dispatcher.
    pub async fn submit_sweep(&self) -> Result<(), HubClosed> {
        self.send_event(HubEvent::Sweep).await
    }

    async fn send_event(&self, event: HubEvent) -> Result<(), HubClosed> {
        // Clone the sender out of the lock; never await while holding it.
        let sender = self.inbound.lock().clone().ok_or(HubClosed)?;
        sender.send(event).await.map_err(|_| HubClosed)
    }

    /// Current history contents in arrival order.
    pub fn history_snapshot(&self) -> Vec<GlobalMessage> {
        self.history.lock().iter().cloned().collect()
    }

    /// Append a message, evicting the oldest entry past capacity.
    /// Called only from the dispatcher.
    pub(crate) fn append_history(&self, message: GlobalMessage) {
        let mut history = self.history.lock();
        history.push_back(message);
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    /// Drop entries older than the TTL. Called only from the dispatcher.
    /// Returns the number of entries evicted.
    pub(crate) fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut history = self.history.lock();
        let before = history.len();
        history.retain(|msg| {
            now.signed_duration_since(msg.created_at)
                .to_std()
                .map(|age| age < self.ttl)
                .unwrap_or(true)
        });
        before - history.len()
    }

    /// Deliver an already-serialized frame to every connection registered at
    /// the moment of the snapshot, dropping any that fail.
    pub(crate) async fn broadcast_frame(&self, frame: &str) {
        let snapshot: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut failed = Vec::new();
        for conn in &snapshot {
            if let Err(err) = conn.send(frame.to_string(), self.write_deadline).await {
                tracing::debug!(?err, conn_id = conn.id(), "global chat send failed");
                failed.push(conn.id());
            }
        }

        for conn_id in failed {
            self.unregister(conn_id);
            tracing::info!(conn_id, "global chat connection removed after send failure");
        }
    }
}
