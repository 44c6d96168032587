//! Per-forum-room connection registry and broadcast fan-out.

use std::collections::HashMap;
use std::time::Duration;

use dashmap::DashMap;

use super::connection::Connection;
use super::envelope::Envelope;

/// Tracks which connections are live in each forum room and fans envelopes
/// out to exactly that set.
///
/// Rooms are created on first registration and never explicitly destroyed;
/// an empty room is harmless. Delivery takes a snapshot of the room under the
/// map guard and releases it before any send, so a slow socket never holds up
/// registration or other rooms. Failed connections are removed after the
/// delivery pass, outside the snapshot.
pub struct RoomRegistry {
    rooms: DashMap<i64, HashMap<u64, Connection>>,
    write_deadline: Duration,
}

impl RoomRegistry {
    pub fn new(write_deadline: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            write_deadline,
        }
    }

    /// Add a connection to a room. Registering the same connection id twice
    /// is idempotent (last write wins).
    pub fn register(&self, forum_id: i64, conn: Connection) {
        let mut room = self.rooms.entry(forum_id).or_default();
        room.insert(conn.id(), conn);
        tracing::info!(forum_id, clients = room.len(), "room client registered");
    }

    /// Remove a connection from a room. No-op if absent.
    pub fn unregister(&self, forum_id: i64, conn_id: u64) {
        if let Some(mut room) = self.rooms.get_mut(&forum_id) {
            room.remove(&conn_id);
        }
    }

    /// Number of live connections in a room.
    pub fn room_len(&self, forum_id: i64) -> usize {
        self.rooms.get(&forum_id).map(|r| r.len()).unwrap_or(0)
    }

    /// Deliver an envelope to every connection registered to `forum_id` at
    /// the moment the snapshot is taken. Connections that fail or miss the
    /// write deadline are closed and dropped; the rest are unaffected.
    pub async fn broadcast(&self, forum_id: i64, envelope: &Envelope) {
        let frame = match serde_json::to_string(envelope) {
            Ok(f) => f,
            Err(err) => {
                tracing::error!(?err, forum_id, "failed to serialize envelope");
                return;
            }
        };

        let snapshot: Vec<Connection> = self
            .rooms
            .get(&forum_id)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default();

        let mut failed = Vec::new();
        for conn in &snapshot {
            if let Err(err) = conn.send(frame.clone(), self.write_deadline).await {
                tracing::debug!(?err, forum_id, conn_id = conn.id(), "ws send failed");
                failed.push(conn.id());
            }
        }

        for conn_id in failed {
            self.unregister(forum_id, conn_id);
            tracing::info!(forum_id, conn_id, "connection removed after send failure");
        }
    }
}
