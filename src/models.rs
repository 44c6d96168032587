//! Domain types shared by the store, the HTTP routes, and the realtime layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion forum. Each forum has one realtime room keyed by its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forum {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A message posted to a forum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub forum_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message posted to the site-wide global chat. Immutable once created;
/// evicted from the in-memory history only by the expiry sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMessage {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
