//! Wire format for broadcast events.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Forum, GlobalMessage, Message};

/// The `{type, payload}` wrapper used for every broadcast event except raw
/// global chat frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl Envelope {
    /// A new message was posted to a forum.
    pub fn message_created(message: &Message) -> Self {
        Self {
            kind: "message_created".to_string(),
            payload: serde_json::json!(message),
        }
    }

    /// A forum was created; sent to the new forum's room.
    pub fn forum_created(forum: &Forum) -> Self {
        Self {
            kind: "forum_created".to_string(),
            payload: serde_json::json!({ "forum": forum }),
        }
    }

    /// Housekeeping hint after an expiry sweep: clients may locally expire
    /// messages older than `ttl`. Not an authoritative per-message delete.
    pub fn cleanup(ttl: Duration) -> Self {
        Self {
            kind: "cleanup".to_string(),
            payload: serde_json::json!({ "expiration": ttl.as_secs() }),
        }
    }

    /// Sent only to the poster when their inbound post could not be handled.
    pub fn error(message: &str) -> Self {
        Self {
            kind: "error".to_string(),
            payload: serde_json::json!({ "message": message }),
        }
    }
}

/// Raw wire form of a global chat message, used for both history backfill and
/// live broadcasts on `/ws/global`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFrame {
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&GlobalMessage> for ChatFrame {
    fn from(msg: &GlobalMessage) -> Self {
        Self {
            username: msg.author.clone(),
            text: msg.content.clone(),
            timestamp: msg.created_at,
        }
    }
}

/// A chat post read off the global socket.
#[derive(Debug, Deserialize)]
pub struct ChatPost {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub text: String,
}
