//! Persistence boundary for forum and global chat messages.
//!
//! The realtime core treats the store as an append-only log plus one bounded
//! read (`global_history`). Backed by an in-memory log here; a SQL-backed
//! implementation plugs in behind the same trait.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::models::{Forum, GlobalMessage, Message};

/// Error returned by `MessageStore` operations.
#[derive(Debug)]
pub enum StoreError {
    /// The backing store rejected or could not complete the operation.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A new forum, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewForum {
    pub title: String,
    pub description: String,
}

/// A new forum message, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub forum_id: i64,
    pub author: String,
    pub content: String,
}

/// A new global chat message, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewGlobalMessage {
    pub author: String,
    pub content: String,
}

/// Durable record of posted messages consumed by the realtime core.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_forum(&self, forum: NewForum) -> Result<Forum, StoreError>;

    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    async fn create_global_message(
        &self,
        message: NewGlobalMessage,
    ) -> Result<GlobalMessage, StoreError>;

    /// The last `limit` global chat messages, oldest first.
    async fn global_history(&self, limit: usize) -> Result<Vec<GlobalMessage>, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    forums: Vec<Forum>,
    messages: Vec<Message>,
    global: Vec<GlobalMessage>,
}

/// In-memory `MessageStore` used by the default composition root and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of stored global chat messages.
    pub fn global_len(&self) -> usize {
        self.inner.lock().global.len()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_forum(&self, forum: NewForum) -> Result<Forum, StoreError> {
        let record = Forum {
            id: self.next_id(),
            title: forum.title,
            description: forum.description,
            created_at: Utc::now(),
        };
        self.inner.lock().forums.push(record.clone());
        Ok(record)
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let record = Message {
            id: self.next_id(),
            forum_id: message.forum_id,
            author: message.author,
            content: message.content,
            created_at: Utc::now(),
        };
        self.inner.lock().messages.push(record.clone());
        Ok(record)
    }

    async fn create_global_message(
        &self,
        message: NewGlobalMessage,
    ) -> Result<GlobalMessage, StoreError> {
        let record = GlobalMessage {
            id: self.next_id(),
            author: message.author,
            content: message.content,
            created_at: Utc::now(),
        };
        self.inner.lock().global.push(record.clone());
        Ok(record)
    }

    async fn global_history(&self, limit: usize) -> Result<Vec<GlobalMessage>, StoreError> {
        let inner = self.inner.lock();
        let start = inner.global.len().saturating_sub(limit);
        Ok(inner.global[start..].to_vec())
    }
}
