//! Handle for one client's outbound frame queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

/// Outbound queue depth per connection. Gives a stalled socket some slack
/// before broadcast deliveries start hitting the write deadline.
const SEND_QUEUE: usize = 64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Why a delivery to a connection failed.
#[derive(Debug)]
pub enum SendError {
    /// The socket task closed its receiver (connection is gone).
    Closed,
    /// The queue stayed full past the write deadline (slow consumer).
    Timeout,
}

/// A registered client connection. The socket task owns the receiving half;
/// registries hold this sending half and write serialized frames into it.
#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    tx: mpsc::Sender<String>,
}

impl Connection {
    /// Create a connection handle and the receiver its socket task drains.
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE);
        let conn = Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        };
        (conn, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a frame for delivery, waiting at most `deadline`. Timing out is
    /// treated the same as the connection being gone: the caller drops us.
    pub async fn send(&self, frame: String, deadline: Duration) -> Result<(), SendError> {
        self.tx
            .send_timeout(frame, deadline)
            .await
            .map_err(|err| match err {
                mpsc::error::SendTimeoutError::Timeout(_) => SendError::Timeout,
                mpsc::error::SendTimeoutError::Closed(_) => SendError::Closed,
            })
    }
}
