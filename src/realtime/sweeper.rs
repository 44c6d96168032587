//! Periodic expiry sweep for the global chat history.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use super::hub::GlobalChatHub;

/// Tick on a fixed interval and enqueue a sweep event for the dispatcher.
/// Eviction itself happens on the dispatcher loop, never here, so the history
/// buffer keeps a single writer.
///
/// Exits once the hub's inbound queue is closed.
pub async fn run(hub: Arc<GlobalChatHub>, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.tick().await; // First tick fires immediately; skip it.

    loop {
        ticker.tick().await;
        if hub.submit_sweep().await.is_err() {
            tracing::info!("expiry sweeper stopped");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::realtime::dispatcher;
    use crate::realtime::connection::Connection;

    #[tokio::test]
    async fn sweeper_ticks_produce_cleanup_broadcasts() {
        let (hub, rx) =
            GlobalChatHub::new(100, Duration::from_secs(60), Duration::from_millis(200));
        let dispatcher = tokio::spawn(dispatcher::run(hub.clone(), rx));
        let sweeper = tokio::spawn(run(hub.clone(), Duration::from_millis(20)));

        let (conn, mut client_rx) = Connection::channel();
        hub.register(conn);

        // Expect at least two cleanup frames across a few intervals.
        let mut cleanups = 0;
        for _ in 0..2 {
            let frame = time::timeout(Duration::from_secs(1), client_rx.recv())
                .await
                .expect("timed out waiting for cleanup")
                .unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
            if parsed["type"] == "cleanup" {
                assert_eq!(parsed["payload"]["expiration"], 60);
                cleanups += 1;
            }
        }
        assert_eq!(cleanups, 2);

        hub.close();
        dispatcher.await.unwrap();
        sweeper.await.unwrap();
    }
}
