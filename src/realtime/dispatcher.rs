//! Single consumer of the hub's inbound queue.
//!
//! Serializing "append to history" and "fan out" in one loop gives every
//! global chat client the same total order of messages, however many posting
//! tasks enqueue concurrently.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::envelope::{ChatFrame, Envelope};
use super::hub::{GlobalChatHub, HubEvent};

/// Run the dispatch loop. Exits when every sender on the inbound queue is
/// gone (process shutdown or the hub being dropped).
pub async fn run(hub: Arc<GlobalChatHub>, mut inbound: mpsc::Receiver<HubEvent>) {
    while let Some(event) = inbound.recv().await {
        match event {
            HubEvent::Message(message) => {
                let frame = match serde_json::to_string(&ChatFrame::from(&message)) {
                    Ok(f) => f,
                    Err(err) => {
                        tracing::error!(?err, "failed to serialize chat frame");
                        continue;
                    }
                };
                // History first, then fan-out: a client can never observe a
                // broadcast the buffer doesn't yet contain.
                hub.append_history(message);
                hub.broadcast_frame(&frame).await;
            }
            HubEvent::Sweep => {
                let evicted = hub.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "expired global chat history entries");
                }
                match serde_json::to_string(&Envelope::cleanup(hub.ttl())) {
                    Ok(frame) => hub.broadcast_frame(&frame).await,
                    Err(err) => tracing::error!(?err, "failed to serialize cleanup envelope"),
                }
            }
        }
    }
    tracing::info!("global chat dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::Utc;
    use tokio::time;

    use crate::models::GlobalMessage;
    use crate::realtime::connection::Connection;

    fn message(id: i64, content: &str) -> GlobalMessage {
        GlobalMessage {
            id,
            author: "a".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn all_clients_observe_messages_in_the_same_order() {
        let (hub, rx) =
            GlobalChatHub::new(100, Duration::from_secs(60), Duration::from_millis(200));
        let dispatcher = tokio::spawn(run(hub.clone(), rx));

        let (conn_a, mut rx_a) = Connection::channel();
        let (conn_b, mut rx_b) = Connection::channel();
        hub.register(conn_a);
        hub.register(conn_b);

        // Enqueue from several producers at once.
        let mut producers = Vec::new();
        for i in 0..10 {
            let hub = hub.clone();
            producers.push(tokio::spawn(async move {
                hub.submit(message(i, &format!("m{i}"))).await.unwrap();
            }));
        }
        for p in producers {
            p.await.unwrap();
        }

        let mut order_a = Vec::new();
        let mut order_b = Vec::new();
        for _ in 0..10 {
            let fa = time::timeout(Duration::from_secs(1), rx_a.recv())
                .await
                .unwrap()
                .unwrap();
            let fb = time::timeout(Duration::from_secs(1), rx_b.recv())
                .await
                .unwrap()
                .unwrap();
            order_a.push(fa);
            order_b.push(fb);
        }
        assert_eq!(order_a, order_b);

        // History matches the broadcast order.
        let history: Vec<String> = hub
            .history_snapshot()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        let broadcast: Vec<String> = order_a
            .iter()
            .map(|f| {
                serde_json::from_str::<serde_json::Value>(f).unwrap()["text"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(history, broadcast);

        hub.close();
        dispatcher.await.unwrap();
    }

    #[tokio::test]
    async fn sweep_evicts_and_broadcasts_cleanup() {
        let (hub, rx) =
            GlobalChatHub::new(100, Duration::from_millis(50), Duration::from_millis(200));
        let dispatcher = tokio::spawn(run(hub.clone(), rx));

        let (conn, mut client_rx) = Connection::channel();
        hub.register(conn);

        hub.submit(message(1, "doomed")).await.unwrap();
        let live = time::timeout(Duration::from_secs(1), client_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(live.contains("doomed"));

        time::sleep(Duration::from_millis(80)).await;
        hub.submit_sweep().await.unwrap();

        let frame = time::timeout(Duration::from_secs(1), client_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "cleanup");
        assert_eq!(parsed["payload"]["expiration"], 0);

        assert!(hub.history_snapshot().is_empty());

        hub.close();
        dispatcher.await.unwrap();
    }

    #[tokio::test]
    async fn history_never_exceeds_capacity() {
        let (hub, rx) = GlobalChatHub::new(5, Duration::from_secs(60), Duration::from_millis(200));
        let dispatcher = tokio::spawn(run(hub.clone(), rx));

        for i in 0..20 {
            hub.submit(message(i, &format!("m{i}"))).await.unwrap();
        }

        // Wait for the dispatcher to drain the queue.
        time::timeout(Duration::from_secs(2), async {
            loop {
                let snapshot = hub.history_snapshot();
                if snapshot.last().map(|m| m.id) == Some(19) {
                    break snapshot;
                }
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .map(|snapshot| {
            assert_eq!(snapshot.len(), 5);
            assert_eq!(snapshot[0].id, 15);
        })
        .unwrap();

        hub.close();
        dispatcher.await.unwrap();
    }
}
