//! Background task wrapper around [`ConnectionManager`].

use pf_core::{config::FeedConfig, error::FeedError, ws::Transport, ws::WsTransport};
use tokio::{sync::watch, task::JoinHandle};
use tracing::info;

use crate::{decoder::Inflate, manager::ConnectionManager, state::StateObserver};

/// A running stream client. Dropping it signals shutdown; [`StreamClient::stop`]
/// also waits for the task to finish.
pub struct StreamClient {
    /// Shutdown signal sender.
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Task join handle.
    task: Option<JoinHandle<()>>,
}

impl StreamClient {
    /// Connect to the feed over WebSocket.
    pub fn connect(config: FeedConfig) -> Result<(Self, StateObserver), FeedError> {
        config.validate()?;
        Ok(Self::start(config, WsTransport))
    }

    /// Start a client over any transport. Must be called within a tokio runtime.
    pub fn start<T: Transport>(config: FeedConfig, transport: T) -> (Self, StateObserver) {
        let (manager, observer) = ConnectionManager::new(config, transport);
        (Self::spawn(manager), observer)
    }

    /// Run an already-built manager on a tokio task.
    pub fn spawn<T: Transport, I: Inflate + 'static>(manager: ConnectionManager<T, I>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(manager.run(shutdown_rx));
        Self { shutdown_tx: Some(shutdown_tx), task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Close the socket, cancel any pending reconnect and wait for the task.
    /// No state update happens after this returns. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!("stream client stopped");
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::mock::MockTransport;

    /// Let spawned tasks run until `cond` holds, without letting paused time
    /// auto-advance.
    async fn settle_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_exactly_once_after_first_backoff() {
        let transport = MockTransport::default();
        let (mut client, observer) = StreamClient::start(FeedConfig::default(), transport.clone());

        settle_until(|| transport.open_count() == 1).await;
        transport.last().accept();
        settle_until(|| observer.is_connected()).await;

        transport.last().drop_connection();
        settle_until(|| !observer.is_connected()).await;

        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert_eq!(transport.open_count(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle_until(|| transport.open_count() == 2).await;

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(transport.open_count(), 2);

        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_across_failed_cycles_and_resets_on_open() {
        let transport = MockTransport::default();
        let (mut client, observer) = StreamClient::start(FeedConfig::default(), transport.clone());
        settle_until(|| transport.open_count() == 1).await;

        // Three failed connects: waits of 1s, 2s, 4s.
        for (attempt, wait_ms) in [(1usize, 1_000u64), (2, 2_000), (3, 4_000)] {
            transport.last().fail("refused");
            settle().await;
            tokio::time::advance(Duration::from_millis(wait_ms - 1)).await;
            settle().await;
            assert_eq!(transport.open_count(), attempt, "early reconnect before {wait_ms}ms");
            tokio::time::advance(Duration::from_millis(1)).await;
            settle_until(|| transport.open_count() == attempt + 1).await;
        }

        transport.last().accept();
        settle_until(|| observer.is_connected()).await;
        transport.last().drop_connection();
        settle_until(|| !observer.is_connected()).await;

        // Counter was reset by the successful open: back to 1s.
        tokio::time::advance(Duration::from_millis(1_000)).await;
        settle_until(|| transport.open_count() == 5).await;

        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_and_data_flow_through_the_task() {
        let transport = MockTransport::default();
        let (mut client, mut observer) = StreamClient::start(FeedConfig::default(), transport.clone());
        settle_until(|| transport.open_count() == 1).await;
        let socket = transport.last();
        socket.accept();
        socket.text(r#"{"ping":"123"}"#);
        socket.text(json!({"topic": "trending", "data": [{"baseSymbol": "TEST"}]}).to_string());

        let state = loop {
            let s = observer.next().await.unwrap();
            if !s.records.is_empty() {
                break s;
            }
        };
        assert_eq!(state.records[0].base_symbol, "TEST");
        assert!(state.connected);

        let sent = socket.sent_json();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["topic"], "trending");
        assert_eq!(sent[1]["topic"], "pong");
        assert_eq!(sent[1]["pong"], "123");

        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_socket_and_cancels_pending_reconnect() {
        let transport = MockTransport::default();
        let (mut client, observer) = StreamClient::start(FeedConfig::default(), transport.clone());
        settle_until(|| transport.open_count() == 1).await;
        transport.last().accept();
        settle_until(|| observer.is_connected()).await;
        transport.last().drop_connection();
        settle_until(|| !observer.is_connected()).await;

        client.stop().await;
        assert!(!client.is_running());
        client.stop().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_open_closes_the_socket() {
        let transport = MockTransport::default();
        let (mut client, observer) = StreamClient::start(FeedConfig::default(), transport.clone());
        settle_until(|| transport.open_count() == 1).await;
        transport.last().accept();
        settle_until(|| observer.is_connected()).await;

        client.stop().await;
        assert!(transport.last().is_closed());
        assert!(!observer.is_connected());

        let frozen = observer.snapshot();
        transport.last().text(json!({"topic": "trending", "data": [{"baseSymbol": "LATE"}]}).to_string());
        settle().await;
        assert_eq!(observer.snapshot(), frozen);
    }

    #[tokio::test]
    async fn connect_rejects_invalid_config() {
        let cfg = FeedConfig { url: "http://example.com".into(), ..Default::default() };
        assert!(matches!(StreamClient::connect(cfg), Err(FeedError::Config(_))));
    }
}
