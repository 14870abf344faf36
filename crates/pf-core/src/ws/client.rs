//! Production [`Transport`] over `tokio-tungstenite`.
//!
//! Each [`WsSocket`] runs as a tokio task that:
//! 1. Connects to the feed WebSocket endpoint (TLS).
//! 2. Reports `Opened`, then forwards every text/binary frame as an event.
//! 3. Answers protocol-level WebSocket pings with pongs.
//! 4. Writes queued outbound text frames.
//! 5. Reports `Error`/`Closed` when the connection fails or ends.
//!
//! Reconnection is not handled here; the consumer decides when to open a new
//! socket.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::transport::{EventSender, Socket, SocketEvent, SocketEventKind, Transport};
use crate::error::FeedError;

/// Opens [`WsSocket`]s. Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(&self, url: &str, conn_id: u64, events: EventSender) -> Box<dyn Socket> {
        Box::new(WsSocket::spawn(url.to_owned(), conn_id, events))
    }
}

/// A single WebSocket connection managed by a background tokio task.
pub struct WsSocket {
    conn_id: u64,
    /// Set once the handshake completes, cleared when the task stops.
    open: Arc<AtomicBool>,
    /// Channel to send outbound messages.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Shutdown signal sender.
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl WsSocket {
    fn spawn(url: String, conn_id: u64, events: EventSender) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let open = Arc::new(AtomicBool::new(false));

        tokio::spawn(socket_task(url, conn_id, events, open.clone(), outbound_rx, shutdown_rx));

        Self { conn_id, open, outbound_tx, shutdown_tx: Some(shutdown_tx) }
    }
}

impl Socket for WsSocket {
    fn conn_id(&self) -> u64 {
        self.conn_id
    }

    fn send(&self, text: String) -> Result<(), FeedError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(FeedError::Closed);
        }
        self.outbound_tx.send(text).map_err(|_| FeedError::Closed)
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::Release);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

impl Drop for WsSocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connect, then pump frames in both directions until the connection ends or
/// a shutdown is signalled.
async fn socket_task(
    url: String,
    conn_id: u64,
    events: EventSender,
    open: Arc<AtomicBool>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let emit = |kind: SocketEventKind| {
        let _ = events.send(SocketEvent::new(conn_id, kind));
    };

    info!("[feed-{conn_id}] connecting to {url}");

    let connected = tokio::select! {
        r = tokio_tungstenite::connect_async(url.as_str()) => r,
        _ = shutdown_rx.changed() => {
            debug!("[feed-{conn_id}] closed before handshake completed");
            return;
        }
    };

    let ws_stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            error!("[feed-{conn_id}] connection failed: {e}");
            emit(SocketEventKind::Error(e.to_string()));
            emit(SocketEventKind::Closed);
            return;
        }
    };

    // A close() racing the handshake wins.
    if *shutdown_rx.borrow() {
        return;
    }
    open.store(true, Ordering::Release);
    emit(SocketEventKind::Opened);

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("[feed-{conn_id}] close requested");
                open.store(false, Ordering::Release);
                let _ = ws_write.close().await;
                return;
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        emit(SocketEventKind::Text(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        emit(SocketEventKind::Binary(data.to_vec()));
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        warn!("[feed-{conn_id}] received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("[feed-{conn_id}] read error: {e}");
                        emit(SocketEventKind::Error(e.to_string()));
                        break;
                    }
                    None => {
                        warn!("[feed-{conn_id}] stream ended");
                        break;
                    }
                    _ => {} // Pong, Frame — ignore
                }
            }

            Some(text) = outbound_rx.recv() => {
                if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                    error!("[feed-{conn_id}] send error: {e}");
                    emit(SocketEventKind::Error(e.to_string()));
                    break;
                }
            }
        }
    }

    open.store(false, Ordering::Release);
    emit(SocketEventKind::Closed);
}
