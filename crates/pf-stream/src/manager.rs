//! Connection lifecycle state machine.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──Opened──▶ Open
//!                      ▲  │                 │
//!        reconnect due │  └─────Closed──────┤
//!                      │                    ▼
//!                    Closed { reconnect_at } ◀┘
//!
//! any state ──shutdown──▶ Shutdown (terminal)
//! ```
//!
//! The socket handle only exists inside `Connecting`/`Open`, and the reconnect
//! deadline only inside `Closed`: leaving `Closed` cancels the pending
//! reconnect, and a reconnect while `Open` has nothing to fire on.
//!
//! All events funnel through one channel and are handled one at a time by
//! [`ConnectionManager::run`], so no handler ever overlaps another.

use pf_core::{
    config::FeedConfig,
    types::ControlMessage,
    ws::{EventReceiver, EventSender, Socket, SocketEvent, SocketEventKind, Transport, event_channel},
};
use tokio::{sync::watch, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{
    backoff::Backoff,
    decoder::{Decoded, Frame, FrameDecoder, Inflate, ZlibInflate},
    dispatcher::{Action, ProtocolDispatcher},
    state::{StateObserver, StatePublisher},
};

/// Prefix of the error text recorded for transport failures.
pub const TRANSPORT_ERROR: &str = "WebSocket connection error";

enum ConnState {
    Idle,
    Connecting { socket: Box<dyn Socket> },
    Open { socket: Box<dyn Socket> },
    Closed { reconnect_at: Instant },
    Shutdown,
}

/// Name of the current state, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Open,
    Closed,
    Shutdown,
}

impl ConnState {
    fn phase(&self) -> Phase {
        match self {
            ConnState::Idle => Phase::Idle,
            ConnState::Connecting { .. } => Phase::Connecting,
            ConnState::Open { .. } => Phase::Open,
            ConnState::Closed { .. } => Phase::Closed,
            ConnState::Shutdown => Phase::Shutdown,
        }
    }

    fn conn_id(&self) -> Option<u64> {
        match self {
            ConnState::Connecting { socket } | ConnState::Open { socket } => Some(socket.conn_id()),
            _ => None,
        }
    }
}

pub struct ConnectionManager<T: Transport, I: Inflate = ZlibInflate> {
    config: FeedConfig,
    transport: T,
    decoder: FrameDecoder<I>,
    dispatcher: ProtocolDispatcher,
    backoff: Backoff,
    state: ConnState,
    next_conn_id: u64,
    events_tx: EventSender,
    events_rx: EventReceiver,
    publisher: StatePublisher,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(config: FeedConfig, transport: T) -> (Self, StateObserver) {
        Self::with_decoder(config, transport, FrameDecoder::new())
    }
}

impl<T: Transport, I: Inflate> ConnectionManager<T, I> {
    pub fn with_decoder(config: FeedConfig, transport: T, decoder: FrameDecoder<I>) -> (Self, StateObserver) {
        let (publisher, observer) = StatePublisher::new();
        let (events_tx, events_rx) = event_channel();
        let manager = Self {
            dispatcher: ProtocolDispatcher::from_config(&config),
            backoff: Backoff::from_config(&config),
            config,
            transport,
            decoder,
            state: ConnState::Idle,
            next_conn_id: 0,
            events_tx,
            events_rx,
            publisher,
        };
        (manager, observer)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Another read-only view of the state.
    pub fn observer(&self) -> StateObserver {
        self.publisher.observer()
    }

    /// Consecutive failed connection cycles since the last successful open.
    pub fn failures(&self) -> u32 {
        self.backoff.failures()
    }

    /// When the pending reconnect fires, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        match self.state {
            ConnState::Closed { reconnect_at } => Some(reconnect_at),
            _ => None,
        }
    }

    /// Open a new socket.
    ///
    /// No-op when already open or shut down. A socket still connecting is
    /// closed first, and a pending reconnect is cancelled.
    pub fn connect(&mut self) {
        match &mut self.state {
            ConnState::Open { socket } => {
                debug!("[feed-{}] already open, connect ignored", socket.conn_id());
                return;
            }
            ConnState::Shutdown => return,
            ConnState::Connecting { socket } => {
                debug!("[feed-{}] closing stale socket before reconnecting", socket.conn_id());
                socket.close();
            }
            ConnState::Idle | ConnState::Closed { .. } => {}
        }

        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;
        info!("[feed-{conn_id}] connecting to {} (topic={})", self.config.url, self.config.topic);
        let socket = self.transport.open(&self.config.url, conn_id, self.events_tx.clone());
        self.state = ConnState::Connecting { socket };
    }

    /// Fire the pending reconnect.
    pub fn on_reconnect_due(&mut self) {
        if matches!(self.state, ConnState::Closed { .. }) {
            self.connect();
        }
    }

    pub fn handle_event(&mut self, event: SocketEvent) {
        if self.state.conn_id() != Some(event.conn_id) {
            debug!("[feed-{}] stale event {:?} ignored", event.conn_id, event.kind);
            return;
        }
        let conn_id = event.conn_id;
        match event.kind {
            SocketEventKind::Opened => self.on_open(conn_id),
            SocketEventKind::Text(text) => self.on_frame(conn_id, Frame::Text(text)),
            SocketEventKind::Binary(data) => self.on_frame(conn_id, Frame::Binary(data)),
            SocketEventKind::Error(detail) => self.on_error(conn_id, &detail),
            SocketEventKind::Closed => self.on_close(conn_id),
        }
    }

    /// Handle every event already queued, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Close the socket, drop any pending reconnect, and stop reacting to
    /// events. Idempotent.
    pub fn shutdown(&mut self) {
        match std::mem::replace(&mut self.state, ConnState::Shutdown) {
            ConnState::Connecting { mut socket } | ConnState::Open { mut socket } => {
                info!("[feed-{}] shutting down", socket.conn_id());
                socket.close();
            }
            ConnState::Shutdown => return,
            ConnState::Idle | ConnState::Closed { .. } => info!("feed shutting down"),
        }
        self.publisher.set_connected(false);
    }

    /// Drive the state machine until `shutdown` flips to `true` (or its
    /// sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            self.shutdown();
            return;
        }
        self.connect();

        loop {
            let deadline = self.reconnect_deadline();
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    self.shutdown();
                    return;
                }

                Some(event) = self.events_rx.recv() => self.handle_event(event),

                _ = sleep_until_opt(deadline) => self.on_reconnect_due(),
            }
        }
    }

    fn on_open(&mut self, conn_id: u64) {
        self.state = match std::mem::replace(&mut self.state, ConnState::Idle) {
            ConnState::Connecting { socket } => {
                info!("[feed-{conn_id}] connected");
                self.backoff.reset();
                self.publisher.mark_open();

                let sub = ControlMessage::subscribe(&self.config).to_json();
                debug!("[feed-{conn_id}] subscribing: {sub}");
                if let Err(e) = socket.send(sub) {
                    error!("[feed-{conn_id}] subscribe send failed: {e}");
                }
                ConnState::Open { socket }
            }
            other => {
                debug!("[feed-{conn_id}] open event in {:?} ignored", other.phase());
                other
            }
        };
    }

    fn on_frame(&mut self, conn_id: u64, frame: Frame) {
        let ConnState::Open { socket } = &self.state else {
            debug!("[feed-{conn_id}] frame before open ignored");
            return;
        };
        let Decoded::Message(msg) = self.decoder.decode(&frame) else {
            return;
        };

        match self.dispatcher.dispatch(&msg) {
            Action::Reply(text) => {
                if let Err(e) = socket.send(text) {
                    debug!("[feed-{conn_id}] heartbeat reply dropped: {e}");
                }
            }
            Action::Batch(records) => {
                debug!("[feed-{conn_id}] batch of {} record(s)", records.len());
                self.publisher.replace_records(records);
            }
            Action::Ignore => debug!("[feed-{conn_id}] message ignored"),
        }
    }

    fn on_error(&mut self, conn_id: u64, detail: &str) {
        error!("[feed-{conn_id}] transport error: {detail}");
        let text = if detail.is_empty() { TRANSPORT_ERROR.to_owned() } else { format!("{TRANSPORT_ERROR}: {detail}") };
        self.publisher.set_error(text);
    }

    fn on_close(&mut self, conn_id: u64) {
        let delay = self.backoff.record_failure();
        warn!("[feed-{conn_id}] disconnected (failure #{}), reconnecting in {delay:?}", self.backoff.failures());
        self.publisher.set_connected(false);
        self.state = ConnState::Closed { reconnect_at: Instant::now() + delay };
    }
}

impl<T: Transport, I: Inflate> Drop for ConnectionManager<T, I> {
    fn drop(&mut self) {
        if let ConnState::Connecting { socket } | ConnState::Open { socket } = &mut self.state {
            socket.close();
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
