//! Transport capability traits.
//!
//! The stream core never touches a concrete WebSocket type. It asks a
//! [`Transport`] to open a [`Socket`], and everything the socket observes
//! (open, frames, errors, close) comes back as [`SocketEvent`]s on a single
//! channel owned by the consumer. Every event is tagged with the `conn_id` the
//! socket was opened with, so events from a replaced socket can be told apart
//! from the current one.

use tokio::sync::mpsc;

use crate::error::FeedError;

/// What a socket observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEventKind {
    /// Handshake completed; the socket accepts sends.
    Opened,
    /// A text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
    /// A transport-level failure. Usually followed by [`SocketEventKind::Closed`].
    Error(String),
    /// The socket is gone (remote close, stream end, or failed connect).
    Closed,
}

/// An event from the socket opened with `conn_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEvent {
    pub conn_id: u64,
    pub kind: SocketEventKind,
}

impl SocketEvent {
    pub fn new(conn_id: u64, kind: SocketEventKind) -> Self {
        Self { conn_id, kind }
    }
}

pub type EventSender = mpsc::UnboundedSender<SocketEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SocketEvent>;

/// Create the channel sockets report their events on.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A handle to one socket.
///
/// `send` is fire-and-forget: it queues the frame and returns immediately.
pub trait Socket: Send {
    /// The id this socket was opened with.
    fn conn_id(&self) -> u64;
    /// Queue a text frame. Fails with [`FeedError::Closed`] when the socket
    /// is not open.
    fn send(&self, text: String) -> Result<(), FeedError>;
    /// Close the socket. Idempotent; emits no further events.
    fn close(&mut self);
}

/// Opens sockets to a feed endpoint.
pub trait Transport: Send + 'static {
    /// Start opening a socket to `url`. Never blocks: the outcome is reported
    /// on `events` as `Opened`, or as `Error` followed by `Closed`.
    fn open(&self, url: &str, conn_id: u64, events: EventSender) -> Box<dyn Socket>;
}
