//! Socket capability interfaces and the tungstenite-backed transport.

pub mod client;
pub mod transport;

pub use client::{WsSocket, WsTransport};
pub use transport::{EventReceiver, EventSender, Socket, SocketEvent, SocketEventKind, Transport, event_channel};
