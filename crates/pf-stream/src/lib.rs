//! # pf-stream
//!
//! The trending feed stream core.
//!
//! ## Data flow
//!
//! [`manager::ConnectionManager`] opens a socket through an injected
//! [`pf_core::ws::Transport`] → each raw frame goes through
//! [`decoder::FrameDecoder`] (plain JSON, or zlib smuggled through text) →
//! [`dispatcher::ProtocolDispatcher`] turns the message into an action
//! (heartbeat reply, data batch, ignore) → the manager applies it and
//! publishes a fresh [`state::StreamState`] snapshot to every
//! [`state::StateObserver`].
//!
//! [`client::StreamClient`] runs a manager on a tokio task and stops it.

pub mod backoff;
pub mod client;
pub mod decoder;
pub mod dispatcher;
pub mod manager;
pub mod state;

#[cfg(test)]
pub(crate) mod mock;

pub use client::StreamClient;
pub use decoder::{Decoded, Frame, FrameDecoder, Inflate, ZlibInflate};
pub use dispatcher::{Action, ProtocolDispatcher};
pub use manager::{ConnectionManager, Phase};
pub use state::{StateObserver, StreamState};
