//! # pf-core
//!
//! Core crate for the trending feed client, providing:
//!
//! - **Types** (`types`) — feed records, token info, control messages
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Error types** (`error`) — domain-specific `FeedError` via thiserror
//! - **WebSocket** (`ws`) — socket capability traits + tungstenite transport
//! - **JSON helpers** (`json_util`) — lenient number/string field decoding
//! - **Time utilities** (`time_util`) — wall-clock timestamps
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod json_util;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
