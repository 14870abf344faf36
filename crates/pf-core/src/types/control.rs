//! Client → server control messages (subscribe and heartbeat reply).

use serde::Serialize;

use crate::config::FeedConfig;

/// Topic name carried by heartbeat replies.
pub const PONG_TOPIC: &str = "pong";

/// A control frame in the feed's subscription protocol.
///
/// Field order matches what the feed documents; `pong` is only present on
/// heartbeat replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    pub topic: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pong: Option<String>,
    pub interval: String,
    pub pair: String,
    pub chain_id: String,
    pub compression: u8,
}

impl ControlMessage {
    /// Subscription request sent right after the socket opens.
    pub fn subscribe(cfg: &FeedConfig) -> Self {
        Self {
            topic: cfg.topic.clone(),
            event: "sub".into(),
            pong: None,
            interval: cfg.interval.clone(),
            pair: cfg.pair.clone(),
            chain_id: cfg.chain_id.clone(),
            compression: cfg.compression,
        }
    }

    /// Heartbeat reply echoing `nonce`.
    ///
    /// The feed expects the reply with empty filters and `compression: 1`.
    pub fn pong(nonce: impl Into<String>) -> Self {
        Self {
            topic: PONG_TOPIC.into(),
            event: "sub".into(),
            pong: Some(nonce.into()),
            interval: String::new(),
            pair: String::new(),
            chain_id: String::new(),
            compression: 1,
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> String {
        // Plain strings and integers only: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
