//! Feed protocol interpretation.
//!
//! Routes a decoded message to one of three outcomes:
//!
//! - heartbeat (`ping` field, or `topic: "ping"`) → [`Action::Reply`] with a pong
//! - subscribed topic with a non-empty `data` array → [`Action::Batch`]
//! - anything else (subscription acks, other topics, envelopes) → [`Action::Ignore`]
//!
//! The dispatcher never touches the socket or the state; the connection
//! manager carries out the action.

use pf_core::{config::FeedConfig, json_util::scalar_to_text, time_util, types::ControlMessage, types::Record};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Topic some feed revisions use for heartbeats instead of a `ping` field.
pub const PING_TOPIC: &str = "ping";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send this text frame back on the active socket.
    Reply(String),
    /// Replace the current batch with these normalized records.
    Batch(Vec<Record>),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct ProtocolDispatcher {
    topic: String,
}

impl ProtocolDispatcher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into() }
    }

    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self::new(cfg.topic.clone())
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn dispatch(&self, msg: &Value) -> Action {
        let Some(obj) = msg.as_object() else {
            return Action::Ignore;
        };
        let topic = obj.get("topic").and_then(Value::as_str);
        let ping = obj.get("ping").filter(|v| !v.is_null());

        if ping.is_some() || topic == Some(PING_TOPIC) {
            let nonce = ping.and_then(scalar_to_text).unwrap_or_else(|| time_util::now_ms().to_string());
            return Action::Reply(ControlMessage::pong(nonce).to_json());
        }

        if topic != Some(self.topic.as_str()) {
            return Action::Ignore;
        }
        match obj.get("data").and_then(Value::as_array) {
            Some(items) if !items.is_empty() => {
                let records = normalize_batch(items);
                if records.is_empty() { Action::Ignore } else { Action::Batch(records) }
            }
            _ => Action::Ignore,
        }
    }
}

/// Deserialize and normalize every record of a batch, in order. Only elements
/// that are not JSON objects are skipped.
fn normalize_batch(items: &[Value]) -> Vec<Record> {
    items
        .iter()
        .enumerate()
        .filter(|(idx, item)| {
            let keep = item.is_object();
            if !keep {
                debug!("skipping non-object record #{idx}");
            }
            keep
        })
        .filter_map(|(idx, item)| match Record::deserialize(item) {
            Ok(mut record) => {
                record.normalize_info();
                Some(record)
            }
            Err(e) => {
                debug!("skipping malformed record #{idx}: {e}");
                None
            }
        })
        .collect()
}
