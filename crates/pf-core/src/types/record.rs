//! Feed records: one market entity snapshot per element of a data batch.
//!
//! Field names follow the feed's camelCase wire format. Every field is
//! optional on the wire (missing → default), numeric fields accept either JSON
//! numbers or numeric strings, and unknown fields are kept in `extra` so a
//! record can be re-serialized without loss.
//!
//! Deserializing a JSON object into a [`Record`] does not fail: a field of the
//! wrong type falls back to its default, and an `info` of any shape is kept.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json_util::{de_f64, de_string, de_u64};

/// Social links carried in a record's `info` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record's `info` field: either already structured, or the raw text the
/// feed sent when it could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenInfo {
    Parsed(InfoLinks),
    Raw(String),
    /// Any other value (numbers, arrays, objects with mistyped links), verbatim.
    Other(Value),
}

impl TokenInfo {
    /// Structured links, if this info has been parsed.
    pub fn links(&self) -> Option<&InfoLinks> {
        match self {
            TokenInfo::Parsed(links) => Some(links),
            TokenInfo::Raw(_) | TokenInfo::Other(_) => None,
        }
    }
}

/// One trending-token snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    // --- Identifiers ---
    #[serde(default, deserialize_with = "de_string")]
    pub base_symbol: String,
    #[serde(default, deserialize_with = "de_string")]
    pub base_name: String,
    #[serde(default, deserialize_with = "de_string")]
    pub base_token: String,
    #[serde(default, deserialize_with = "de_string")]
    pub quote_symbol: String,
    #[serde(default, deserialize_with = "de_string")]
    pub quote_name: String,
    #[serde(default, deserialize_with = "de_string")]
    pub quote_token: String,
    #[serde(default, deserialize_with = "de_string")]
    pub pair: String,
    #[serde(default, deserialize_with = "de_string")]
    pub chain_id: String,
    #[serde(default, deserialize_with = "de_string")]
    pub dex: String,

    // --- Prices ---
    #[serde(default, deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub price_usd: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub price_native: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub price_change_1m: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub price_change_5m: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub price_change_1h: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub price_change_24h: f64,

    // --- Size / activity ---
    #[serde(default, deserialize_with = "de_f64")]
    pub liquidity: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub market_cap: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub volume_usd_24h: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub base_supply: f64,
    #[serde(default, deserialize_with = "de_u64")]
    pub base_decimals: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub buy_count_24h: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub sell_count_24h: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub count_24h: u64,
    #[serde(default, deserialize_with = "de_string")]
    pub time_diff: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<TokenInfo>,

    /// Fields this client does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Parse a textual `info` blob into [`InfoLinks`].
    ///
    /// Text that is not a JSON object is left as [`TokenInfo::Raw`]; it is
    /// never dropped.
    pub fn normalize_info(&mut self) {
        if let Some(TokenInfo::Raw(text)) = &self.info {
            if let Ok(links) = serde_json::from_str::<InfoLinks>(text) {
                self.info = Some(TokenInfo::Parsed(links));
            }
        }
    }
}
