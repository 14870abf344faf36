//! Configuration parsing for the trending feed client.
//!
//! Settings come from a single JSON config file. The top-level structure
//! contains logging metadata and a `feed` block describing the endpoint, the
//! subscription parameters, and the reconnect backoff.
//!
//! # Example config
//!
//! ```json
//! {
//!   "module": { "module_name": "trending_feed", "log_path": "/tmp/log" },
//!   "feed": {
//!     "url": "wss://web-t.pinkpunk.io/ws",
//!     "topic": "trending",
//!     "chain_id": "56",
//!     "base_delay_ms": 1000,
//!     "max_delay_ms": 30000
//!   }
//! }
//! ```
//!
//! Every `feed` field is optional; missing fields take the values of
//! [`FeedConfig::default`].

use std::time::Duration;

use serde::Deserialize;

use crate::error::FeedError;

/// Feed endpoint used when no `url` is configured.
pub const DEFAULT_FEED_URL: &str = "wss://web-t.pinkpunk.io/ws";
/// Data topic subscribed when no `topic` is configured.
pub const DEFAULT_TOPIC: &str = "trending";
/// Chain filter sent in the subscription when no `chain_id` is configured.
pub const DEFAULT_CHAIN_ID: &str = "56";

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(default)]
    pub module: Option<ModuleMeta>,

    /// Feed connection settings.
    #[serde(default)]
    pub feed: FeedConfig,
}

impl AppConfig {
    /// Returns the module name, defaulting to `"trending_feed"`.
    pub fn module_name(&self) -> String {
        self.module.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "trending_feed".into())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.module.as_ref().and_then(|m| m.log_path.clone())
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Feed connection, subscription and reconnect settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Full WebSocket URL of the feed.
    pub url: String,
    /// Data topic to subscribe to (and to accept batches from).
    pub topic: String,
    /// Subscription `interval` parameter.
    pub interval: String,
    /// Subscription `pair` filter.
    pub pair: String,
    /// Subscription `chainId` filter.
    pub chain_id: String,
    /// Requested compression flag (`0` = uncompressed).
    pub compression: u8,
    /// First reconnect delay in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.into(),
            topic: DEFAULT_TOPIC.into(),
            interval: String::new(),
            pair: String::new(),
            chain_id: DEFAULT_CHAIN_ID.into(),
            compression: 0,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl FeedConfig {
    /// First reconnect delay.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Reconnect delay cap.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Reject settings the connection manager cannot run with.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.url.trim().is_empty() {
            return Err(FeedError::Config("feed.url must not be empty".into()));
        }
        let parsed =
            url::Url::parse(&self.url).map_err(|e| FeedError::Config(format!("feed.url {:?}: {e}", self.url)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(FeedError::Config(format!("feed.url must be ws:// or wss://, got {}", self.url)));
        }
        if self.topic.trim().is_empty() {
            return Err(FeedError::Config("feed.topic must not be empty".into()));
        }
        if self.base_delay_ms == 0 {
            return Err(FeedError::Config("feed.base_delay_ms must be > 0".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(FeedError::Config(format!(
                "feed.max_delay_ms ({}) must be >= feed.base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.feed.validate()?;
    Ok(config)
}
