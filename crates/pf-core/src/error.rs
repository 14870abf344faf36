//! Typed error definitions for the trending feed client.
//!
//! Provides [`FeedError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`.

use thiserror::Error;

/// Domain-specific errors for the trending feed client.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Structured-text (JSON) decode error.
    #[error("decode error: {0}")]
    Decode(String),

    /// Decompression of a smuggled byte stream failed.
    #[error("inflate error: {0}")]
    Inflate(String),

    /// Outbound send attempted on a socket that is not open.
    #[error("socket closed")]
    Closed,
}
