use crate::error::Result;
use async_trait::async_trait;

/// Result of a successful encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// The URL exactly as submitted.
    pub original_url: String,
    /// Base URL joined with the short code.
    pub short_url: String,
}

/// Result of a decode. `original_url` is `None` when nothing is mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    pub short_url: String,
    pub original_url: Option<String>,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `original_url`, reusing a recent code for the same URL when
    /// deduplication is on.
    async fn encode(&self, original_url: &str) -> Result<EncodeOutcome>;

    /// Resolves a short URL back to the URL it was issued for.
    async fn decode(&self, short_url: &str) -> Result<DecodeOutcome>;
}
