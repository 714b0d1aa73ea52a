use serde::{Deserialize, Serialize};
use snip_shortener::{DecodeOutcome, EncodeOutcome};

/// Body of both `/v1/encode` and `/v1/decode`. A missing `url` reads as empty.
#[derive(Debug, Default, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub original_url: String,
    pub short_url: String,
}

impl From<EncodeOutcome> for EncodeResponse {
    fn from(outcome: EncodeOutcome) -> Self {
        Self {
            original_url: outcome.original_url,
            short_url: outcome.short_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    pub short_url: String,
    pub original_url: String,
}

impl DecodeResponse {
    /// `None` when the short URL maps to nothing.
    pub fn from_outcome(outcome: DecodeOutcome) -> Option<Self> {
        let original_url = outcome.original_url?;
        Some(Self {
            short_url: outcome.short_url,
            original_url,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
