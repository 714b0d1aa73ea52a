use crate::error::CoreError;
use crate::shortcode::ShortCode;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A stored mapping from a short code to the URL it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortCodeRecord {
    pub code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    pub created_at: Timestamp,
}

/// Entry of the duplicate index: the most recent code issued for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateIndexEntry {
    pub url_hash: UrlHash,
    pub code: ShortCode,
    /// Last time the URL was submitted; refreshed on every hit.
    pub last_seen: Timestamp,
}

impl DuplicateIndexEntry {
    /// Returns `true` while `last_seen + ttl >= now`.
    ///
    /// A deadline past the representable range counts as live.
    pub fn is_live(&self, now: Timestamp, ttl: SignedDuration) -> bool {
        self.last_seen
            .checked_add(ttl)
            .ok()
            .is_none_or(|deadline| deadline >= now)
    }
}

/// Lower-case and trim a URL into its duplicate-index lookup form.
pub fn normalize_url(url: &str) -> String {
    url.trim().to_lowercase()
}

/// Hex MD5 digest of a normalized URL, the key of the duplicate index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlHash(String);

impl UrlHash {
    const HEX_LEN: usize = 32;

    /// Hashes `url` after [`normalize_url`].
    pub fn of(url: &str) -> Self {
        Self(format!("{:x}", md5::compute(normalize_url(url).as_bytes())))
    }

    /// Accepts an already computed digest (32 lower-case hex characters).
    pub fn parse(hash: impl Into<String>) -> Result<Self, CoreError> {
        let hash = hash.into();
        let well_formed = hash.len() == Self::HEX_LEN
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(CoreError::InvalidUrlHash(hash));
        }
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UrlHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UrlHash {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UrlHash> for String {
    fn from(value: UrlHash) -> Self {
        value.0
    }
}
