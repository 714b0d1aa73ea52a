use thiserror::Error;

/// Errors related to the core types of the URL shortener.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid url hash: {0}")]
    InvalidUrlHash(String),
}

/// Errors surfaced by [`MappingStore`](crate::store::MappingStore) backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Why a reachability probe rejected a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// The target answered with a status outside 2xx/3xx.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProbeFailure {
    /// Diagnostic sub-code appended to the user-facing message.
    pub fn code(&self) -> &'static str {
        match self {
            ProbeFailure::Status(_) => "01",
            ProbeFailure::Transport(_) => "02",
        }
    }
}

/// Broad classification of a [`ValidationError`], used by callers to pick a
/// response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// The server itself is misconfigured.
    Config,
    /// The submitted URL is rejected.
    Invalid,
    /// The submitted URL could not be reached.
    Unreachable,
}

/// A URL rejected by the validator.
///
/// The `Display` output is the user-facing message and is deterministic for
/// a given reason and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid Server Settings. Base URL is undefined")]
    EmptyBase,
    #[error("Invalid URL format")]
    MalformedUrl,
    #[error("Invalid URL protocol. Supported protocols are: {}", .supported.join(", "))]
    UnsupportedProtocol { supported: Vec<String> },
    #[error("URL is unreachable ({})", .0.code())]
    Unreachable(ProbeFailure),
    #[error("Invalid shortened URL. URL does not match the supported base format.")]
    BadShortUrlFormat,
    #[error("URL exceeds the maximum supported length of {} characters", group_thousands(.max))]
    TooLong { max: usize },
}

impl ValidationError {
    pub fn kind(&self) -> ValidationKind {
        match self {
            ValidationError::EmptyBase => ValidationKind::Config,
            ValidationError::Unreachable(_) => ValidationKind::Unreachable,
            _ => ValidationKind::Invalid,
        }
    }
}

fn group_thousands(value: &usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
