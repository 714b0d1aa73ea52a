use snip_core::{StorageError, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The URL was turned away by the validator; nothing was written.
    #[error(transparent)]
    Rejected(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ShortenerError>;
