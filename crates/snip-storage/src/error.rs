use std::io;

pub use snip_core::StorageError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

pub(crate) fn map_io_error(err: io::Error) -> StorageError {
    let message = err.to_string();

    match err.kind() {
        io::ErrorKind::TimedOut => StorageError::Timeout(message),
        io::ErrorKind::PermissionDenied | io::ErrorKind::NotConnected => {
            StorageError::Unavailable(message)
        }
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            StorageError::InvalidData(message)
        }
        _ => StorageError::Io(message),
    }
}

pub(crate) fn map_json_error(err: serde_json::Error) -> StorageError {
    StorageError::InvalidData(err.to_string())
}
