//! Storage backends for short code records and the duplicate index.

pub mod error;
pub mod file;
pub mod memory;
pub mod mysql;

pub use error::{Result, StorageError};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use snip_core::{DuplicateIndex, MappingStore, RecordStore};
