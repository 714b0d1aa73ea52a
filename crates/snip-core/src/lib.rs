//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the types shared by the generator, the storage
//! backends, the validator and the shortener service.

pub mod clock;
pub mod config;
pub mod error;
pub mod record;
pub mod shortcode;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Housekeeping, ShortenerConfig};
pub use error::{CoreError, ProbeFailure, StorageError, ValidationError, ValidationKind};
pub use record::{normalize_url, DuplicateIndexEntry, ShortCodeRecord, UrlHash};
pub use shortcode::{ShortCode, ALPHABET, CODE_LENGTH};
pub use store::{DuplicateIndex, MappingStore, RecordStore};
