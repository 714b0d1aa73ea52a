//! URL shortener service implementation.
//!
//! Ties the validator, code generator and store together. Core types are
//! re-exported from `snip_core`.

pub mod error;
pub mod housekeeper;
pub mod service;
pub mod shortener;

pub use error::{Result, ShortenerError};
pub use housekeeper::{ExpiryHousekeeper, ExpirySweeper};
pub use service::ShortenerService;
pub use shortener::{DecodeOutcome, EncodeOutcome, Shortener};
pub use snip_core::{Clock, Housekeeping, ManualClock, ShortenerConfig, SystemClock};
