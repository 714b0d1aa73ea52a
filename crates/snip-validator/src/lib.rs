//! URL validation for the shortener.

pub mod probe;
pub mod validator;

pub use probe::{HttpProbe, ReachabilityProbe, PROBE_TIMEOUT};
pub use validator::{Mode, UrlValidator};
