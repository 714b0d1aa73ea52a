use jiff::SignedDuration;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Where duplicate-index housekeeping runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Housekeeping {
    /// Sweep synchronously inside every encode call.
    #[default]
    Inline,
    /// A background task sweeps on an interval; encode never sweeps.
    Background,
}

/// Settings shared by the validator and the shortener service.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Prefix of every short URL, e.g. `http://short.est/`. Empty means unset.
    #[builder(setter(into))]
    pub base_url: String,
    /// Accepted schemes for encoding, written as `scheme://`.
    /// An empty list disables the protocol check.
    #[builder(default = vec!["http://".to_string(), "https://".to_string()])]
    pub supported_protocols: Vec<String>,
    /// Longest accepted URL in bytes; `0` disables the check.
    #[builder(default = 2048)]
    pub max_url_length: usize,
    /// Duplicate-index window in seconds; `<= 0` disables deduplication.
    #[builder(default = 60)]
    pub dedup_ttl_seconds: i64,
    #[builder(default = false)]
    pub reachability_check: bool,
    #[builder(default = true)]
    pub encode_validation: bool,
    #[builder(default = true)]
    pub decode_validation: bool,
    #[builder(default = true)]
    pub logging_enabled: bool,
    #[builder(default = true)]
    pub log_slow_calls: bool,
    #[builder(default = 1.0)]
    pub slow_call_threshold_seconds: f64,
    #[builder(default)]
    pub housekeeping: Housekeeping,
}

impl ShortenerConfig {
    pub fn has_base_url(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// The deduplication window, or `None` when deduplication is disabled.
    pub fn dedup_window(&self) -> Option<SignedDuration> {
        (self.dedup_ttl_seconds > 0).then(|| SignedDuration::from_secs(self.dedup_ttl_seconds))
    }

    /// Duration past which a call is reported as slow, or `None` when slow-call
    /// reporting is off.
    pub fn slow_call_threshold(&self) -> Option<Duration> {
        if !(self.logging_enabled && self.log_slow_calls) {
            return None;
        }
        Duration::try_from_secs_f64(self.slow_call_threshold_seconds).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ShortenerConfig::builder()
            .base_url("http://short.est/")
            .build();

        assert!(config.has_base_url());
        assert_eq!(config.supported_protocols, vec!["http://", "https://"]);
        assert_eq!(config.max_url_length, 2048);
        assert_eq!(config.dedup_window(), Some(SignedDuration::from_secs(60)));
        assert!(!config.reachability_check);
        assert!(config.encode_validation);
        assert!(config.decode_validation);
        assert_eq!(config.housekeeping, Housekeeping::Inline);
        assert_eq!(config.slow_call_threshold(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn blank_base_url_is_unset() {
        let config = ShortenerConfig::builder().base_url("   ").build();
        assert!(!config.has_base_url());
    }

    #[test]
    fn non_positive_ttl_disables_dedup() {
        let zero = ShortenerConfig::builder()
            .base_url("http://s/")
            .dedup_ttl_seconds(0)
            .build();
        let negative = ShortenerConfig::builder()
            .base_url("http://s/")
            .dedup_ttl_seconds(-5)
            .build();
        assert_eq!(zero.dedup_window(), None);
        assert_eq!(negative.dedup_window(), None);
    }

    #[test]
    fn slow_call_threshold_requires_logging() {
        let config = ShortenerConfig::builder()
            .base_url("http://s/")
            .logging_enabled(false)
            .build();
        assert_eq!(config.slow_call_threshold(), None);

        let config = ShortenerConfig::builder()
            .base_url("http://s/")
            .log_slow_calls(false)
            .build();
        assert_eq!(config.slow_call_threshold(), None);

        let config = ShortenerConfig::builder()
            .base_url("http://s/")
            .slow_call_threshold_seconds(-1.0)
            .build();
        assert_eq!(config.slow_call_threshold(), None);
    }
}
