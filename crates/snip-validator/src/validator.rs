use crate::probe::{HttpProbe, ReachabilityProbe};
use snip_core::{ShortenerConfig, ValidationError};
use tracing::debug;
use url::Url;

/// Which operation a URL is being validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A long URL about to be shortened.
    Encode,
    /// A short URL about to be resolved.
    Decode,
}

/// Validates URLs before they reach the shortener.
///
/// Checks run in a fixed order and the first failure wins:
///
/// 1. base URL configured (always, even with validation disabled)
/// 2. URL syntax, scheme and host present
/// 3. encode: scheme listed in `supported_protocols`
/// 4. encode: reachability, when enabled
/// 5. decode: starts with the base URL, ignoring case
/// 6. length against `max_url_length`
///
/// The validator never rewrites its input.
#[derive(Debug, Clone)]
pub struct UrlValidator<P = HttpProbe> {
    probe: P,
}

impl<P: ReachabilityProbe> UrlValidator<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    pub async fn validate(
        &self,
        url: &str,
        mode: Mode,
        config: &ShortenerConfig,
    ) -> Result<(), ValidationError> {
        let url = url.trim();

        if !config.has_base_url() {
            return Err(ValidationError::EmptyBase);
        }

        let enabled = match mode {
            Mode::Encode => config.encode_validation,
            Mode::Decode => config.decode_validation,
        };
        if !enabled {
            return Ok(());
        }

        let parsed = parse(url)?;

        if mode == Mode::Encode {
            check_protocol(&parsed, config)?;

            if config.reachability_check {
                self.probe.probe(&parsed).await.map_err(|failure| {
                    debug!(url = %parsed, error = %failure, "url failed reachability probe");
                    ValidationError::Unreachable(failure)
                })?;
            }
        }

        if mode == Mode::Decode && !starts_with_ignore_case(url, &config.base_url) {
            return Err(ValidationError::BadShortUrlFormat);
        }

        if config.max_url_length > 0 && url.len() > config.max_url_length {
            return Err(ValidationError::TooLong {
                max: config.max_url_length,
            });
        }

        Ok(())
    }
}

/// Parses `url` as an absolute URL written as `scheme://host...`.
///
/// Input the WHATWG parser would repair (embedded whitespace, `scheme:host`,
/// backslash separators) is rejected, since the raw string is stored as is.
fn parse(url: &str) -> Result<Url, ValidationError> {
    if url
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '\\')
    {
        return Err(ValidationError::MalformedUrl);
    }

    let parsed = Url::parse(url).map_err(|_| ValidationError::MalformedUrl)?;

    let has_authority = url
        .get(parsed.scheme().len()..)
        .is_some_and(|rest| rest.starts_with("://"));
    if !has_authority {
        return Err(ValidationError::MalformedUrl);
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(ValidationError::MalformedUrl),
    }
}

/// Compares `scheme://` against the configured list. The parser has already
/// lowercased the scheme, so the list is matched case-insensitively.
fn check_protocol(parsed: &Url, config: &ShortenerConfig) -> Result<(), ValidationError> {
    if config.supported_protocols.is_empty() {
        return Ok(());
    }

    let protocol = format!("{}://", parsed.scheme());
    if config
        .supported_protocols
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(&protocol))
    {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedProtocol {
            supported: config.supported_protocols.clone(),
        })
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
