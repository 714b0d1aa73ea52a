use clap::{ArgAction, Parser, ValueEnum};
use snip_core::{Housekeeping, ShortenerConfig};
use snip_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "SNIP_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const DATA_DIR_ENV: &str = "SNIP_DATA_DIR";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const SWEEP_INTERVAL_ENV: &str = "SNIP_SWEEP_INTERVAL_SECONDS";
pub const REQUEST_TIMEOUT_ENV: &str = "SNIP_REQUEST_TIMEOUT_SECONDS";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const SUPPORTED_PROTOCOLS_ENV: &str = "SNIP_SUPPORTED_PROTOCOLS";
pub const MAX_URL_LENGTH_ENV: &str = "SNIP_MAX_URL_LENGTH";
pub const DEDUP_TTL_ENV: &str = "SNIP_DEDUP_TTL_SECONDS";
pub const REACHABILITY_CHECK_ENV: &str = "SNIP_REACHABILITY_CHECK";
pub const ENCODE_VALIDATION_ENV: &str = "SNIP_ENCODE_VALIDATION";
pub const DECODE_VALIDATION_ENV: &str = "SNIP_DECODE_VALIDATION";
pub const LOGGING_ENABLED_ENV: &str = "SNIP_LOGGING_ENABLED";
pub const LOG_SLOW_CALLS_ENV: &str = "SNIP_LOG_SLOW_CALLS";
pub const SLOW_CALL_THRESHOLD_ENV: &str = "SNIP_SLOW_CALL_THRESHOLD_SECONDS";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_BASE_URL: &str = "http://short.est/";
pub const DEFAULT_SUPPORTED_PROTOCOLS: &str = "http://,https://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "file")]
    File,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway", version, about = "HTTP front end of the snip URL shortener")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    /// Root directory of the file backend.
    #[arg(long, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Sweep the duplicate index on this interval instead of on every encode.
    #[arg(long, env = SWEEP_INTERVAL_ENV)]
    pub sweep_interval_seconds: Option<u64>,

    #[arg(
        long,
        env = REQUEST_TIMEOUT_ENV,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_seconds: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Prefix of every issued short URL.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Comma separated, written as `scheme://`. Empty disables the check.
    #[arg(
        long,
        env = SUPPORTED_PROTOCOLS_ENV,
        value_delimiter = ',',
        default_value = DEFAULT_SUPPORTED_PROTOCOLS
    )]
    pub supported_protocols: Vec<String>,

    /// `0` disables the length check.
    #[arg(long, env = MAX_URL_LENGTH_ENV, default_value_t = 2048)]
    pub max_url_length: usize,

    /// `0` or less disables deduplication.
    #[arg(long, env = DEDUP_TTL_ENV, default_value_t = 60, allow_negative_numbers = true)]
    pub dedup_ttl_seconds: i64,

    #[arg(long, env = REACHABILITY_CHECK_ENV, action = ArgAction::Set, default_value_t = false)]
    pub reachability_check: bool,

    #[arg(long, env = ENCODE_VALIDATION_ENV, action = ArgAction::Set, default_value_t = true)]
    pub encode_validation: bool,

    #[arg(long, env = DECODE_VALIDATION_ENV, action = ArgAction::Set, default_value_t = true)]
    pub decode_validation: bool,

    #[arg(long, env = LOGGING_ENABLED_ENV, action = ArgAction::Set, default_value_t = true)]
    pub logging_enabled: bool,

    #[arg(long, env = LOG_SLOW_CALLS_ENV, action = ArgAction::Set, default_value_t = true)]
    pub log_slow_calls: bool,

    #[arg(long, env = SLOW_CALL_THRESHOLD_ENV, default_value_t = 1.0)]
    pub slow_call_threshold_seconds: f64,
}

impl CLI {
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn shortener_config(&self) -> ShortenerConfig {
        let housekeeping = if self.sweep_interval().is_some() {
            Housekeeping::Background
        } else {
            Housekeeping::Inline
        };

        ShortenerConfig::builder()
            .base_url(self.base_url.clone())
            .supported_protocols(
                self.supported_protocols
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
            .max_url_length(self.max_url_length)
            .dedup_ttl_seconds(self.dedup_ttl_seconds)
            .reachability_check(self.reachability_check)
            .encode_validation(self.encode_validation)
            .decode_validation(self.decode_validation)
            .logging_enabled(self.logging_enabled)
            .log_slow_calls(self.log_slow_calls)
            .slow_call_threshold_seconds(self.slow_call_threshold_seconds)
            .housekeeping(housekeeping)
            .build()
    }
}
