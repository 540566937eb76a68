use clap::Parser;
use rainguard_core::pipeline_ipc::DEFAULT_MAX_FRAME_BYTES;
use rainguard_core::Severity;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";
const WS_PATH: &str = "/ws";
const STATS_PATH: &str = "/api/stats";
const MAX_KEEPALIVE_SECS: u64 = 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "rainguard-monitor", about = "Live feed of the RainGuard claims pipeline")]
pub struct Args {
    /// Dashboard origin; the event socket and stats endpoint hang off it.
    #[arg(long, default_value = "")]
    pub origin: String,
    #[arg(long, default_value_t = 3000)]
    pub reconnect_delay_ms: u64,
    #[arg(long, default_value_t = 30)]
    pub keepalive_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub snapshot_timeout_secs: u64,
    #[arg(long, default_value_t = false)]
    pub no_snapshot: bool,
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,
    /// Only print activity with these severities.
    #[arg(long = "severity", value_delimiter = ',')]
    pub severities: Vec<Severity>,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    #[arg(long, default_value = "")]
    pub log_dir: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub origin: Url,
    pub ws_url: Url,
    pub stats_url: Url,
    pub reconnect_delay: Duration,
    pub keepalive_interval: Duration,
    pub snapshot_timeout: Duration,
    pub snapshot_enabled: bool,
    pub max_frame_bytes: usize,
    pub severities: Vec<Severity>,
    pub debug: bool,
    pub log_dir: String,
    pub log_stderr: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin {origin:?}: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported origin scheme {0:?}; expected http or https")]
    UnsupportedScheme(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("{flag} must be at most {max}")]
    OutOfRange { flag: &'static str, max: u64 },
}

pub fn load_config(args: Args) -> Result<Config, ConfigError> {
    let raw_origin = resolve_origin(&args.origin);
    let origin = Url::parse(&raw_origin).map_err(|source| ConfigError::InvalidOrigin {
        origin: raw_origin.clone(),
        source,
    })?;
    let ws_url = ws_url_for(&origin)?;
    let stats_url = stats_url_for(&origin)?;

    if args.reconnect_delay_ms == 0 {
        return Err(ConfigError::ZeroDuration("--reconnect-delay-ms"));
    }
    if args.keepalive_secs == 0 {
        return Err(ConfigError::ZeroDuration("--keepalive-secs"));
    }
    if args.keepalive_secs > MAX_KEEPALIVE_SECS {
        return Err(ConfigError::OutOfRange {
            flag: "--keepalive-secs",
            max: MAX_KEEPALIVE_SECS,
        });
    }
    if args.snapshot_timeout_secs == 0 {
        return Err(ConfigError::ZeroDuration("--snapshot-timeout-secs"));
    }

    Ok(Config {
        origin,
        ws_url,
        stats_url,
        reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
        keepalive_interval: Duration::from_secs(args.keepalive_secs),
        snapshot_timeout: Duration::from_secs(args.snapshot_timeout_secs),
        snapshot_enabled: !args.no_snapshot,
        max_frame_bytes: args.max_frame_bytes,
        severities: args.severities,
        debug: args.debug || env_true("RAINGUARD_DEBUG"),
        log_dir: resolve_log_dir(&args.log_dir),
        log_stderr: env_flag("RAINGUARD_LOG_STDERR").unwrap_or(true),
    })
}

/// Socket endpoint for an origin: same host and port, `ws` for `http` and
/// `wss` for `https`.
pub fn ws_url_for(origin: &Url) -> Result<Url, ConfigError> {
    let scheme = match origin.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };
    let mut url = join(origin, WS_PATH)?;
    if url.set_scheme(scheme).is_err() {
        return Err(ConfigError::UnsupportedScheme(origin.scheme().to_string()));
    }
    Ok(url)
}

pub fn stats_url_for(origin: &Url) -> Result<Url, ConfigError> {
    match origin.scheme() {
        "http" | "https" => join(origin, STATS_PATH),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

fn join(origin: &Url, path: &str) -> Result<Url, ConfigError> {
    origin
        .join(path)
        .map_err(|source| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        })
}

fn resolve_origin(origin_flag: &str) -> String {
    if !origin_flag.trim().is_empty() {
        return origin_flag.trim().to_string();
    }
    if let Ok(value) = std::env::var("RAINGUARD_ORIGIN") {
        if !value.trim().is_empty() {
            return value.trim().to_string();
        }
    }
    DEFAULT_ORIGIN.to_string()
}

fn resolve_log_dir(log_dir_flag: &str) -> String {
    if !log_dir_flag.trim().is_empty() {
        return log_dir_flag.to_string();
    }
    if let Ok(value) = std::env::var("RAINGUARD_LOG_DIR") {
        if !value.trim().is_empty() {
            return value;
        }
    }
    String::new()
}

fn env_true(key: &str) -> bool {
    env_flag(key).unwrap_or(false)
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
