//! Server configuration from environment variables
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8888` |
//! | `CALENDAR_BASE_URL` | `https://tradingeconomics.com` |
//! | `CALENDAR_RPS` | `2.0` |
//! | `CALENDAR_TIMEOUT_SECS` | `30` |
//! | `CALENDAR_MAX_RETRIES` | `3` |
//! | `CALENDAR_LAYOUT` | unset: built-in layout |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use econcal_core::{ClientConfig, Layout};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub client: ClientConfig,
    /// JSON layout file overriding the built-in layout
    pub layout_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset or blank keys take defaults.
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ClientConfig::default();

        let bind_addr = parse_or(get("BIND_ADDR"), "BIND_ADDR", DEFAULT_BIND_ADDR.parse::<SocketAddr>()?)?;
        let client = ClientConfig {
            base_url: get("CALENDAR_BASE_URL").unwrap_or(defaults.base_url),
            requests_per_second: parse_or(get("CALENDAR_RPS"), "CALENDAR_RPS", defaults.requests_per_second)?,
            timeout_secs: parse_or(get("CALENDAR_TIMEOUT_SECS"), "CALENDAR_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_retries: parse_or(get("CALENDAR_MAX_RETRIES"), "CALENDAR_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay_ms: defaults.retry_base_delay_ms,
        };

        Ok(Self {
            bind_addr,
            client,
            layout_path: get("CALENDAR_LAYOUT").map(PathBuf::from),
        })
    }

    /// Load the extraction layout, falling back to the built-in one.
    pub fn layout(&self) -> Result<Layout> {
        let Some(path) = &self.layout_path else {
            return Ok(Layout::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading layout file {}", path.display()))?;
        Layout::from_json(&json).with_context(|| format!("parsing layout file {}", path.display()))
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
