use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/top-headlines";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub news_api_key: String,
    pub news_api_url: String,
    pub news_language: String,
    pub news_page_size: u32,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    /// Applied to every outbound call.
    pub upstream_timeout: Duration,
    /// Upper bound on a whole handler invocation.
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup instead of the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::ConfigurationMissing(key.to_string()))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let news_api_key = required("NEWS_API_KEY")?;
        let gemini_api_key = required("GEMINI_API_KEY")?;

        // Load server configuration with defaults
        let host = optional("HOST", "127.0.0.1");
        let port = optional("PORT", "8000");
        let port = port
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        let bounded = |key: &str, default: &str, min: u32, max: u32| {
            parse_bounded(key, &optional(key, default), min, max)
        };
        let news_page_size = bounded("NEWS_PAGE_SIZE", "5", 1, 100)?;
        let upstream_timeout = bounded("UPSTREAM_TIMEOUT_SECS", "20", 1, 300)?;
        let request_timeout = bounded("REQUEST_TIMEOUT_SECS", "60", 1, 600)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            news_api_key,
            news_api_url: optional("NEWS_API_URL", DEFAULT_NEWS_API_URL),
            news_language: optional("NEWS_LANGUAGE", "en"),
            news_page_size,
            gemini_api_key,
            gemini_api_url: optional("GEMINI_API_URL", DEFAULT_GEMINI_API_URL)
                .trim_end_matches('/')
                .to_string(),
            gemini_model: optional("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            upstream_timeout: Duration::from_secs(upstream_timeout.into()),
            request_timeout: Duration::from_secs(request_timeout.into()),
        })
    }
}

fn parse_bounded(key: &str, raw: &str, min: u32, max: u32) -> Result<u32> {
    let value = raw
        .parse::<u32>()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e)))?;
    if !(min..=max).contains(&value) {
        return Err(AppError::Config(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )));
    }
    Ok(value)
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_addr", &self.server_addr)
            .field("news_api_key", &"<redacted>")
            .field("news_api_url", &self.news_api_url)
            .field("news_language", &self.news_language)
            .field("news_page_size", &self.news_page_size)
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_api_url", &self.gemini_api_url)
            .field("gemini_model", &self.gemini_model)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
