//! API configuration (code > env).

use std::time::Duration;

use thiserror::Error;

/// Default request deadline when the environment does not override it.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Environment variable holding the backend base URL.
pub const ENV_API_URL: &str = "VITRINE_API_URL";
/// Environment variable overriding the request timeout, in milliseconds.
pub const ENV_API_TIMEOUT_MS: &str = "VITRINE_API_TIMEOUT_MS";

/// Configuration errors surfaced by [`ApiConfig::from_env`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Backend connection settings injected into every service.
///
/// Owned by the composition root and passed by value; nothing in the crate
/// reads ambient configuration after construction.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use vitrine::config::ApiConfig;
///
/// let config = ApiConfig::new("https://api.example.shop")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from environment variables (`VITRINE_API_URL`,
    /// `VITRINE_API_TIMEOUT_MS`), reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let base_url =
            std::env::var(ENV_API_URL).map_err(|_| ConfigError::MissingVar(ENV_API_URL))?;
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var(ENV_API_TIMEOUT_MS) {
            let millis: u64 = raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: ENV_API_TIMEOUT_MS,
                value: raw,
            })?;
            config.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Join a request path onto the base URL. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_slashes() {
        let config = ApiConfig::new("https://api.example.shop/");
        assert_eq!(
            config.url_for("/auth/profile"),
            "https://api.example.shop/auth/profile"
        );
        assert_eq!(
            config.url_for("orders"),
            "https://api.example.shop/orders"
        );
    }

    #[test]
    fn url_for_passes_absolute_urls_through() {
        let config = ApiConfig::new("https://api.example.shop");
        assert_eq!(
            config.url_for("https://cdn.example.shop/img/1.png"),
            "https://cdn.example.shop/img/1.png"
        );
    }

    #[test]
    fn default_timeout_applies() {
        let config = ApiConfig::new("https://api.example.shop");
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }
}
