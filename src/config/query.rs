//! Query Client Configuration

use super::{env_lookup, parse_secs};
use crate::error::FeedError;
use std::time::Duration;

pub const DEFAULT_KLINE_URL: &str = "http://39.107.99.235:1008/redis.php";
pub const DEFAULT_QUOTE_URL: &str = "http://39.107.99.235:1008/getQuote.php";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Query client configuration
///
/// ## Environment Variables
///
/// - `MARKET_KLINE_URL`: K-line endpoint (default: `http://39.107.99.235:1008/redis.php`)
/// - `MARKET_QUOTE_URL`: Quote endpoint (default: `http://39.107.99.235:1008/getQuote.php`)
/// - `MARKET_HTTP_TIMEOUT_SECS`: Per-request timeout (default: 30)
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub kline_url: String,
    pub quote_url: String,
    /// Whole-request timeout, connect through body
    pub timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            kline_url: DEFAULT_KLINE_URL.to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl QueryConfig {
    /// Load query configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a variable is set to an unparsable or zero value
    pub fn from_env() -> Result<Self, FeedError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let url = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Ok(Self {
            kline_url: url("MARKET_KLINE_URL", defaults.kline_url),
            quote_url: url("MARKET_QUOTE_URL", defaults.quote_url),
            timeout: parse_secs(&lookup, "MARKET_HTTP_TIMEOUT_SECS", defaults.timeout)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = QueryConfig::from_lookup(lookup(&[])).expect("Failed to load config");

        assert_eq!(config.kline_url, DEFAULT_KLINE_URL);
        assert_eq!(config.quote_url, DEFAULT_QUOTE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = QueryConfig::from_lookup(lookup(&[
            ("MARKET_KLINE_URL", "http://127.0.0.1:9000/k"),
            ("MARKET_HTTP_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();

        assert_eq!(config.kline_url, "http://127.0.0.1:9000/k");
        assert_eq!(config.quote_url, DEFAULT_QUOTE_URL);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = QueryConfig::from_lookup(lookup(&[("MARKET_HTTP_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("MARKET_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_garbage_timeout_rejected() {
        assert!(
            QueryConfig::from_lookup(lookup(&[("MARKET_HTTP_TIMEOUT_SECS", "soon")])).is_err()
        );
    }
}
