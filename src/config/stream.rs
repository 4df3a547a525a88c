//! Streaming Connection Configuration

use super::{env_lookup, parse_secs, parse_var};
use crate::error::FeedError;
use std::time::Duration;

pub const DEFAULT_WS_URL: &str = "ws://39.107.99.235/ws";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Reconnect policy for the connection supervisor
///
/// The delay is fixed, not exponential. With `max_attempts: None` the
/// supervisor retries forever, which assumes the endpoint comes back;
/// `Some(n)` stops after `n` consecutive failed connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait between a failure/close and the next connection attempt
    pub delay: Duration,
    /// Consecutive failed attempts tolerated before giving up
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// True once `consecutive_failures` has used up the attempt budget
    pub fn exhausted(&self, consecutive_failures: u32) -> bool {
        self.max_attempts
            .is_some_and(|max| consecutive_failures >= max)
    }
}

/// Streaming client configuration
///
/// ## Environment Variables
///
/// - `MARKET_WS_URL`: WebSocket endpoint (default: `ws://39.107.99.235/ws`)
/// - `MARKET_RECONNECT_DELAY_SECS`: Fixed reconnect delay (default: 5)
/// - `MARKET_MAX_RECONNECT_ATTEMPTS`: Give up after this many consecutive failures (default: unbounded)
/// - `MARKET_HEARTBEAT_INTERVAL_SECS`: Ping interval (default: 10)
/// - `MARKET_CONNECT_TIMEOUT_SECS`: Connection handshake timeout (default: 10)
/// - `MARKET_READ_IDLE_TIMEOUT_SECS`: Reconnect when nothing is received for this long (default: 180, 0 disables)
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    /// `None` disables idle detection
    pub read_idle_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_idle_timeout: Some(DEFAULT_READ_IDLE_TIMEOUT),
        }
    }
}

impl StreamConfig {
    /// Load streaming configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a variable is unparsable, or a delay/interval is zero
    pub fn from_env() -> Result<Self, FeedError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let url = lookup("MARKET_WS_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.url);

        let max_attempts = match lookup("MARKET_MAX_RECONNECT_ATTEMPTS") {
            Some(raw) if !raw.trim().is_empty() => {
                let max: u32 = parse_var(&lookup, "MARKET_MAX_RECONNECT_ATTEMPTS", 0)?;
                if max == 0 {
                    return Err(FeedError::invalid_argument(format!(
                        "MARKET_MAX_RECONNECT_ATTEMPTS must be greater than 0, got '{}'",
                        raw.trim()
                    )));
                }
                Some(max)
            }
            _ => None,
        };

        let idle_secs: u64 = parse_var(
            &lookup,
            "MARKET_READ_IDLE_TIMEOUT_SECS",
            DEFAULT_READ_IDLE_TIMEOUT.as_secs(),
        )?;

        Ok(Self {
            url,
            reconnect: ReconnectPolicy {
                delay: parse_secs(&lookup, "MARKET_RECONNECT_DELAY_SECS", defaults.reconnect.delay)?,
                max_attempts,
            },
            heartbeat_interval: parse_secs(
                &lookup,
                "MARKET_HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval,
            )?,
            connect_timeout: parse_secs(
                &lookup,
                "MARKET_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            )?,
            read_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
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
        let config = StreamConfig::from_lookup(lookup(&[])).expect("Failed to load config");

        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.url, "ws://39.107.99.235/ws");
        assert_eq!(config.reconnect.delay, Duration::from_secs(5));
        assert_eq!(config.reconnect.max_attempts, None);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.read_idle_timeout, Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_overrides() {
        let config = StreamConfig::from_lookup(lookup(&[
            ("MARKET_WS_URL", "ws://localhost:9001/ws"),
            ("MARKET_RECONNECT_DELAY_SECS", "2"),
            ("MARKET_MAX_RECONNECT_ATTEMPTS", "7"),
            ("MARKET_HEARTBEAT_INTERVAL_SECS", "3"),
            ("MARKET_READ_IDLE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.url, "ws://localhost:9001/ws");
        assert_eq!(config.reconnect.delay, Duration::from_secs(2));
        assert_eq!(config.reconnect.max_attempts, Some(7));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(3));
        assert_eq!(config.read_idle_timeout, None);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(StreamConfig::from_lookup(lookup(&[("MARKET_RECONNECT_DELAY_SECS", "0")])).is_err());
        assert!(
            StreamConfig::from_lookup(lookup(&[("MARKET_HEARTBEAT_INTERVAL_SECS", "0")])).is_err()
        );
        assert!(
            StreamConfig::from_lookup(lookup(&[("MARKET_MAX_RECONNECT_ATTEMPTS", "0")])).is_err()
        );
    }

    #[test]
    fn test_policy_exhaustion() {
        let unbounded = ReconnectPolicy::default();
        assert!(!unbounded.exhausted(u32::MAX));

        let bounded = ReconnectPolicy {
            delay: Duration::from_secs(1),
            max_attempts: Some(3),
        };
        assert!(!bounded.exhausted(2));
        assert!(bounded.exhausted(3));
    }
}
