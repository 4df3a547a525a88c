//! Configuration Management
//!
//! Endpoint URLs, timeouts and reconnect policy, loaded from environment
//! variables with defaults that match the public service.

pub mod query;
pub mod stream;

// Re-export
pub use query::QueryConfig;
pub use stream::{ReconnectPolicy, StreamConfig};

use crate::error::FeedError;
use std::str::FromStr;
use std::time::Duration;

/// Reads `key` through `lookup` and parses it, falling back to `default` when unset or blank
pub(crate) fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, FeedError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            FeedError::invalid_argument(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
        _ => Ok(default),
    }
}

/// Reads a whole-second duration; zero is rejected
pub(crate) fn parse_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, FeedError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_var(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(FeedError::invalid_argument(format!(
            "{} must be greater than 0",
            key
        )));
    }
    Ok(Duration::from_secs(secs))
}

pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
