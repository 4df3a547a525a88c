//! Streaming wire types and connection state

use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Live market update pushed inside the `body` of an inbound frame
///
/// Example body:
/// ```json
/// {
///   "StockCode": "btcusdt", "Price": 67650.5, "Open": 67000, "LastClose": 66900,
///   "High": 67800, "Low": 66850, "Diff": 750.5, "DiffRate": 1.12,
///   "BP1": 67650.0, "BV1": 1.2, "SP1": 67651.0, "SV1": 0.8, "TotalVol": 12345.6,
///   "Time": "2024-05-01 10:00:01", "LastTime": "2024-05-01 10:00:00",
///   "BS": "B", "Depth": {"Buy": [], "Sell": []}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    #[serde(rename = "StockCode")]
    pub symbol: String,

    /// Last traded price
    #[serde(rename = "Price", deserialize_with = "crate::lenient::f64")]
    pub price: f64,

    #[serde(rename = "Open", default, deserialize_with = "crate::lenient::f64")]
    pub open: f64,

    #[serde(rename = "LastClose", default, deserialize_with = "crate::lenient::f64")]
    pub prev_close: f64,

    #[serde(rename = "High", default, deserialize_with = "crate::lenient::f64")]
    pub high: f64,

    #[serde(rename = "Low", default, deserialize_with = "crate::lenient::f64")]
    pub low: f64,

    /// Absolute change against the previous close
    #[serde(rename = "Diff", default, deserialize_with = "crate::lenient::f64")]
    pub change: f64,

    /// Percentage change against the previous close
    #[serde(rename = "DiffRate", default, deserialize_with = "crate::lenient::f64")]
    pub change_rate: f64,

    #[serde(rename = "BP1", default, deserialize_with = "crate::lenient::f64")]
    pub bid_price: f64,

    #[serde(rename = "BV1", default, deserialize_with = "crate::lenient::f64")]
    pub bid_size: f64,

    #[serde(rename = "SP1", default, deserialize_with = "crate::lenient::f64")]
    pub ask_price: f64,

    #[serde(rename = "SV1", default, deserialize_with = "crate::lenient::f64")]
    pub ask_size: f64,

    /// Cumulative session volume
    #[serde(rename = "TotalVol", default, deserialize_with = "crate::lenient::f64")]
    pub volume: f64,

    /// Server time of this update
    #[serde(rename = "Time", default, deserialize_with = "crate::lenient::string")]
    pub time: String,

    /// Server time of the previous update
    #[serde(rename = "LastTime", default, deserialize_with = "crate::lenient::string")]
    pub last_time: String,

    /// Buy/sell flag, passed through as sent
    #[serde(rename = "BS", default)]
    pub side: Value,

    /// Depth snapshot, passed through as sent
    #[serde(rename = "Depth", default)]
    pub depth: Value,
}

impl Tick {
    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }
}

/// The single product key the stream subscribes to
///
/// Sent verbatim, so a service-side list such as `btcusdt,ethusdt` passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    key: String,
    frame: String,
}

impl Subscription {
    pub fn new(key: impl Into<String>) -> Result<Self, FeedError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(FeedError::invalid_argument(
                "Subscription key must not be empty",
            ));
        }
        let frame = serde_json::to_string(&SubscribeFrame { key: &key })?;
        Ok(Self { key, frame })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Outbound subscribe frame: `{"Key":"<key>"}`
    pub fn frame(&self) -> &str {
        &self.frame
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Serialize)]
struct SubscribeFrame<'a> {
    #[serde(rename = "Key")]
    key: &'a str,
}

/// Outbound heartbeat frame: `{"ping":<epoch-seconds>}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingFrame {
    pub ping: i64,
}

impl PingFrame {
    pub fn at(epoch_secs: i64) -> Self {
        Self { ping: epoch_secs }
    }

    pub fn to_json(&self) -> Result<String, FeedError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Supervisor connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Snapshot published by the supervisor on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Generation of the most recent successful connection; 0 before the first
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_deserialization() {
        let json = r#"{
            "StockCode": "btcusdt",
            "Price": "67650.5",
            "Open": 67000,
            "LastClose": 66900,
            "High": 67800,
            "Low": 66850,
            "Diff": 750.5,
            "DiffRate": 1.12,
            "BP1": 67650.0,
            "BV1": 1.2,
            "SP1": 67651.0,
            "SV1": 0.8,
            "TotalVol": 12345.6,
            "Time": "2024-05-01 10:00:01",
            "LastTime": 1714557600,
            "BS": "B",
            "Depth": {"Buy": [[67650.0, 1.2]], "Sell": [[67651.0, 0.8]]}
        }"#;

        let tick: Tick = serde_json::from_str(json).unwrap();
        assert_eq!(tick.symbol, "btcusdt");
        assert_eq!(tick.price, 67650.5);
        assert_eq!(tick.prev_close, 66900.0);
        assert_eq!(tick.last_time, "1714557600");
        assert_eq!(tick.side, Value::from("B"));
        assert_eq!(tick.depth["Buy"][0][1], 1.2);
        assert_eq!(tick.spread(), 1.0);
    }

    #[test]
    fn test_tick_requires_symbol_and_price() {
        assert!(serde_json::from_str::<Tick>(r#"{"Price": 1}"#).is_err());
        assert!(serde_json::from_str::<Tick>(r#"{"StockCode": "x"}"#).is_err());

        let minimal: Tick = serde_json::from_str(r#"{"StockCode": "x", "Price": 2}"#).unwrap();
        assert_eq!(minimal.volume, 0.0);
        assert!(minimal.depth.is_null());
    }

    #[test]
    fn test_subscribe_frame() {
        let sub = Subscription::new("btcusdt").unwrap();
        assert_eq!(sub.frame(), r#"{"Key":"btcusdt"}"#);
        assert!(Subscription::new("").is_err());
        assert!(Subscription::new("  ").is_err());
    }

    #[test]
    fn test_subscription_key_kept_verbatim() {
        let sub = Subscription::new(" btcusdt,ethusdt ").unwrap();
        assert_eq!(sub.key(), " btcusdt,ethusdt ");
        assert_eq!(sub.frame(), r#"{"Key":" btcusdt,ethusdt "}"#);

        let sub = Subscription::new(r#"odd"key\"#).unwrap();
        let frame: Value = serde_json::from_str(sub.frame()).unwrap();
        assert_eq!(frame["Key"], r#"odd"key\"#);
    }

    #[test]
    fn test_ping_frame() {
        let frame = PingFrame::at(1_714_557_600);
        let json = frame.to_json().unwrap();
        assert_eq!(json, r#"{"ping":1714557600}"#);
        let back: PingFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
        assert_eq!(PingFrame::at(-1).to_json().unwrap(), r#"{"ping":-1}"#);
    }
}
