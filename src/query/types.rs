//! Query API Type Definitions
//!
//! Types for the K-line and quote endpoints. Both endpoints are loose with
//! JSON number/string types, so numeric fields go through [`crate::lenient`].

use crate::error::FeedError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// K-line bar interval accepted by the `time` query parameter
///
/// Case matters: `1m` is one minute, `1M` is one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    OneMonth,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::OneMonth,
    ];

    /// Wire value sent as the `time` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneMonth => "1M",
        }
    }

    fn valid_set() -> String {
        Self::ALL
            .iter()
            .map(Interval::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| {
                FeedError::invalid_argument(format!(
                    "Unsupported interval '{}'; supported intervals: {}",
                    s,
                    Self::valid_set()
                ))
            })
    }
}

/// One K-line bar
///
/// Decoded from the 7-element array
/// `[timestamp, open, high, low, close, datetime, volume]`.
/// Serializes as a named-field object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CandleRow")]
pub struct Candle {
    /// Bar open time, seconds since Unix epoch
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Human-readable bar time as formatted by the service
    pub datetime: String,
    pub volume: f64,
}

impl Candle {
    /// Bar open time as UTC, if the timestamp is representable
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

/// Positional wire form of [`Candle`]
#[derive(Deserialize)]
struct CandleRow(
    #[serde(deserialize_with = "crate::lenient::i64")] i64,
    #[serde(deserialize_with = "crate::lenient::f64")] f64,
    #[serde(deserialize_with = "crate::lenient::f64")] f64,
    #[serde(deserialize_with = "crate::lenient::f64")] f64,
    #[serde(deserialize_with = "crate::lenient::f64")] f64,
    #[serde(deserialize_with = "crate::lenient::string")] String,
    #[serde(deserialize_with = "crate::lenient::f64")] f64,
);

impl From<CandleRow> for Candle {
    fn from(row: CandleRow) -> Self {
        let CandleRow(timestamp, open, high, low, close, datetime, volume) = row;
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            datetime,
            volume,
        }
    }
}

/// Envelope returned by the quote endpoint
///
/// # Example Response
/// ```json
/// {
///   "code": 200,
///   "msg": "success",
///   "data": { "body": { "StockCode": "btcusdt", "Price": 67650.5, "BP1": 67650.0 } }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuoteEnvelope {
    #[serde(deserialize_with = "crate::lenient::i64")]
    pub code: i64,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub msg: String,
    /// Left untyped: error envelopes send `""` or `null` here
    #[serde(default)]
    pub data: Value,
}

/// Point-in-time quote
///
/// Only the envelope status is validated; the body is kept as a field map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub code: i64,
    pub message: String,
    pub body: Map<String, Value>,
}

impl Quote {
    pub const SUCCESS_CODE: i64 = 200;

    /// Raw body field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Body field read as a number; numeric strings are accepted
    pub fn number(&self, name: &str) -> Option<f64> {
        self.field(name)
            .filter(|v| !v.is_null())
            .and_then(|v| crate::lenient::value_to_f64(v).ok())
    }

    /// Body field read as text; numbers are rendered as JSON text
    pub fn text(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn symbol(&self) -> Option<String> {
        self.text("StockCode")
    }

    pub fn price(&self) -> Option<f64> {
        self.number("Price")
    }
}

impl TryFrom<QuoteEnvelope> for Quote {
    type Error = FeedError;

    fn try_from(envelope: QuoteEnvelope) -> Result<Self, Self::Error> {
        if envelope.code != Quote::SUCCESS_CODE {
            let message = if envelope.msg.is_empty() {
                "unknown error".to_string()
            } else {
                envelope.msg
            };
            return Err(FeedError::Remote {
                status: envelope.code,
                message,
            });
        }

        // Body shape is not validated; anything but an object reads as empty
        let body = match envelope.data {
            Value::Object(mut data) => match data.remove("body") {
                Some(Value::Object(body)) => body,
                _ => Map::new(),
            },
            _ => Map::new(),
        };

        Ok(Self {
            code: envelope.code,
            message: envelope.msg,
            body,
        })
    }
}
