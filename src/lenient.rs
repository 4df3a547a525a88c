//! Tolerant field decoders
//!
//! The market-data service is loose with JSON types: prices arrive as numbers
//! in one feed and numeric strings in another, and absent values are sent as
//! `null`. These helpers are used with `#[serde(deserialize_with = ...)]`.

use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value;

/// Reads a JSON number or numeric string as `f64`; `null` and `""` read as `0.0`
pub fn f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_f64(&value).map_err(de::Error::custom)
}

/// Reads a JSON number or numeric string as `i64`
pub fn i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_i64(&value).map_err(de::Error::custom)
}

/// Reads a string, rendering numbers as their JSON text; `null` reads as `""`
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected string, found {}", other))),
    }
}

pub fn value_to_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {} out of range", n)),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number '{}': {}", s, e)),
        Value::Null => Ok(0.0),
        other => Err(format!("expected number, found {}", other)),
    }
}

pub fn value_to_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| format!("expected integer, found {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid integer '{}': {}", s, e)),
        other => Err(format!("expected integer, found {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "f64")]
        price: f64,
        #[serde(deserialize_with = "i64")]
        code: i64,
        #[serde(deserialize_with = "string")]
        time: String,
    }

    #[test]
    fn test_numbers_and_strings_are_interchangeable() {
        let a: Sample =
            serde_json::from_str(r#"{"price": 1.25, "code": 200, "time": "09:30:00"}"#).unwrap();
        let b: Sample =
            serde_json::from_str(r#"{"price": "1.25", "code": "200", "time": 1700000000}"#)
                .unwrap();

        assert_eq!(a.price, b.price);
        assert_eq!(a.code, b.code);
        assert_eq!(b.time, "1700000000");
    }

    #[test]
    fn test_null_price_reads_as_zero() {
        let s: Sample = serde_json::from_str(r#"{"price": null, "code": 1, "time": null}"#).unwrap();
        assert_eq!(s.price, 0.0);
        assert_eq!(s.time, "");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"price": "abc", "code": 1, "time": ""}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"price": 1, "code": 1.5, "time": ""}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"price": [1], "code": 1, "time": ""}"#).is_err());
    }
}
