//! Inbound frame dispatch
//!
//! Decodes a raw text frame, pulls the tick out of its `body` and hands it to
//! the application sink. Frames without a body are acks/heartbeat replies.

use super::types::Tick;
use crate::error::FeedError;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receives decoded ticks
///
/// Called on the supervisor task; implementations should not block.
pub trait TickSink: Send + Sync {
    fn on_tick(&self, tick: &Tick);
}

/// Forwards every tick into an unbounded channel; a closed receiver drops ticks
impl TickSink for mpsc::UnboundedSender<Tick> {
    fn on_tick(&self, tick: &Tick) {
        if self.send(tick.clone()).is_err() {
            tracing::debug!(symbol = %tick.symbol, "Tick receiver dropped");
        }
    }
}

/// Logs each tick at INFO
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TickSink for LogSink {
    fn on_tick(&self, tick: &Tick) {
        tracing::info!(
            symbol = %tick.symbol,
            price = tick.price,
            change_rate = tick.change_rate,
            bid = tick.bid_price,
            ask = tick.ask_price,
            time = %tick.time,
            "Tick"
        );
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn TickSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn TickSink>) -> Self {
        Self { sink }
    }

    /// Decode a frame into a tick without delivering it
    ///
    /// # Errors
    ///
    /// `Decode` for malformed JSON, or a body that is not a valid tick
    pub fn decode(raw: &str) -> Result<Option<Tick>, FeedError> {
        let frame: Value = serde_json::from_str(raw)
            .map_err(|e| FeedError::decode_with(format!("Malformed frame: {}", e), e))?;

        let body = match frame.get("body") {
            Some(body) if !is_empty(body) => body,
            _ => return Ok(None),
        };

        let tick = match body {
            // Some server builds double-encode the body
            Value::String(encoded) => {
                let inner: Value = serde_json::from_str(encoded).map_err(|e| {
                    FeedError::decode_with(format!("Malformed string body: {}", e), e)
                })?;
                if is_empty(&inner) {
                    return Ok(None);
                }
                serde_json::from_value::<Tick>(inner)
            }
            other => serde_json::from_value::<Tick>(other.clone()),
        }
        .map_err(|e| FeedError::decode_with(format!("Invalid tick body: {}", e), e))?;

        Ok(Some(tick))
    }

    /// Decode a frame and deliver its tick, if any, to the sink
    pub fn dispatch(&self, raw: &str) -> Result<Option<Tick>, FeedError> {
        let tick = Self::decode(raw)?;
        if let Some(tick) = &tick {
            self.sink.on_tick(tick);
        }
        Ok(tick)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// `null`, `{}`, `[]`, `""`, `false` and `0` all count as no body
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
