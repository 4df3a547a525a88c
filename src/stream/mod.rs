//! Streaming Market Data
//!
//! Long-lived subscription to live ticks with automatic reconnect.
//!
//! ## Components
//! - `supervisor`: connection state machine and reconnect loop
//! - `heartbeat`: per-connection ping task bound to one generation
//! - `dispatcher`: frame decoding and delivery to a `TickSink`
//! - `transport`: connection traits the supervisor is written against
//! - `ws`: WebSocket transport (feature `websocket`)

pub mod dispatcher;
pub mod heartbeat;
pub mod supervisor;
pub mod transport;
pub mod types;

#[cfg(feature = "websocket")]
pub mod ws;

// Re-export commonly used types
pub use dispatcher::{Dispatcher, LogSink, TickSink};
pub use supervisor::{Supervisor, SupervisorHandle};
pub use transport::{Connection, Connector, FrameReader, FrameWriter, TransportEvent};
pub use types::{ConnectionState, ConnectionStatus, PingFrame, Subscription, Tick};

#[cfg(feature = "websocket")]
pub use ws::WsConnector;
