// Library exports for market-feed

pub mod error;
pub mod lenient; // Tolerant JSON field decoders

pub mod config; // Configuration management
pub mod format; // Markdown output helpers
pub mod query; // K-line and quote HTTP client
pub mod stream; // Live tick subscription and connection supervisor

pub use error::{FeedError, Result};
pub use query::{Candle, Interval, Quote, QueryClient};
pub use stream::{Subscription, Supervisor, SupervisorHandle, Tick, TickSink};
