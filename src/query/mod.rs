//! Query API Client
//!
//! Request/response access to K-line bars and point-in-time quotes.

pub mod client;
pub mod types;

// Re-export commonly used types
pub use client::QueryClient;
pub use types::{Candle, Interval, Quote};
