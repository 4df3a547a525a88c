//! Market Data Query Client
//!
//! HTTP client for the K-line and quote endpoints.
//! Advertises compressed responses, decompresses them itself, and never retries.

use crate::config::QueryConfig;
use crate::error::FeedError;
use crate::query::types::{Candle, Interval, Quote, QuoteEnvelope};
use flate2::read::{GzDecoder, ZlibDecoder};
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use reqwest::Client;
use std::io::Read;
use std::time::Instant;

/// Value sent in `Accept-Encoding` on every request
pub const ACCEPTED_ENCODINGS: &str = "gzip, deflate";

/// Query client for candles and quotes
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct QueryClient {
    client: Client,
    kline_url: String,
    quote_url: String,
}

impl QueryClient {
    /// Creates a client from configuration
    ///
    /// # Errors
    /// `Transport` if the HTTP client cannot be constructed (TLS backend init)
    pub fn new(config: &QueryConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("market-feed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::transport_with("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            kline_url: config.kline_url.clone(),
            quote_url: config.quote_url.clone(),
        })
    }

    pub fn kline_url(&self) -> &str {
        &self.kline_url
    }

    pub fn quote_url(&self) -> &str {
        &self.quote_url
    }

    /// Get K-line bars
    ///
    /// Calls `GET <kline_url>?code=<symbol>&time=<interval>&rows=<count>`
    ///
    /// # Arguments
    /// * `symbol` - Product code (e.g., "fx_sgbpusd")
    /// * `interval` - One of `1m, 5m, 15m, 30m, 1h, 1d, 1M`
    /// * `count` - Number of bars, must be positive
    ///
    /// # Returns
    /// Bars in the order the service returned them (newest first in observed
    /// usage, but not guaranteed)
    ///
    /// # Errors
    /// * `InvalidArgument` - Blank symbol, unknown interval or zero count; no request is sent
    /// * `Transport` - DNS, connect or timeout failure
    /// * `Remote` - Non-success HTTP status
    /// * `Decode` - Corrupt compressed body or malformed JSON
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        count: u32,
    ) -> Result<Vec<Candle>, FeedError> {
        let symbol = validate_symbol(symbol)?;
        let interval: Interval = interval.parse()?;
        if count == 0 {
            return Err(FeedError::invalid_argument(
                "Row count must be greater than 0",
            ));
        }

        let rows = count.to_string();
        let text = self
            .get_text(
                &self.kline_url,
                &[("code", symbol), ("time", interval.as_str()), ("rows", rows.as_str())],
            )
            .await?;

        let candles: Vec<Candle> = serde_json::from_str(&text)?;
        tracing::debug!(
            symbol,
            interval = %interval,
            requested = count,
            received = candles.len(),
            "Fetched candles"
        );
        Ok(candles)
    }

    /// Get the latest quote for a product
    ///
    /// Calls `GET <quote_url>?code=<symbol>` and requires `code == 200` in the envelope.
    ///
    /// # Errors
    /// * `InvalidArgument` - Blank symbol; no request is sent
    /// * `Transport` - DNS, connect or timeout failure
    /// * `Remote` - Non-success HTTP status, or envelope code other than 200 (carries `msg`)
    /// * `Decode` - Corrupt compressed body or malformed JSON
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FeedError> {
        let symbol = validate_symbol(symbol)?;

        let text = self.get_text(&self.quote_url, &[("code", symbol)]).await?;
        let envelope: QuoteEnvelope = serde_json::from_str(&text)?;
        let quote = Quote::try_from(envelope)?;

        tracing::debug!(symbol, fields = quote.body.len(), "Fetched quote");
        Ok(quote)
    }

    /// Issues one GET and returns the (decompressed) body text
    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FeedError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT_ENCODING, ACCEPTED_ENCODINGS)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Market data request failed");
            return Err(FeedError::Remote {
                status: i64::from(status.as_u16()),
                message: format!("HTTP request failed with status {}", status),
            });
        }

        let encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);

        let body = response.bytes().await?;
        tracing::debug!(
            url,
            bytes = body.len(),
            encoding = encoding.as_deref().unwrap_or("identity"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received response body"
        );

        decode_body(&body, encoding.as_deref())
    }
}

/// Rejects blank codes; the code itself is sent as given
fn validate_symbol(symbol: &str) -> Result<&str, FeedError> {
    if symbol.trim().is_empty() {
        return Err(FeedError::invalid_argument("Product code must not be empty"));
    }
    Ok(symbol)
}

/// Turns a response body into text according to its `Content-Encoding`
pub fn decode_body(body: &[u8], encoding: Option<&str>) -> Result<String, FeedError> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());

    let bytes = match encoding.as_deref() {
        None | Some("") | Some("identity") => return utf8(body.to_vec()),
        Some("gzip") | Some("x-gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(body)
                .read_to_end(&mut out)
                .map_err(|e| FeedError::decode_with("Failed to decompress gzip body", e))?;
            out
        }
        Some("deflate") => {
            let mut out = Vec::new();
            ZlibDecoder::new(body)
                .read_to_end(&mut out)
                .map_err(|e| FeedError::decode_with("Failed to decompress deflate body", e))?;
            out
        }
        Some(other) => {
            return Err(FeedError::decode(format!(
                "Unsupported content encoding '{}'",
                other
            )))
        }
    };

    utf8(bytes)
}

fn utf8(bytes: Vec<u8>) -> Result<String, FeedError> {
    String::from_utf8(bytes).map_err(|e| FeedError::decode_with("Response body is not UTF-8", e))
}
