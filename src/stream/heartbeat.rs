//! Connection heartbeat
//!
//! Sends `{"ping":<epoch-seconds>}` on a fixed interval for exactly one
//! connection generation. The task exits as soon as its stop token fires or
//! the supervisor moves the live generation on, and never writes after that.

use super::transport::SharedWriter;
use super::types::PingFrame;
use crate::error::FeedError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reported to the supervisor when a ping could not be written
#[derive(Debug)]
pub struct HeartbeatFailed {
    pub generation: u64,
    pub error: FeedError,
}

pub struct Heartbeat {
    generation: u64,
    interval: Duration,
    writer: SharedWriter,
    live: Arc<AtomicU64>,
    failures: mpsc::UnboundedSender<HeartbeatFailed>,
}

impl Heartbeat {
    /// `live` holds the supervisor's current generation, 0 while no connection is up
    pub fn new(
        generation: u64,
        interval: Duration,
        writer: SharedWriter,
        live: Arc<AtomicU64>,
        failures: mpsc::UnboundedSender<HeartbeatFailed>,
    ) -> Self {
        Self {
            generation,
            interval,
            writer,
            live,
            failures,
        }
    }

    pub fn spawn(self, stop: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(stop))
    }

    async fn run(self, stop: CancellationToken) {
        let clock = EpochClock::start();
        let mut sent: u64 = 0;

        tracing::debug!(generation = self.generation, interval = ?self.interval, "Heartbeat started");

        loop {
            if !self.is_current(&stop) {
                break;
            }

            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            if !self.is_current(&stop) {
                break;
            }

            let frame = PingFrame::at(clock.now_secs());
            let result = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                result = self.send(&stop, frame) => result,
            };

            match result {
                Ok(true) => {
                    sent += 1;
                    tracing::trace!(generation = self.generation, ping = frame.ping, "Ping sent");
                }
                Ok(false) => break,
                Err(error) => {
                    tracing::warn!(
                        generation = self.generation,
                        error = %error,
                        "Heartbeat send failed"
                    );
                    let _ = self.failures.send(HeartbeatFailed {
                        generation: self.generation,
                        error,
                    });
                    break;
                }
            }
        }

        tracing::debug!(generation = self.generation, pings = sent, "Heartbeat stopped");
    }

    fn is_current(&self, stop: &CancellationToken) -> bool {
        !stop.is_cancelled() && self.live.load(Ordering::SeqCst) == self.generation
    }

    /// Returns `Ok(false)` without writing when the generation went stale while waiting for the lock
    async fn send(&self, stop: &CancellationToken, frame: PingFrame) -> Result<bool, FeedError> {
        let mut writer = self.writer.lock().await;
        if !self.is_current(stop) {
            return Ok(false);
        }
        writer.send_text(frame.to_json()?).await?;
        Ok(true)
    }
}

/// Wall-clock seconds anchored once, advanced by the monotonic clock
struct EpochClock {
    anchor: i64,
    started: Instant,
}

impl EpochClock {
    fn start() -> Self {
        Self {
            anchor: chrono::Utc::now().timestamp(),
            started: Instant::now(),
        }
    }

    fn now_secs(&self) -> i64 {
        self.anchor + self.started.elapsed().as_secs() as i64
    }
}
