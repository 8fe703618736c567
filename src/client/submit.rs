// ABOUTME: Rate-limited, concurrency-capped submission API built on top of SmppTransmitter
// ABOUTME: Applies a token-bucket rate_limit and Semaphore-backed window_size across segments

use crate::client::error::SmppError;
use crate::client::traits::SmppTransmitter;
use crate::client::types::{SmsMessage, SmsOptions};
use crate::datatypes::CommandStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};

const DEFAULT_WINDOW_SIZE: usize = 10;

/// Configuration for [`SubmitApi`].
#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    /// Maximum sustained submission rate in messages/sec. `None` means unlimited.
    pub rate_limit: Option<f64>,
    /// Maximum number of in-flight `submit_sm` requests at any time.
    pub window_size: usize,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            rate_limit: None,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Error surfaced to a [`SubmitApi`] caller. Transient statuses are exposed
/// distinctly so the caller can decide whether to retry; this API never
/// retries submissions itself.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("rate limited or throttled by peer: {0:?}")]
    RateLimited(CommandStatus),

    #[error("submission failed with status {0:?}")]
    Status(CommandStatus),

    #[error(transparent)]
    Client(#[from] SmppError),
}

/// A simple token bucket: one token refills every `1 / rate` seconds, up to a
/// burst of one token, and `acquire` waits until a token is available.
struct TokenBucket {
    interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(rate_per_sec: f64) -> Self {
        let interval = if rate_per_sec <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / rate_per_sec)
        };
        Self {
            interval,
            last_refill: Instant::now() - interval,
        }
    }

    async fn acquire(&mut self) {
        if self.interval.is_zero() {
            return;
        }
        let elapsed = self.last_refill.elapsed();
        if elapsed < self.interval {
            tokio::time::sleep(self.interval - elapsed).await;
        }
        self.last_refill = Instant::now();
    }
}

/// Wraps an [`SmppTransmitter`] with the submission-layer rate limiting and
/// concurrency controls.
///
/// Each segment of an outbound message counts individually against both the
/// token-bucket rate limiter and the `window_size` semaphore; a multi-segment
/// message submits its segments serially through `client`, so `window_size`
/// here bounds how many *messages* are concurrently being segmented and
/// submitted when `SubmitApi::submit` is called concurrently from multiple
/// tasks sharing one instance.
pub struct SubmitApi<C> {
    client: Arc<Mutex<C>>,
    bucket: Option<Arc<Mutex<TokenBucket>>>,
    semaphore: Arc<Semaphore>,
}

impl<C: SmppTransmitter> SubmitApi<C> {
    pub fn new(client: C, options: SubmitOptions) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            bucket: options.rate_limit.map(|rate| Arc::new(Mutex::new(TokenBucket::new(rate)))),
            semaphore: Arc::new(Semaphore::new(options.window_size.max(1))),
        }
    }

    /// Submit `text` from `from` to `to`, segmenting as needed, and return
    /// the ordered message IDs assigned to each segment.
    pub async fn submit(
        &self,
        to: &str,
        from: &str,
        text: &str,
        options: SmsOptions,
    ) -> Result<Vec<String>, OperationError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore never closed");

        if let Some(bucket) = &self.bucket {
            bucket.lock().await.acquire().await;
        }

        let mut message = SmsMessage::new(to, from, text);
        message.options = options;

        let mut client = self.client.lock().await;
        match client.send_sms(&message).await {
            Ok(ids) => Ok(ids.split(',').map(str::to_string).collect()),
            Err(SmppError::Protocol(status)) if status.should_retry() => {
                Err(OperationError::RateLimited(status))
            }
            Err(SmppError::Protocol(status)) => Err(OperationError::Status(status)),
            Err(e) => Err(OperationError::Client(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_limit_does_not_sleep() {
        let bucket = TokenBucket::new(0.0);
        assert_eq!(bucket.interval, Duration::ZERO);
    }

    #[test]
    fn submit_options_default_window_is_ten() {
        let options = SubmitOptions::default();
        assert_eq!(options.window_size, DEFAULT_WINDOW_SIZE);
        assert!(options.rate_limit.is_none());
    }
}
