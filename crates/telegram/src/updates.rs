//! Long-poll stream of incoming updates.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{self, Stream};
use tracing::{debug, info, warn};

use crate::client::BotClient;
use crate::error::TelegramError;
use crate::types::Update;

/// Backoff applied when `getUpdates` fails.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive failures (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms.min(u64::MAX as f64) as u64);
        delay.min(self.max_delay)
    }

    /// Check if we should retry after the given number of attempts.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_retries.map_or(true, |max| attempts < max)
    }
}

/// A stream of updates. Ends only when retries are exhausted.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<Update, TelegramError>> + Send>>;

struct PollState {
    client: BotClient,
    reconnect: ReconnectConfig,
    offset: i64,
    failures: u32,
    buffer: VecDeque<Update>,
    done: bool,
}

/// Poll `getUpdates` forever with the default backoff.
pub fn subscribe(client: &BotClient) -> UpdateStream {
    subscribe_with_reconnect(client, ReconnectConfig::default())
}

/// Poll `getUpdates` forever.
///
/// Each yielded update is acknowledged by the next poll (its `update_id + 1`
/// becomes the offset). Failures are retried with exponential backoff; once
/// `max_retries` consecutive failures are reached the last error is yielded
/// and the stream ends.
pub fn subscribe_with_reconnect(client: &BotClient, reconnect: ReconnectConfig) -> UpdateStream {
    let state = PollState {
        client: client.clone(),
        reconnect,
        offset: 0,
        failures: 0,
        buffer: VecDeque::new(),
        done: false,
    };

    info!("Starting long-poll update stream");

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            if let Some(update) = state.buffer.pop_front() {
                state.offset = state.offset.max(update.update_id + 1);
                return Some((Ok(update), state));
            }

            match state.client.get_updates(state.offset).await {
                Ok(updates) => {
                    if state.failures > 0 {
                        info!("Update polling restored after {} failures", state.failures);
                    }
                    state.failures = 0;
                    debug!("Received {} updates", updates.len());
                    state.buffer.extend(updates);
                }
                Err(e) => {
                    state.failures += 1;
                    if !state.reconnect.should_retry(state.failures) {
                        warn!("Giving up on update polling: {}", e);
                        state.done = true;
                        return Some((Err(e), state));
                    }
                    let delay = state.reconnect.delay_for_attempt(state.failures - 1);
                    warn!(
                        "getUpdates failed: {} (failures: {}, retry in {:?})",
                        e, state.failures, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_caps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(200), Duration::from_secs(30));
    }

    #[test]
    fn test_should_retry() {
        let config = ReconnectConfig {
            max_retries: Some(2),
            ..Default::default()
        };
        assert!(config.should_retry(1));
        assert!(!config.should_retry(2));
        assert!(ReconnectConfig::default().should_retry(u32::MAX));
    }
}
