//! Long-polling transport.
//!
//! [`PollingRunner`] feeds the dispatcher from `getUpdates`. Each tick keeps
//! fetching from `last_offset + 1` until the platform returns an empty batch,
//! processing every update to completion before the next one. Ticks are
//! awaited inline, so two ticks never overlap.
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let runner = PollingRunner::new(dispatcher, PollingConfig::default());
//! runner.run(cancel.child_token()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{TransportError, TransportResult};
use gramkit_core::api::GetUpdates;
use gramkit_core::{Update, UpdateKind};
use gramkit_framework::Dispatcher;

/// What the runner does when the dispatcher propagates a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// End the tick and try again on the next one. The offset did not move,
    /// so the failed update is fetched again.
    #[default]
    RetryNextTick,
    /// Stop polling and return the failure.
    Stop,
}

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Time between the starts of two ticks.
    pub interval: Duration,
    /// Delay before the first tick.
    pub initial_delay: Duration,
    /// Server-side long-poll timeout.
    pub long_poll_timeout: Duration,
    /// Maximum batch size per fetch.
    pub limit: u32,
    pub failure_policy: FailurePolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            initial_delay: Duration::from_secs(3),
            long_poll_timeout: Duration::from_secs(15),
            limit: 100,
            failure_policy: FailurePolicy::RetryNextTick,
        }
    }
}

/// Drives a [`Dispatcher`] from `getUpdates`.
pub struct PollingRunner {
    dispatcher: Arc<Dispatcher>,
    config: PollingConfig,
}

impl PollingRunner {
    pub fn new(dispatcher: Arc<Dispatcher>, config: PollingConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Polls until `cancel` fires.
    ///
    /// Returns an error only under [`FailurePolicy::Stop`].
    pub async fn run(&self, cancel: CancellationToken) -> TransportResult<()> {
        info!(
            bot_id = self.dispatcher.bot().id(),
            interval = ?self.config.interval,
            initial_delay = ?self.config.initial_delay,
            "Polling started"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Polling cancelled before first tick");
                return Ok(());
            }
            _ = sleep(self.config.initial_delay) => {}
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.tick(&cancel).await {
                Ok(processed) => {
                    if processed > 0 {
                        debug!(processed, offset = self.dispatcher.last_offset(), "Tick finished");
                    }
                }
                Err(TransportError::Cancelled) => break,
                Err(err) => match self.config.failure_policy {
                    FailurePolicy::RetryNextTick => {
                        warn!(error = %err, "Tick aborted, retrying on next tick");
                    }
                    FailurePolicy::Stop => return Err(err),
                },
            }
        }

        info!(offset = self.dispatcher.last_offset(), "Polling stopped");
        Ok(())
    }

    /// Runs one tick and returns the number of processed updates.
    ///
    /// A failed fetch ends the tick early with a warning; an empty or null
    /// batch ends it quietly. Cancellation only interrupts a fetch; an update
    /// already being processed completes.
    pub async fn tick(&self, cancel: &CancellationToken) -> TransportResult<usize> {
        let mut processed = 0;

        loop {
            let request = GetUpdates::new(
                self.dispatcher.last_offset() + 1,
                self.config.long_poll_timeout.as_secs(),
            )
            .limit(self.config.limit);

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                result = self.dispatcher.bot().send(&request) => result,
            };

            let batch = match fetched {
                Ok(Some(batch)) if !batch.is_empty() => batch,
                Ok(_) => return Ok(processed),
                Err(err) => {
                    warn!(error = %err, offset = ?request.offset, "Failed to fetch updates");
                    return Ok(processed);
                }
            };

            debug!(count = batch.len(), "Fetched updates");
            let mut advanced = false;
            for raw in batch {
                let Some(update) = decode_update(raw) else {
                    continue;
                };
                self.dispatcher
                    .process(&update)
                    .await
                    .map_err(TransportError::Dispatch)?;
                processed += 1;
                advanced = true;
            }

            // Nothing in the batch carried an id, so refetching would return it again.
            if !advanced {
                return Ok(processed);
            }
        }
    }
}

/// Decodes one fetched update.
///
/// An update whose known branch fails to decode becomes
/// [`UpdateKind::Unrecognized`] so the offset still moves past it. Objects
/// without a usable `update_id` are skipped.
fn decode_update(raw: Value) -> Option<Update> {
    let update_id = raw.get("update_id").and_then(Value::as_i64);
    match serde_json::from_value::<Update>(raw) {
        Ok(update) => Some(update),
        Err(err) => match update_id {
            Some(update_id) => {
                warn!(update_id, error = %err, "Malformed update, treating as unrecognized");
                Some(Update::new(update_id, UpdateKind::Unrecognized))
            }
            None => {
                warn!(error = %err, "Fetched update has no update_id, skipping");
                None
            }
        },
    }
}
