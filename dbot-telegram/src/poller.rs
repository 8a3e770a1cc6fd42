//! Long-poll loop.
//!
//! One fetch at a time; every message of a batch is dispatched on its own task and the whole batch is
//! awaited before the cursor moves to `max(update_id) + 1`. Fetch failures back off exponentially and
//! never end the loop; only the shutdown signal does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbot_core::{Message, Result};
use dispatcher::Dispatcher;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::api::TelegramApi;
use crate::types::Update;

/// Consecutive fetch failures reported at `error` level before the counter resets.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Source of update batches.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch(&self, offset: i64, timeout: u64) -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for TelegramApi {
    async fn fetch(&self, offset: i64, timeout: u64) -> Result<Vec<Update>> {
        self.get_updates(offset, timeout).await
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`, at most `max`.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exp).min(max)
}

pub struct Poller {
    source: Arc<dyn UpdateSource>,
    dispatcher: Arc<Dispatcher>,
    offset: i64,
    timeout: u64,
    ignore_next_batch: bool,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn UpdateSource>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            source,
            dispatcher,
            offset: 0,
            timeout: crate::config::DEFAULT_POLL_TIMEOUT,
            ignore_next_batch: false,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
        }
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// The first fetch uses a zero wait and its updates are skipped, not dispatched.
    pub fn ignore_current_batch(mut self, ignore: bool) -> Self {
        self.ignore_next_batch = ignore;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Offset the next fetch will request.
    pub fn cursor(&self) -> i64 {
        self.offset
    }

    async fn fetch(&mut self) -> Result<(Vec<Update>, bool)> {
        let ignore = self.ignore_next_batch;
        let timeout = if ignore { 0 } else { self.timeout };
        let updates = self.source.fetch(self.offset, timeout).await?;
        self.ignore_next_batch = false;
        Ok((updates, ignore))
    }

    /// Dispatches one batch and moves the cursor past it. Returns how many messages were dispatched.
    async fn process(&mut self, updates: Vec<Update>, ignore: bool) -> usize {
        let Some(last) = updates.iter().map(|u| u.update_id).max() else {
            return 0;
        };
        let next = last + 1;

        if ignore {
            info!(skipped = updates.len(), offset = next, "step: stale batch ignored");
            self.offset = next;
            return 0;
        }

        let mut tasks = JoinSet::new();
        for update in updates {
            let Some(raw) = update.message else {
                debug!(update_id = update.update_id, "Skipping update without message");
                continue;
            };
            let message = match Message::from_raw(raw) {
                Ok(message) => message,
                Err(e) => {
                    warn!(update_id = update.update_id, error = %e, "Skipping undecodable message");
                    continue;
                }
            };
            let dispatcher = self.dispatcher.clone();
            tasks.spawn(async move {
                if let Err(e) = dispatcher.dispatch(&message).await {
                    error!(
                        error = %e,
                        user_id = message.user.id,
                        chat_id = message.chat.id,
                        "Dispatch failed"
                    );
                }
            });
        }

        let batch_size = tasks.len();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatch task panicked");
            }
        }
        info!(batch_size, offset = next, "step: batch processed");
        self.offset = next;
        batch_size
    }

    /// One fetch and its batch. A fetch error leaves the cursor unchanged.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let (updates, ignore) = self.fetch().await?;
        Ok(self.process(updates, ignore).await)
    }

    /// Polls until `shutdown` turns true (or its sender is dropped). A long-poll wait or backoff sleep
    /// is cut short by shutdown; a batch already fetched is always processed to completion.
    /// Returns the final cursor.
    #[instrument(skip(self, shutdown), fields(timeout = self.timeout))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> i64 {
        info!(offset = self.offset, "step: polling started");
        let mut failures = 0u32;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let fetched = tokio::select! {
                fetched = self.fetch() => fetched,
                _ = shutdown.changed() => break,
            };

            match fetched {
                Ok((updates, ignore)) => {
                    failures = 0;
                    self.process(updates, ignore).await;
                }
                Err(e) => {
                    failures += 1;
                    let delay = backoff_delay(self.backoff_base, self.backoff_max, failures);
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        error!(
                            error = %e,
                            failures,
                            offset = self.offset,
                            "Fetching updates keeps failing"
                        );
                        failures = 0;
                    } else {
                        warn!(
                            error = %e,
                            failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Fetching updates failed, backing off"
                        );
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        info!(offset = self.offset, "step: polling stopped");
        self.offset
    }
}
