//! Retry with exponential backoff and jitter.
//!
//! The retry policy is an explicit state machine, [`RetryState`], that counts
//! attempts, produces the backoff schedule and enforces an optional overall
//! deadline. It performs no I/O, so every decision can be tested directly;
//! [`retry_async`] drives it around an async operation.

use agentnet_types::config::ClientConfig;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base delay before the first retry, in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter factor in `[0, 1]`.
    ///
    /// The actual sleep is `delay * (1 + random_fraction * jitter)`, capped at
    /// `max_delay_ms`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay_ms: 200,
            max_delay_ms: 10_000,
            jitter: 0.2,
        }
    }
}

impl From<&ClientConfig> for RetryConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
        }
    }
}

impl RetryConfig {
    /// Total attempts permitted, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// The same delays with retries disabled.
    pub fn single_attempt(&self) -> Self {
        Self {
            max_retries: 0,
            ..self.clone()
        }
    }
}

/// Why a retry loop stopped without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUp {
    /// The failure is not transient.
    NotRetryable,
    /// Every permitted attempt was used.
    Exhausted,
    /// The next delay would cross the overall deadline.
    DeadlineReached,
}

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    Retry(Duration),
    /// Stop.
    GiveUp(GiveUp),
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded.
    Success {
        /// The successful result.
        result: T,
        /// Total number of attempts made (1 = first try succeeded).
        attempts: u32,
    },
    /// The loop gave up.
    Failed {
        /// The error from the last attempt.
        last_error: E,
        /// Total number of attempts made.
        attempts: u32,
        /// Why no further attempt was made.
        reason: GiveUp,
    },
}

// ---------------------------------------------------------------------------
// Backoff computation
// ---------------------------------------------------------------------------

/// Compute the delay before retry number `retry` (0-indexed).
///
/// Formula: `min(min_delay * 2^retry, max_delay) * (1 + random * jitter)`,
/// capped at `max_delay`.
pub fn compute_backoff(config: &RetryConfig, retry: u32) -> u64 {
    let base = config
        .min_delay_ms
        .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
    let capped = base.min(config.max_delay_ms);

    let jitter = config.jitter.clamp(0.0, 1.0);
    if jitter == 0.0 {
        return capped;
    }

    let frac: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let with_jitter = (capped as f64) * (1.0 + frac * jitter);
    (with_jitter as u64).min(config.max_delay_ms)
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Attempt counter and backoff schedule for one logical call.
///
/// Delays are monotonically non-decreasing: each one is at least the previous
/// delay, whether it came from the exponential schedule or from a server hint.
#[derive(Debug, Clone)]
pub struct RetryState {
    config: RetryConfig,
    attempts: u32,
    schedule: Vec<Duration>,
    deadline: Option<Instant>,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
            schedule: Vec::new(),
            deadline: None,
        }
    }

    /// Stop retrying once the next delay would reach `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Record the start of an attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delays handed out so far, in order.
    pub fn schedule(&self) -> &[Duration] {
        &self.schedule
    }

    /// Decide what to do after the current attempt failed.
    ///
    /// `hint_ms` is a server-provided delay (e.g. `retry-after`); it replaces
    /// the computed backoff but is still capped at `max_delay_ms`.
    pub fn on_failure(&mut self, retryable: bool, hint_ms: Option<u64>, now: Instant) -> RetryDecision {
        if !retryable {
            return RetryDecision::GiveUp(GiveUp::NotRetryable);
        }
        if self.attempts >= self.config.max_attempts() {
            return RetryDecision::GiveUp(GiveUp::Exhausted);
        }

        let retry = self.attempts.saturating_sub(1);
        let planned_ms = match hint_ms {
            Some(hinted) => hinted.min(self.config.max_delay_ms),
            None => compute_backoff(&self.config, retry),
        };
        let floor = self.schedule.last().copied().unwrap_or(Duration::ZERO);
        let delay = Duration::from_millis(planned_ms).max(floor);

        if let Some(deadline) = self.deadline {
            if now + delay >= deadline {
                return RetryDecision::GiveUp(GiveUp::DeadlineReached);
            }
        }

        self.schedule.push(delay);
        RetryDecision::Retry(delay)
    }
}

// ---------------------------------------------------------------------------
// Core retry function
// ---------------------------------------------------------------------------

/// Execute an async operation under a [`RetryState`].
///
/// - `should_retry` classifies an error as transient.
/// - `retry_after_hint` may return a server-suggested delay in milliseconds.
pub async fn retry_async<F, Fut, T, E, P, H>(
    mut state: RetryState,
    mut operation: F,
    should_retry: P,
    retry_after_hint: H,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    H: Fn(&E) -> Option<u64>,
    E: std::fmt::Display,
{
    loop {
        let attempt = state.begin_attempt();
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "retry succeeded after {} failures", attempt - 1);
                }
                return RetryOutcome::Success {
                    result,
                    attempts: attempt,
                };
            }
            Err(err) => {
                let decision = state.on_failure(
                    should_retry(&err),
                    retry_after_hint(&err),
                    Instant::now(),
                );
                match decision {
                    RetryDecision::Retry(delay) => {
                        debug!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "retrying after error"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp(reason) => {
                        match reason {
                            GiveUp::NotRetryable => {
                                debug!(attempt, error = %err, "error is not retryable, giving up");
                            }
                            GiveUp::Exhausted => {
                                warn!(
                                    attempt,
                                    max_attempts = state.config().max_attempts(),
                                    error = %err,
                                    "all retry attempts exhausted"
                                );
                            }
                            GiveUp::DeadlineReached => {
                                warn!(attempt, error = %err, "retry deadline reached");
                            }
                        }
                        return RetryOutcome::Failed {
                            last_error: err,
                            attempts: attempt,
                            reason,
                        };
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
