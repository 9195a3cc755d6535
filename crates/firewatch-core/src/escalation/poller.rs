//! Confirmation poller
//!
//! Bounded, cancellable repeated check. Runs `check` every `interval` until it
//! reports `true`, the budget runs out, or the cancellation token fires.
//!
//! ```text
//! t = 0      interval   2·interval  ...  (n-1)·interval     budget
//! check ──── check ──── check ───── ... ── check ─────────── timed out
//! ```
//!
//! `n = floor(budget / interval)` checks at most. The poller never spawns, so
//! dropping its future stops it.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    /// A check came back positive
    Confirmed,
    /// The budget elapsed without a positive check
    TimedOut,
    /// Cancelled from outside before either of the above
    StoodDown,
}

/// Result of one poll, with counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Number of times `check` was invoked
    pub checks: u32,
    /// Checks that errored and were treated as "not yet"
    pub failures: u32,
}

/// Bounded repeated-check primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPoller {
    budget: Duration,
    interval: Duration,
}

impl Default for ConfirmationPoller {
    fn default() -> Self {
        Self::new(Duration::from_secs(180), Duration::from_secs(5))
    }
}

impl ConfirmationPoller {
    /// Create a poller. A zero interval is treated as one millisecond.
    pub fn new(budget: Duration, interval: Duration) -> Self {
        Self {
            budget,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on checks per poll; at least one
    pub fn max_checks(&self) -> u32 {
        let ratio = self.budget.as_millis() / self.interval.as_millis();
        ratio.clamp(1, u32::MAX as u128) as u32
    }

    /// Poll until confirmed, timed out, or cancelled.
    ///
    /// A check error counts as a negative answer for that interval. No check
    /// may run past the budget: one still in flight at the deadline is dropped.
    pub async fn run<F, Fut>(&self, cancel: &CancellationToken, mut check: F) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, GatewayError>>,
    {
        let start = Instant::now();
        let deadline = start + self.budget;
        let max_checks = self.max_checks();

        let mut report = PollReport {
            outcome: PollOutcome::TimedOut,
            checks: 0,
            failures: 0,
        };

        while report.checks < max_checks {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.outcome = PollOutcome::StoodDown;
                    return report;
                }
                attempt = timeout_at(deadline, check()) => attempt,
            };
            report.checks += 1;

            match attempt {
                Ok(Ok(true)) => {
                    debug!(check = report.checks, "Acknowledgment found");
                    report.outcome = PollOutcome::Confirmed;
                    return report;
                }
                Ok(Ok(false)) => {
                    debug!(check = report.checks, "No acknowledgment yet");
                }
                Ok(Err(e)) => {
                    report.failures += 1;
                    warn!(
                        check = report.checks,
                        error = %e,
                        "Confirmation check failed, continuing"
                    );
                }
                Err(_) => {
                    report.failures += 1;
                    warn!(check = report.checks, "Confirmation check still running at deadline");
                    break;
                }
            }

            if report.checks < max_checks {
                let next = start + self.interval * report.checks;
                if !wait_until(next.min(deadline), cancel).await {
                    report.outcome = PollOutcome::StoodDown;
                    return report;
                }
            }
        }

        if !wait_until(deadline, cancel).await {
            report.outcome = PollOutcome::StoodDown;
        }
        report
    }
}

/// Sleep until `deadline`. Returns `false` if cancelled first.
async fn wait_until(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = sleep_until(deadline) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn default_poller() -> ConfirmationPoller {
        ConfirmationPoller::default()
    }

    #[test]
    fn test_max_checks() {
        assert_eq!(default_poller().max_checks(), 36);
        let uneven = ConfirmationPoller::new(Duration::from_secs(180), Duration::from_secs(7));
        assert_eq!(uneven.max_checks(), 25);
        let tiny = ConfirmationPoller::new(Duration::from_secs(2), Duration::from_secs(5));
        assert_eq!(tiny.max_checks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_positive_times_out_after_full_budget() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let report = default_poller()
            .run(&CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(false) }
            })
            .await;

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.checks, 36);
        assert_eq!(calls.load(Ordering::SeqCst), 36);
        assert_eq!(start.elapsed(), Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_positive() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let report = default_poller()
            .run(&CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n == 4) }
            })
            .await;

        assert_eq!(report.outcome, PollOutcome::Confirmed);
        assert_eq!(report.checks, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_does_not_end_poll() {
        let calls = AtomicU32::new(0);

        let report = default_poller()
            .run(&CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    match n {
                        2 => Err(GatewayError::Transient("connection reset".into())),
                        3 => Ok(true),
                        _ => Ok(false),
                    }
                }
            })
            .await;

        assert_eq!(report.outcome, PollOutcome::Confirmed);
        assert_eq!(report.checks, 3);
        assert_eq!(report.failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_checks_failing_still_times_out() {
        let report = default_poller()
            .run(&CancellationToken::new(), || async {
                Err(GatewayError::Transient("gateway down".into()))
            })
            .await;

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.checks, 36);
        assert_eq!(report.failures, 36);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_promptly() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let poll = {
            let cancel = cancel.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                default_poller()
                    .run(&cancel, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok(false) }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        let report = poll.await.unwrap();

        assert_eq!(report.outcome, PollOutcome::StoodDown);
        assert_eq!(report.checks, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_check_cannot_exceed_budget() {
        let poller = ConfirmationPoller::new(Duration::from_secs(20), Duration::from_secs(5));
        let start = Instant::now();

        let report = poller
            .run(&CancellationToken::new(), || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(true)
            })
            .await;

        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.checks, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }
}
