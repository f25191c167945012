//! Fixed-interval polling with an attempt budget.
//!
//! [`poll_until`] calls a check closure until it reports a terminal state
//! or the budget runs out. Errors returned by the check are treated as
//! transient: they are logged and the loop moves on to the next attempt
//! after the regular interval.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// A budget of zero still performs one check.
    fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// What a single check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T, F> {
    Ready(T),
    Pending,
    Abort(F),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PollError<F> {
    #[error("polling aborted on attempt {attempt}")]
    Aborted { attempt: u32, reason: F },

    #[error("not ready after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Run `check` until it returns [`PollStep::Ready`] or [`PollStep::Abort`],
/// sleeping `policy.interval` between attempts. The closure receives the
/// 1-based attempt number. No sleep happens after the final attempt.
pub async fn poll_until<T, F, E, C, Fut>(
    policy: &PollPolicy,
    mut check: C,
) -> Result<T, PollError<F>>
where
    E: Display,
    C: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStep<T, F>, E>>,
{
    let max_attempts = policy.effective_attempts();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match check(attempt).await {
            Ok(PollStep::Ready(value)) => return Ok(value),
            Ok(PollStep::Abort(reason)) => return Err(PollError::Aborted { attempt, reason }),
            Ok(PollStep::Pending) => {
                debug!(attempt, max_attempts, "Still pending");
            }
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "Poll attempt failed, will retry");
                last_error = Some(e.to_string());
            }
        }

        if attempt < max_attempts {
            sleep(policy.interval).await;
        }
    }

    Err(PollError::Exhausted {
        attempts: max_attempts,
        last_error,
    })
}
