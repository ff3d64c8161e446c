//! Tokio scheduler that ticks a countdown and submits on expiry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::attempt::{lock, AttemptCoordinator, SubmitResult};
use crate::error::Result;
use crate::model::SubmitTrigger;
use crate::timer::{Countdown, Tick};

/// Tick period for a real attempt.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How a [`drive_countdown`] loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveOutcome {
    /// The countdown expired and the driver submitted the attempt.
    Expired(SubmitResult),
    /// The attempt was submitted by someone else; ticking stopped.
    Cancelled,
}

/// Tick `countdown` every `period` until it expires or the attempt is
/// submitted.
///
/// The caller starts, pauses and resumes the countdown through the shared
/// handle; ticks while idle or paused are ignored. On the expiry tick the
/// attempt is submitted with [`SubmitTrigger::TimerExpiry`]. If the learner
/// submitted first that call is a no-op, so the race is harmless.
pub async fn drive_countdown(
    countdown: Arc<Mutex<Countdown>>,
    attempt: Arc<AttemptCoordinator>,
    period: Duration,
) -> Result<DriveOutcome> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if attempt.is_submitted() {
            tracing::debug!(attempt_id = %attempt.id(), "attempt submitted, countdown stopped");
            return Ok(DriveOutcome::Cancelled);
        }

        let tick = lock(&countdown).tick();
        match tick {
            Tick::Expired => {
                tracing::info!(attempt_id = %attempt.id(), "time is up, submitting attempt");
                let result = attempt.submit(SubmitTrigger::TimerExpiry).await?;
                return Ok(DriveOutcome::Expired(result));
            }
            Tick::Decremented { time_left } => {
                tracing::trace!(attempt_id = %attempt.id(), time_left, "tick");
            }
            Tick::Ignored => {}
        }
    }
}
