//! Countdown controller with pause/resume and once-only expiry.
//!
//! The controller owns no background resources. An external scheduler calls
//! [`Countdown::tick`] once per second; stopping those calls is all the
//! teardown required.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Expired,
}

/// Observable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Seconds remaining.
    pub time_left: u64,
    pub is_running: bool,
    pub is_paused: bool,
}

/// Result of a single [`Countdown::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running, paused, or already expired.
    Ignored,
    /// One second elapsed; time remains.
    Decremented { time_left: u64 },
    /// The countdown reached zero on this tick. Reported exactly once.
    Expired,
}

/// A bounded countdown driven by explicit ticks.
#[derive(Debug, Clone)]
pub struct Countdown {
    time_left: u64,
    is_running: bool,
    is_paused: bool,
    expired: bool,
}

impl Countdown {
    /// A countdown of `seconds`, idle until started.
    pub fn new(seconds: u64) -> Self {
        Self {
            time_left: seconds,
            is_running: false,
            is_paused: false,
            expired: false,
        }
    }

    /// A countdown for a time limit expressed in minutes.
    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(u64::from(minutes) * 60)
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn phase(&self) -> TimerPhase {
        if self.expired {
            TimerPhase::Expired
        } else if !self.is_running {
            TimerPhase::Idle
        } else if self.is_paused {
            TimerPhase::Paused
        } else {
            TimerPhase::Running
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            time_left: self.time_left,
            is_running: self.is_running,
            is_paused: self.is_paused,
        }
    }

    /// Start (or un-pause) the countdown. Returns whether the phase changed.
    ///
    /// An expired countdown cannot be restarted.
    pub fn start(&mut self) -> bool {
        if self.expired || self.phase() == TimerPhase::Running {
            return false;
        }
        self.is_running = true;
        self.is_paused = false;
        tracing::debug!(time_left = self.time_left, "countdown started");
        true
    }

    /// Pause a running countdown. No-op otherwise.
    pub fn pause(&mut self) -> bool {
        if self.phase() != TimerPhase::Running {
            return false;
        }
        self.is_paused = true;
        tracing::debug!(time_left = self.time_left, "countdown paused");
        true
    }

    /// Resume a paused countdown. No-op otherwise.
    pub fn resume(&mut self) -> bool {
        if self.phase() != TimerPhase::Paused {
            return false;
        }
        self.is_paused = false;
        tracing::debug!(time_left = self.time_left, "countdown resumed");
        true
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Tick {
        if self.expired {
            tracing::warn!("late tick after expiry ignored");
            return Tick::Ignored;
        }
        if self.phase() != TimerPhase::Running {
            return Tick::Ignored;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return Tick::Decremented {
                time_left: self.time_left,
            };
        }
        self.expired = true;
        self.is_running = false;
        self.is_paused = false;
        tracing::debug!("countdown expired");
        Tick::Expired
    }
}

/// Format seconds as `MM:SS`. Negative input renders as `00:00`.
pub fn format_clock(seconds: i64) -> String {
    if seconds < 0 {
        return "00:00".to_string();
    }
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
