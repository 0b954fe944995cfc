//! Anchored countdown clock.
//!
//! Remaining time is a pure function of `(started_at, duration, now)`,
//! recomputed on every tick rather than decremented, so suspending and
//! resuming the process cannot lose or duplicate time. `Expired` is
//! raised exactly once; once stopped, the clock never restarts.

use chrono::{DateTime, Utc};

/// Result of delivering one tick to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down; carries the remaining whole seconds.
    Running(u64),
    /// The countdown reached zero on this tick. Raised exactly once.
    Expired,
    /// The clock is not running (never started, already expired, or stopped).
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Idle,
    Running,
    Expired,
    Stopped,
}

/// One-second-resolution countdown anchored to a start timestamp.
#[derive(Debug)]
pub struct CountdownClock {
    duration_secs: u64,
    deadline: Option<DateTime<Utc>>,
    state: ClockState,
    /// Remaining seconds frozen at the moment the clock halted.
    frozen_remaining: u64,
}

impl CountdownClock {
    pub fn new() -> Self {
        Self {
            duration_secs: 0,
            deadline: None,
            state: ClockState::Idle,
            frozen_remaining: 0,
        }
    }

    /// Anchor the countdown at `started_at`. A zero duration expires on
    /// the first tick without any intermediate `Running` tick.
    pub fn start(&mut self, duration_secs: u64, started_at: DateTime<Utc>) {
        self.duration_secs = duration_secs;
        self.deadline = Some(started_at + chrono::Duration::seconds(duration_secs as i64));
        self.state = ClockState::Running;
        self.frozen_remaining = duration_secs;
    }

    /// Remaining whole seconds at `now`, saturating at zero.
    ///
    /// Invariant: `0 <= remaining <= duration_secs`.
    pub fn remaining(&self, now: DateTime<Utc>) -> u64 {
        match self.state {
            ClockState::Running => {
                let deadline = match self.deadline {
                    Some(d) => d,
                    None => return 0,
                };
                let left = (deadline - now).num_seconds();
                (left.max(0) as u64).min(self.duration_secs)
            }
            ClockState::Idle => self.duration_secs,
            ClockState::Expired => 0,
            ClockState::Stopped => self.frozen_remaining,
        }
    }

    /// Deliver one tick at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.state != ClockState::Running {
            return TickOutcome::Stopped;
        }
        let remaining = self.remaining(now);
        if remaining == 0 {
            self.state = ClockState::Expired;
            self.frozen_remaining = 0;
            TickOutcome::Expired
        } else {
            self.frozen_remaining = remaining;
            TickOutcome::Running(remaining)
        }
    }

    /// Halt the countdown. Idempotent; a tick after `stop` yields
    /// `Stopped`, never a second `Expired`.
    pub fn stop(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn is_expired(&self) -> bool {
        self.state == ClockState::Expired
    }
}

impl Default for CountdownClock {
    fn default() -> Self {
        Self::new()
    }
}
