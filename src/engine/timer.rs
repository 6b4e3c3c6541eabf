// src/engine/timer.rs

/// What a single timer tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; seconds left after this tick.
    Running(u64),
    /// This tick reached zero. Reported exactly once.
    Expired,
    /// The timer already expired or was cancelled; nothing happens.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Running,
    Expired,
    Cancelled,
}

/// Countdown for a timed attempt, advanced one second per tick.
///
/// The timer has no clock of its own. The owner calls [`AttemptTimer::tick`] once per
/// second while the attempt is in progress and cancels it when the attempt ends.
#[derive(Debug, Clone)]
pub struct AttemptTimer {
    remaining: u64,
    state: TimerState,
}

impl AttemptTimer {
    pub fn new(limit_seconds: u64) -> Self {
        AttemptTimer {
            remaining: limit_seconds,
            state: TimerState::Running,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != TimerState::Running {
            return Tick::Stopped;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Expired;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Stops the countdown. Later ticks report [`Tick::Stopped`].
    pub fn cancel(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Cancelled;
        }
    }
}
