use tokio::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Scheduled { deadline: Instant },
    Firing,
}

/// Identifies one scheduling of a timer. A token from before the last
/// `schedule` or `cancel` is stale.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimerToken(u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fire {
    Fired,
    /// The timer was cancelled or rescheduled after the token was taken.
    /// The caller must return without side effects.
    Cancelled,
}

/// A single deadline owned by the node loop.
///
/// The loop asks every timer for `due` tokens first, and then fires them one
/// by one, so a timer that is cancelled by an earlier callback in the same
/// round reports `Fire::Cancelled` instead of running.
#[derive(Clone, Debug)]
pub struct Timer {
    state: TimerState,
    generation: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new()
    }
}

impl Timer {
    pub const fn new() -> Timer {
        Timer {
            state: TimerState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TimerState::Idle
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Arms the timer, replacing any pending deadline.
    pub fn schedule(&mut self, deadline: Instant) -> TimerToken {
        self.generation += 1;
        self.state = TimerState::Scheduled { deadline };
        TimerToken(self.generation)
    }

    pub fn cancel(&mut self) {
        if self.state != TimerState::Idle {
            self.generation += 1;
            self.state = TimerState::Idle;
        }
    }

    pub fn due(&self, now: Instant) -> Option<TimerToken> {
        match self.state {
            TimerState::Scheduled { deadline } if deadline <= now => {
                Some(TimerToken(self.generation))
            }
            _ => None,
        }
    }

    /// Moves a due timer into `Firing`. The caller ends the callback with
    /// either `schedule` or `finish`.
    pub fn fire(&mut self, token: TimerToken) -> Fire {
        match self.state {
            TimerState::Scheduled { .. } if token.0 == self.generation => {
                self.state = TimerState::Firing;
                Fire::Fired
            }
            _ => Fire::Cancelled,
        }
    }

    pub fn finish(&mut self) {
        if self.state == TimerState::Firing {
            self.state = TimerState::Idle;
        }
    }
}
