/// Whole-second countdown that ends the match when it reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchClock {
    remaining: u32,
    running: bool,
}

/// Result of one clock second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// The clock is stopped; nothing changed.
    Idle,
    Running { seconds_left: u32 },
    /// This second brought the clock to zero.
    Expired,
}

impl MatchClock {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            running: true,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick_second(&mut self) -> ClockTick {
        if !self.running || self.remaining == 0 {
            return ClockTick::Idle;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.running = false;
            ClockTick::Expired
        } else {
            ClockTick::Running {
                seconds_left: self.remaining,
            }
        }
    }
}
