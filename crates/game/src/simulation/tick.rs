use std::time::Duration;

/// Longest wall-clock gap credited in one call; anything beyond is dropped
/// instead of replayed as a burst of catch-up ticks.
const MAX_CATCH_UP: Duration = Duration::from_millis(250);

/// Turns elapsed wall-clock time into a whole number of fixed ticks, carrying
/// the remainder to the next call.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    dt: Duration,
    carry: Duration,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            dt: Duration::from_secs(1) / tick_rate.max(1),
            carry: Duration::ZERO,
        }
    }

    pub fn dt(&self) -> Duration {
        self.dt
    }

    /// Credits `elapsed` and returns how many ticks are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.carry += elapsed.min(MAX_CATCH_UP);
        let mut due = 0;
        while self.carry >= self.dt {
            self.carry -= self.dt;
            due += 1;
        }
        due
    }
}
