use tokio::time::{Instant, Interval, MissedTickBehavior};

use recoil::FixedTimestep;

/// Wakes roughly once per tick and reports how many fixed ticks are due.
pub struct Pacer {
    timestep: FixedTimestep,
    interval: Interval,
    last: Instant,
}

impl Pacer {
    pub fn new(tick_rate: u32) -> Self {
        let timestep = FixedTimestep::new(tick_rate);
        let mut interval = tokio::time::interval(timestep.dt());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            timestep,
            interval,
            last: Instant::now(),
        }
    }

    /// Cancel-safe: the only await point is the interval tick.
    pub async fn wait(&mut self) -> u32 {
        let now = self.interval.tick().await;
        let elapsed = now.duration_since(self.last);
        self.last = now;
        self.timestep.advance(elapsed)
    }
}
