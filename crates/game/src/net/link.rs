use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Reliability;

const RETRANSMIT_FLOOR_MS: u32 = 20;
const MAX_RETRANSMITS: u32 = 8;

/// Latency, jitter and loss applied to one direction of a simulated link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkConditions {
    pub latency_ms: u32,
    pub jitter_ms: u32,
    /// Chance in percent that a transmission is lost. Unreliable messages
    /// vanish; reliable ones arrive late after a retransmission.
    pub loss_percent: f32,
}

impl LinkConditions {
    pub fn is_perfect(&self) -> bool {
        self.latency_ms == 0 && self.jitter_ms == 0 && self.loss_percent <= 0.0
    }
}

#[derive(Debug)]
struct Delayed<M> {
    release_time: Instant,
    sequence: u64,
    message: M,
}

impl<M> PartialEq for Delayed<M> {
    fn eq(&self, other: &Self) -> bool {
        self.release_time == other.release_time && self.sequence == other.sequence
    }
}

impl<M> Eq for Delayed<M> {}

impl<M> PartialOrd for Delayed<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Delayed<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_time
            .cmp(&self.release_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// One direction of a lossy, jittery link. Messages are released once their
/// delivery time has passed.
#[derive(Debug)]
pub struct SimulatedLink<M> {
    conditions: LinkConditions,
    queue: BinaryHeap<Delayed<M>>,
    rng: StdRng,
    sequence: u64,
    last_reliable_release: Option<Instant>,
    dropped: u64,
    retransmits: u64,
}

impl<M> SimulatedLink<M> {
    pub fn new(conditions: LinkConditions, seed: u64) -> Self {
        Self {
            conditions,
            queue: BinaryHeap::new(),
            rng: StdRng::seed_from_u64(seed),
            sequence: 0,
            last_reliable_release: None,
            dropped: 0,
            retransmits: 0,
        }
    }

    pub fn conditions(&self) -> &LinkConditions {
        &self.conditions
    }

    /// Queues `message` at `now`. Returns `false` if the message was lost.
    pub fn push(&mut self, now: Instant, message: M, reliability: Reliability) -> bool {
        let mut delay_ms =
            self.conditions.latency_ms + self.rng.gen_range(0..=self.conditions.jitter_ms);
        match reliability {
            Reliability::Unreliable => {
                if self.lost() {
                    self.dropped += 1;
                    return false;
                }
            }
            Reliability::Reliable => {
                // Each lost copy costs one round trip before the resend lands.
                let round_trip = 2 * self.conditions.latency_ms.max(RETRANSMIT_FLOOR_MS);
                let mut attempts = 0;
                while attempts < MAX_RETRANSMITS && self.lost() {
                    attempts += 1;
                    delay_ms += round_trip;
                }
                self.retransmits += attempts as u64;
            }
        }

        let mut release_time = now + Duration::from_millis(delay_ms as u64);
        if reliability == Reliability::Reliable {
            // Reliable traffic is never overtaken by later reliable traffic.
            if let Some(last) = self.last_reliable_release {
                release_time = release_time.max(last);
            }
            self.last_reliable_release = Some(release_time);
        }

        self.sequence += 1;
        self.queue.push(Delayed {
            release_time,
            sequence: self.sequence,
            message,
        });
        true
    }

    /// Removes every message whose delivery time is at or before `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<M> {
        let mut ready = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|delayed| delayed.release_time <= now)
        {
            if let Some(delayed) = self.queue.pop() {
                ready.push(delayed.message);
            }
        }
        ready
    }

    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    fn lost(&mut self) -> bool {
        self.conditions.loss_percent > 0.0
            && self.rng.gen_range(0.0..100.0) < self.conditions.loss_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lossy() -> LinkConditions {
        LinkConditions {
            latency_ms: 40,
            jitter_ms: 30,
            loss_percent: 50.0,
        }
    }

    #[test]
    fn perfect_link_delivers_immediately() {
        let mut link = SimulatedLink::new(LinkConditions::default(), 7);
        let now = Instant::now();
        assert!(link.conditions().is_perfect());

        link.push(now, 1, Reliability::Unreliable);
        link.push(now, 2, Reliability::Reliable);

        assert_eq!(link.poll(now), vec![1, 2]);
        assert_eq!(link.in_flight(), 0);
    }

    #[test]
    fn messages_wait_for_latency() {
        let conditions = LinkConditions {
            latency_ms: 50,
            ..LinkConditions::default()
        };
        let mut link = SimulatedLink::new(conditions, 7);
        let now = Instant::now();
        link.push(now, "hello", Reliability::Reliable);

        assert!(link.poll(now + Duration::from_millis(49)).is_empty());
        assert_eq!(link.poll(now + Duration::from_millis(50)), vec!["hello"]);
    }

    #[test]
    fn reliable_messages_are_never_lost_or_reordered() {
        let mut link = SimulatedLink::new(lossy(), 99);
        let start = Instant::now();

        for i in 0..500u32 {
            let sent_at = start + Duration::from_millis(i as u64 * 2);
            assert!(link.push(sent_at, i, Reliability::Reliable));
        }

        let delivered = link.poll(start + Duration::from_secs(10));
        assert_eq!(delivered, (0..500).collect::<Vec<_>>());
        assert_eq!(link.dropped(), 0);
        assert!(link.retransmits() > 100);
    }

    #[test]
    fn lost_reliable_message_arrives_a_round_trip_late() {
        let conditions = LinkConditions {
            latency_ms: 30,
            jitter_ms: 0,
            loss_percent: 100.0,
        };
        let mut link = SimulatedLink::new(conditions, 5);
        let now = Instant::now();
        link.push(now, 'x', Reliability::Reliable);

        let resent_at = now + Duration::from_millis(30 + 60 * MAX_RETRANSMITS as u64);
        assert!(link.poll(resent_at - Duration::from_millis(1)).is_empty());
        assert_eq!(link.poll(resent_at), vec!['x']);
        assert_eq!(link.retransmits(), MAX_RETRANSMITS as u64);
    }

    #[test]
    fn unreliable_messages_can_be_lost() {
        let mut link = SimulatedLink::new(lossy(), 3);
        let now = Instant::now();

        let sent = (0..1000u32)
            .filter(|i| link.push(now, *i, Reliability::Unreliable))
            .count();

        assert!(sent > 300 && sent < 700, "sent {sent}");
        assert_eq!(link.dropped(), 1000 - sent as u64);
        assert_eq!(link.poll(now + Duration::from_secs(1)).len(), sent);
    }

    #[test]
    fn jitter_stays_within_its_window() {
        let conditions = LinkConditions {
            latency_ms: 10,
            jitter_ms: 5,
            loss_percent: 0.0,
        };
        let mut link = SimulatedLink::new(conditions, 11);
        let now = Instant::now();
        for i in 0..200u32 {
            link.push(now, i, Reliability::Unreliable);
        }

        assert!(link.poll(now + Duration::from_millis(9)).is_empty());
        assert_eq!(link.poll(now + Duration::from_millis(15)).len(), 200);
    }

    #[test]
    fn same_seed_same_behaviour() {
        let run = || {
            let mut link = SimulatedLink::new(lossy(), 42);
            let now = Instant::now();
            (0..64u32)
                .map(|i| link.push(now, i, Reliability::Unreliable))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }
}
