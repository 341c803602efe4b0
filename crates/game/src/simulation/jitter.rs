use std::collections::VecDeque;

/// What the last `drain` did to steer the backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Released more than one item to shrink an oversized backlog.
    CatchUp(usize),
    /// Held everything back to let an undersized backlog refill.
    Starve,
}

/// Adaptive FIFO that releases items at a steady per-tick rate while keeping a
/// small backlog to absorb arrival jitter.
#[derive(Debug)]
pub struct JitterBuffer<T> {
    queue: VecDeque<T>,
    target_backlog: usize,
    correction_tolerance: u32,
    drift: i64,
    last_correction: Correction,
}

impl<T> JitterBuffer<T> {
    pub fn new(target_backlog: usize, correction_tolerance: u32) -> Self {
        Self {
            queue: VecDeque::with_capacity(target_backlog + 1),
            target_backlog,
            correction_tolerance,
            drift: 0,
            last_correction: Correction::None,
        }
    }

    pub fn add(&mut self, item: T) {
        self.queue.push_back(item);
    }

    /// Called once per consumer tick. Returns the items released this tick in
    /// arrival order.
    pub fn drain(&mut self) -> Vec<T> {
        let backlog = self.queue.len() as i64 - 1;
        let target = self.target_backlog as i64;
        let tolerance = self.correction_tolerance as i64;
        self.last_correction = Correction::None;

        if backlog == target {
            self.drift = 0;
        } else if backlog > target {
            self.drift += 1;
            if self.drift > tolerance {
                self.drift = 0;
                // Release this tick's item plus every item above the target.
                let count = (backlog - target + 1) as usize;
                self.last_correction = Correction::CatchUp(count);
                log::trace!("jitter buffer catch-up: releasing {count} items");
                return self.queue.drain(..count).collect();
            }
        } else {
            self.drift -= 1;
            if -self.drift > tolerance {
                self.drift = 0;
                self.last_correction = Correction::Starve;
                log::trace!("jitter buffer starving with {} queued", self.queue.len());
                return Vec::new();
            }
        }

        self.queue.pop_front().into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn target_backlog(&self) -> usize {
        self.target_backlog
    }

    pub fn drift(&self) -> i64 {
        self.drift
    }

    pub fn last_correction(&self) -> Correction {
        self.last_correction
    }

    /// Drops every buffered item and forgets accumulated drift.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.drift = 0;
        self.last_correction = Correction::None;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn steady_stream_releases_one_per_tick() {
        let mut buffer = JitterBuffer::new(1, 2);
        buffer.add(0);

        for i in 1..20 {
            buffer.add(i);
            assert_eq!(buffer.drain(), vec![i - 1]);
            assert_eq!(buffer.last_correction(), Correction::None);
        }
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn draining_past_the_stream_end_starves_instead_of_failing() {
        let mut buffer = JitterBuffer::new(1, 2);
        buffer.add('a');
        buffer.add('b');
        buffer.add('c');

        assert_eq!(buffer.drain(), vec!['a']);
        assert_eq!(buffer.drain(), vec!['b']);
        assert_eq!(buffer.drain(), vec!['c']);
        assert!(buffer.drain().is_empty());
        assert_eq!(buffer.last_correction(), Correction::None);

        assert!(buffer.drain().is_empty());
        assert_eq!(buffer.last_correction(), Correction::Starve);
        assert_eq!(buffer.drift(), 0);
    }

    #[test]
    fn undersized_backlog_starves_once_tolerance_is_exceeded() {
        let mut buffer = JitterBuffer::new(2, 1);
        for i in 0..4 {
            buffer.add(i);
        }

        assert_eq!(buffer.drain(), vec![0]);
        assert_eq!(buffer.drain(), vec![1]);
        assert_eq!(buffer.drain(), vec![2]);
        assert!(buffer.drain().is_empty());
        assert_eq!(buffer.last_correction(), Correction::Starve);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.drain(), vec![3]);
    }

    #[test]
    fn burst_triggers_catch_up_in_arrival_order() {
        let mut buffer = JitterBuffer::new(1, 2);
        for i in 0..8 {
            buffer.add(i);
        }

        assert_eq!(buffer.drain(), vec![0]);
        assert_eq!(buffer.drain(), vec![1]);
        let released = buffer.drain();
        assert_eq!(released, vec![2, 3, 4, 5, 6]);
        assert_eq!(buffer.last_correction(), Correction::CatchUp(5));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.drift(), 0);
    }

    #[test]
    fn clear_discards_items_and_drift() {
        let mut buffer = JitterBuffer::new(0, 0);
        buffer.add(1);
        buffer.add(2);
        buffer.add(3);
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.drift(), 0);
        assert!(buffer.drain().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        Drain,
    }

    fn ops() -> impl Strategy<Value = Vec<Op>> {
        prop::collection::vec(
            prop_oneof![(1usize..4).prop_map(Op::Add), Just(Op::Drain)],
            0..200,
        )
    }

    fn run(ops: &[Op], target: usize, tolerance: u32) -> (usize, Vec<usize>) {
        let mut buffer = JitterBuffer::new(target, tolerance);
        let mut next = 0;
        let mut drained = Vec::new();

        for op in ops {
            match op {
                Op::Add(n) => {
                    for _ in 0..*n {
                        buffer.add(next);
                        next += 1;
                    }
                }
                Op::Drain => drained.extend(buffer.drain()),
            }
        }

        // Stream ended: keep ticking until nothing is left.
        let mut idle_ticks = 0;
        while !buffer.is_empty() {
            drained.extend(buffer.drain());
            idle_ticks += 1;
            assert!(idle_ticks < 10_000, "buffer never emptied");
        }

        (next, drained)
    }

    proptest! {
        #[test]
        fn every_added_item_is_drained(
            ops in ops(),
            target in 0usize..4,
            tolerance in 0u32..4,
        ) {
            let (added, drained) = run(&ops, target, tolerance);
            prop_assert_eq!(drained.len(), added);
        }

        #[test]
        fn drained_items_keep_insertion_order(
            ops in ops(),
            target in 0usize..4,
            tolerance in 0u32..4,
        ) {
            let (_, drained) = run(&ops, target, tolerance);
            for (expected, item) in drained.iter().enumerate() {
                prop_assert_eq!(*item, expected);
            }
        }
    }
}
