use std::collections::VecDeque;

use crate::snapshot::EntityState;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Last `capacity` states of one entity, addressed by how many ticks ago they
/// were recorded. Index 0 is the most recent push.
#[derive(Debug, Clone)]
pub struct EntitySimulationHistory {
    states: VecDeque<EntityState>,
    capacity: usize,
}

impl Default for EntitySimulationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl EntitySimulationHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            states: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, state: EntityState) {
        if self.states.len() == self.capacity {
            self.states.pop_back();
        }
        self.states.push_front(state);
    }

    pub fn at(&self, ticks_ago: usize) -> Option<&EntityState> {
        self.states.get(ticks_ago)
    }

    pub fn latest(&self) -> Option<&EntityState> {
        self.states.front()
    }

    /// Oldest retained state; rewinds past the horizon clamp to this.
    pub fn oldest(&self) -> Option<&EntityState> {
        self.states.back()
    }

    /// Forgets the `count` most recent states, used when a prediction is
    /// rewritten from an authoritative baseline.
    pub fn discard_recent(&mut self, count: usize) {
        let count = count.min(self.states.len());
        self.states.drain(..count);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.states.iter()
    }
}
