use std::collections::VecDeque;

use crate::movement::StateTransition;
use crate::physics::PhysicsBackend;
use crate::simulation::EntitySimulationHistory;
use crate::snapshot::{EntityState, InputSample, Tick};

use super::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRecord {
    pub tick: Tick,
    pub state: EntityState,
    pub input: InputSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// No prediction was recorded for the authoritative tick.
    Stale,
    Confirmed,
    /// Local state was reset to the authoritative one and `replayed` inputs re-run.
    Corrected { replayed: usize },
}

/// Runs the local entity ahead of the server and rolls back on mispredictions.
pub struct ClientPredictor {
    transition: StateTransition,
    state: EntityState,
    history: EntitySimulationHistory,
    pending: VecDeque<PredictionRecord>,
    correction_threshold: f32,
    max_pending: usize,
    corrections: u64,
}

impl ClientPredictor {
    pub fn new(transition: StateTransition, initial: EntityState, config: &ClientConfig) -> Self {
        let mut history = EntitySimulationHistory::new(config.history_capacity);
        history.push(initial);

        Self {
            transition,
            state: initial,
            history,
            pending: VecDeque::with_capacity(config.max_pending_predictions),
            correction_threshold: config.correction_threshold,
            max_pending: config.max_pending_predictions.max(1),
            corrections: 0,
        }
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    pub fn history(&self) -> &EntitySimulationHistory {
        &self.history
    }

    pub fn pending(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    /// Predicts the result of `input` immediately and remembers it for reconciliation.
    pub fn apply_input<P: PhysicsBackend + ?Sized>(
        &mut self,
        tick: Tick,
        input: InputSample,
        physics: &mut P,
    ) -> EntityState {
        self.state = self.transition.apply(&input, &self.state, physics);
        self.history.push(self.state);

        self.pending.push_back(PredictionRecord {
            tick,
            state: self.state,
            input,
        });
        while self.pending.len() > self.max_pending {
            self.pending.pop_front();
        }

        self.state
    }

    pub fn reconcile<P: PhysicsBackend + ?Sized>(
        &mut self,
        server_tick: Tick,
        authoritative: &EntityState,
        physics: &mut P,
    ) -> Reconciliation {
        while self
            .pending
            .front()
            .is_some_and(|record| record.tick < server_tick)
        {
            self.pending.pop_front();
        }

        let Some(predicted) = self
            .pending
            .front()
            .filter(|record| record.tick == server_tick)
            .map(|record| record.state)
        else {
            return Reconciliation::Stale;
        };
        self.pending.pop_front();

        let error = predicted.position.distance(authoritative.position);
        if error <= self.correction_threshold {
            return Reconciliation::Confirmed;
        }

        log::debug!(
            "misprediction at tick {server_tick}: off by {error:.3}, replaying {} inputs",
            self.pending.len()
        );

        // Rewrite the predicted trajectory from the corrected tick onwards.
        self.history.discard_recent(self.pending.len() + 1);
        self.state = *authoritative;
        self.history.push(self.state);

        for record in self.pending.iter_mut() {
            self.state = self.transition.apply(&record.input, &self.state, physics);
            record.state = self.state;
            self.history.push(self.state);
        }

        self.corrections += 1;
        Reconciliation::Corrected {
            replayed: self.pending.len(),
        }
    }

    /// Hard reset, e.g. after a respawn the server reported out of band.
    pub fn reset(&mut self, state: EntityState) {
        self.pending.clear();
        self.history.clear();
        self.state = state;
        self.history.push(state);
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::movement::MovementConfig;
    use crate::physics::FlatWorld;
    use crate::snapshot::KeyFlags;

    struct Fixture {
        transition: StateTransition,
        physics: FlatWorld,
        start: EntityState,
    }

    fn fixture() -> Fixture {
        let config = MovementConfig::default();
        let mut physics = FlatWorld::new(&config);
        let start = EntityState::spawned(1, Vec3::new(0.0, physics.standing_height(), 0.0));
        physics.insert_character(1, start.position);
        Fixture {
            transition: StateTransition::new(config),
            physics,
            start,
        }
    }

    fn inputs() -> Vec<InputSample> {
        (0..8)
            .map(|i| {
                let keys = if i % 3 == 0 {
                    KeyFlags::FORWARD | KeyFlags::JUMP
                } else {
                    KeyFlags::FORWARD | KeyFlags::LEFT
                };
                InputSample::new(keys, Quat::from_rotation_y(i as f32 * 0.2))
            })
            .collect()
    }

    fn predictor(fixture: &mut Fixture) -> ClientPredictor {
        let mut predictor = ClientPredictor::new(
            fixture.transition.clone(),
            fixture.start,
            &ClientConfig::default(),
        );
        for (tick, input) in inputs().into_iter().enumerate() {
            predictor.apply_input(100 + tick as Tick, input, &mut fixture.physics);
        }
        predictor
    }

    #[test]
    fn prediction_is_immediate() {
        let mut fixture = fixture();
        let mut predictor = ClientPredictor::new(
            fixture.transition.clone(),
            fixture.start,
            &ClientConfig::default(),
        );

        let input = InputSample::new(KeyFlags::FORWARD, Quat::IDENTITY);
        let state = predictor.apply_input(5, input, &mut fixture.physics);

        assert!(state.position.z > 0.0);
        assert_eq!(predictor.state(), &state);
        assert_eq!(predictor.history().at(0), Some(&state));
        assert_eq!(predictor.pending_count(), 1);
    }

    #[test]
    fn matching_snapshots_never_touch_queued_predictions() {
        let mut fixture = fixture();
        let mut predictor = predictor(&mut fixture);
        let before: Vec<_> = predictor.pending().copied().collect();

        for record in &before[..4] {
            let outcome = predictor.reconcile(record.tick, &record.state, &mut fixture.physics);
            assert_eq!(outcome, Reconciliation::Confirmed);
        }

        let after: Vec<_> = predictor.pending().copied().collect();
        assert_eq!(after, before[4..].to_vec());
        assert_eq!(predictor.state(), &before[7].state);
        assert_eq!(predictor.corrections(), 0);
    }

    #[test]
    fn misprediction_replays_from_the_authoritative_state() {
        let mut fixture = fixture();
        let mut predictor = predictor(&mut fixture);
        let inputs = inputs();

        let mut authoritative = predictor.pending().nth(2).unwrap().state;
        authoritative.position += Vec3::new(1.0, 0.0, -0.5);

        let outcome = predictor.reconcile(102, &authoritative, &mut fixture.physics);
        assert_eq!(outcome, Reconciliation::Corrected { replayed: 5 });

        let mut expected = authoritative;
        let mut replayed = Vec::new();
        for input in &inputs[3..] {
            expected = fixture
                .transition
                .apply(input, &expected, &mut fixture.physics);
            replayed.push(expected);
        }

        let pending: Vec<_> = predictor.pending().map(|r| r.state).collect();
        assert_eq!(pending, replayed);
        assert_eq!(predictor.state(), &expected);
        assert_eq!(predictor.history().at(5), Some(&authoritative));
        assert_eq!(predictor.history().at(0), Some(&expected));
        assert_eq!(predictor.corrections(), 1);
    }

    #[test]
    fn small_errors_are_tolerated() {
        let mut fixture = fixture();
        let mut predictor = predictor(&mut fixture);

        let mut authoritative = predictor.pending().next().unwrap().state;
        authoritative.position.x += 0.04;

        let outcome = predictor.reconcile(100, &authoritative, &mut fixture.physics);

        assert_eq!(outcome, Reconciliation::Confirmed);
        assert_eq!(predictor.pending_count(), 7);
    }

    #[test]
    fn snapshots_without_a_matching_prediction_are_ignored() {
        let mut fixture = fixture();
        let mut predictor = predictor(&mut fixture);
        let state = *predictor.state();

        assert_eq!(
            predictor.reconcile(50, &fixture.start, &mut fixture.physics),
            Reconciliation::Stale
        );
        assert_eq!(predictor.pending_count(), 8);

        assert_eq!(
            predictor.reconcile(500, &fixture.start, &mut fixture.physics),
            Reconciliation::Stale
        );
        assert_eq!(predictor.pending_count(), 0);
        assert_eq!(predictor.state(), &state);
    }

    #[test]
    fn pending_queue_is_bounded() {
        let mut fixture = fixture();
        let config = ClientConfig {
            max_pending_predictions: 4,
            ..ClientConfig::default()
        };
        let mut predictor = ClientPredictor::new(fixture.transition.clone(), fixture.start, &config);

        for tick in 0..10 {
            predictor.apply_input(tick, InputSample::idle(), &mut fixture.physics);
        }

        assert_eq!(predictor.pending_count(), 4);
        assert_eq!(predictor.pending().next().map(|r| r.tick), Some(6));
    }
}
