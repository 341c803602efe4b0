use glam::Vec3;

use crate::movement::MovementConfig;
use crate::physics::{PhysicsBackend, RayHit};
use crate::simulation::EntitySimulationHistory;
use crate::snapshot::{EntityId, EntityState, Tick};

use super::HitScanConfig;

/// An entity as seen by the lag compensator: its present state and its past.
#[derive(Debug, Clone, Copy)]
pub struct RewindTarget<'a> {
    pub entity_id: EntityId,
    pub current: &'a EntityState,
    pub history: &'a EntitySimulationHistory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotReport {
    pub ticks_ago: usize,
    pub origin: Vec3,
    pub direction: Vec3,
    pub hit: Option<RayHit>,
    /// Targets evaluated at a historical position rather than their present one.
    pub rewound: usize,
}

impl ShotReport {
    pub fn hit_entity(&self) -> Option<EntityId> {
        self.hit.and_then(|hit| hit.entity)
    }
}

/// Validates hit-scans against where targets were when the shooter fired.
#[derive(Debug, Clone)]
pub struct LagCompensator {
    max_range: f32,
    eye_height: f32,
    history_capacity: usize,
}

impl LagCompensator {
    pub fn new(hit_scan: &HitScanConfig, movement: &MovementConfig, history_capacity: usize) -> Self {
        Self {
            max_range: hit_scan.max_range,
            eye_height: movement.eye_height,
            history_capacity: history_capacity.max(1),
        }
    }

    /// How far back `reported_tick` lies from the tick being simulated, clamped
    /// to the history horizon.
    pub fn ticks_ago(&self, server_tick: Tick, reported_tick: Tick) -> usize {
        let raw = server_tick as i64 - 1 - reported_tick as i64;
        raw.clamp(0, self.history_capacity as i64 - 1) as usize
    }

    /// Rewinds `others` to `reported_tick`, casts the shot and puts every
    /// target back where it was before returning.
    pub fn resolve<P: PhysicsBackend + ?Sized>(
        &self,
        physics: &mut P,
        server_tick: Tick,
        reported_tick: Tick,
        shooter: &RewindTarget<'_>,
        others: &[RewindTarget<'_>],
    ) -> ShotReport {
        let ticks_ago = self.ticks_ago(server_tick, reported_tick);
        let aim = shooter.history.at(ticks_ago).unwrap_or(shooter.current);
        let origin = aim.position + Vec3::Y * self.eye_height;
        let direction = aim.forward();

        let present: Vec<(EntityId, Vec3)> = others
            .iter()
            .map(|target| {
                let position = physics
                    .position(target.entity_id)
                    .unwrap_or(target.current.position);
                (target.entity_id, position)
            })
            .collect();

        let mut rewound = 0;
        for target in others {
            let Some(past) = target.history.at(ticks_ago) else {
                continue;
            };
            teleport(physics, target.entity_id, past.position);
            rewound += 1;
        }

        let hit = if direction == Vec3::ZERO {
            None
        } else {
            physics.raycast(origin, direction, self.max_range, Some(shooter.entity_id))
        };

        for (entity_id, position) in present {
            teleport(physics, entity_id, position);
        }

        ShotReport {
            ticks_ago,
            origin,
            direction,
            hit,
            rewound,
        }
    }
}

fn teleport<P: PhysicsBackend + ?Sized>(physics: &mut P, entity_id: EntityId, position: Vec3) {
    physics.set_collider_enabled(entity_id, false);
    physics.place(entity_id, position);
    physics.set_collider_enabled(entity_id, true);
}
