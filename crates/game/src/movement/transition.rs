use glam::{EulerRot, Vec3};

use crate::physics::PhysicsBackend;
use crate::snapshot::{EntityState, InputSample, KeyFlags};

use super::MovementConfig;

/// Deterministic single-tick movement step run identically by the server and
/// the predicting client.
#[derive(Debug, Clone, Default)]
pub struct StateTransition {
    config: MovementConfig,
}

impl StateTransition {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Advances `previous` by one tick of `input`.
    ///
    /// The body is first placed at `previous.position`, so the result depends
    /// only on the arguments and the static geometry of `physics`.
    pub fn apply<P: PhysicsBackend + ?Sized>(
        &self,
        input: &InputSample,
        previous: &EntityState,
        physics: &mut P,
    ) -> EntityState {
        let dt = self.config.tick_duration();
        let entity = previous.entity_id;
        physics.place(entity, previous.position);

        let (yaw, _, _) = input.look.to_euler(EulerRot::YXZ);
        let horizontal = local_to_world_direction(wish_direction(input.keys), yaw)
            * self.config.walk_speed
            * dt;

        let vertical_velocity = if physics.is_grounded(entity) {
            if input.keys.contains(KeyFlags::JUMP) {
                self.config.jump_impulse
            } else {
                previous.vertical_velocity.max(0.0)
            }
        } else {
            previous.vertical_velocity - self.config.gravity
        };

        let displacement = horizontal + Vec3::Y * (vertical_velocity * dt);
        let position = physics
            .move_character(entity, displacement)
            .unwrap_or(previous.position + displacement);

        EntityState {
            entity_id: entity,
            position,
            look: input.look,
            vertical_velocity,
        }
    }
}

/// Local movement axes: forward is +Z, right is +X.
fn wish_direction(keys: KeyFlags) -> Vec3 {
    let mut direction = Vec3::ZERO;
    if keys.contains(KeyFlags::FORWARD) {
        direction.z += 1.0;
    }
    if keys.contains(KeyFlags::BACK) {
        direction.z -= 1.0;
    }
    if keys.contains(KeyFlags::RIGHT) {
        direction.x += 1.0;
    }
    if keys.contains(KeyFlags::LEFT) {
        direction.x -= 1.0;
    }
    direction
}

fn local_to_world_direction(local: Vec3, yaw: f32) -> Vec3 {
    if local.length_squared() < 0.001 {
        return Vec3::ZERO;
    }

    let normalized = local.normalize();
    let (sin_yaw, cos_yaw) = yaw.sin_cos();

    Vec3::new(
        normalized.x * cos_yaw + normalized.z * sin_yaw,
        0.0,
        -normalized.x * sin_yaw + normalized.z * cos_yaw,
    )
}
