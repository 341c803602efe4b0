use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub type EntityId = u32;
pub type Tick = u32;

/// Authoritative or predicted state of one simulated entity at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: EntityId,
    pub position: Vec3,
    pub look: Quat,
    pub vertical_velocity: f32,
}

impl EntityState {
    pub fn spawned(entity_id: EntityId, position: Vec3) -> Self {
        Self {
            entity_id,
            position,
            look: Quat::IDENTITY,
            vertical_velocity: 0.0,
        }
    }

    /// Unit vector the entity is looking along.
    pub fn forward(&self) -> Vec3 {
        (self.look * Vec3::Z).normalize_or_zero()
    }

    pub fn distance(&self, other: &EntityState) -> f32 {
        self.position.distance(other.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnInfo {
    pub entity_id: EntityId,
    pub name: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthUpdate {
    pub entity_id: EntityId,
    pub health: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_state_looks_down_positive_z() {
        let state = EntityState::spawned(3, Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(state.entity_id, 3);
        assert_eq!(state.vertical_velocity, 0.0);
        assert!((state.forward() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn forward_follows_yaw() {
        let mut state = EntityState::spawned(1, Vec3::ZERO);
        state.look = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);

        assert!((state.forward() - Vec3::X).length() < 1e-5);
    }
}
