use serde::{Deserialize, Serialize};

/// Kinematics shared bit-for-bit by the server and every predicting client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    pub tick_rate: u32,
    /// Horizontal speed in units per second.
    pub walk_speed: f32,
    /// Upward velocity set by a grounded jump, units per second.
    pub jump_impulse: f32,
    /// Subtracted from vertical velocity on every airborne tick.
    pub gravity: f32,

    pub player_radius: f32,
    pub player_height: f32,
    /// Length of the downward ground probe, measured from the body center.
    pub ground_probe: f32,
    /// Height of the eyes above the body center; hit-scans start here.
    pub eye_height: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50,
            walk_speed: 5.0,
            jump_impulse: 6.0,
            gravity: 0.2,

            player_radius: 0.3,
            player_height: 1.8,
            ground_probe: 1.0,
            eye_height: 0.6,
        }
    }
}

impl MovementConfig {
    pub fn tick_duration(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn half_height(&self) -> f32 {
        self.player_height / 2.0
    }
}
