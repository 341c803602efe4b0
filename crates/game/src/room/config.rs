use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::movement::MovementConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitScanConfig {
    pub max_range: f32,
    pub damage: u8,
    pub max_health: u8,
}

impl Default for HitScanConfig {
    fn default() -> Self {
        Self {
            max_range: 200.0,
            damage: 5,
            max_health: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub name: String,
    pub max_slots: u8,
    pub history_capacity: usize,
    pub input_buffer_target: usize,
    pub input_buffer_tolerance: u32,
    pub spawn_point: Vec3,
    /// Distance between neighbouring spawn positions around `spawn_point`.
    pub spawn_spacing: f32,
    pub movement: MovementConfig,
    pub hit_scan: HitScanConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: String::from("arena"),
            max_slots: 10,
            history_capacity: 10,
            input_buffer_target: 1,
            input_buffer_tolerance: 2,
            spawn_point: Vec3::new(0.0, 1.0, 0.0),
            spawn_spacing: 1.5,
            movement: MovementConfig::default(),
            hit_scan: HitScanConfig::default(),
        }
    }
}

impl RoomConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
