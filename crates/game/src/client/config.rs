use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub snapshot_buffer_target: usize,
    pub snapshot_buffer_tolerance: u32,
    /// Distance between predicted and authoritative position that counts as a misprediction.
    pub correction_threshold: f32,
    pub history_capacity: usize,
    /// Unconfirmed predictions kept for replay; older ones are forgotten.
    pub max_pending_predictions: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            snapshot_buffer_target: 1,
            snapshot_buffer_tolerance: 1,
            correction_threshold: 0.05,
            history_capacity: 10,
            max_pending_predictions: 128,
        }
    }
}
