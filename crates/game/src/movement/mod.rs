mod config;
mod transition;

pub use config::MovementConfig;
pub use transition::StateTransition;
