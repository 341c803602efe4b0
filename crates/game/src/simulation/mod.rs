mod history;
mod jitter;
mod tick;

pub use history::{DEFAULT_HISTORY_CAPACITY, EntitySimulationHistory};
pub use jitter::{Correction, JitterBuffer};
pub use tick::FixedTimestep;
