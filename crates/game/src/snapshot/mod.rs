mod entity;
mod frame;
mod input;

pub use entity::{EntityId, EntityState, HealthUpdate, SpawnInfo, Tick};
pub use frame::{Snapshot, TickEvents};
pub use input::{InputSample, KeyFlags, sanitize_look};
