mod arena;
mod flat;
mod world;

use glam::Vec3;

use crate::snapshot::EntityId;

pub use arena::{Arena, ArenaObject};
pub use flat::FlatWorld;
pub use world::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// `None` when the ray stopped on level geometry.
    pub entity: Option<EntityId>,
    pub point: Vec3,
    pub distance: f32,
}

/// Collision capabilities the movement and hit-scan code is written against.
///
/// Every character is a vertical capsule-like body identified by its entity id.
/// Calls naming an unknown entity are no-ops.
pub trait PhysicsBackend {
    fn insert_character(&mut self, entity: EntityId, position: Vec3);

    fn remove_character(&mut self, entity: EntityId);

    /// Teleports without collision resolution.
    fn place(&mut self, entity: EntityId, position: Vec3);

    fn position(&self, entity: EntityId) -> Option<Vec3>;

    /// Moves by `displacement`, resolving collisions, and returns the new position.
    fn move_character(&mut self, entity: EntityId, displacement: Vec3) -> Option<Vec3>;

    fn is_grounded(&self, entity: EntityId) -> bool;

    fn raycast(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: Option<EntityId>,
    ) -> Option<RayHit>;

    fn set_collider_enabled(&mut self, entity: EntityId, enabled: bool);

    /// Makes pending teleports visible to collision queries.
    fn refresh_queries(&mut self) {}
}
