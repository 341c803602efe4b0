use std::collections::HashMap;

use glam::Vec3;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::*;

use crate::movement::MovementConfig;
use crate::snapshot::EntityId;

use super::{Arena, PhysicsBackend, RayHit};

const GROUND_THICKNESS: Real = 0.1;

/// rapier world holding static level geometry and one kinematic body per character.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    controller: KinematicCharacterController,
    character_shape: SharedShape,
    ground_probe: Real,
    characters: HashMap<EntityId, RigidBodyHandle>,
    owners: HashMap<RigidBodyHandle, EntityId>,
    // Scene queries only see body moves after a pipeline step.
    queries_stale: bool,
}

impl PhysicsWorld {
    pub fn new(config: &MovementConfig) -> Self {
        let dt = config.tick_duration();
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt;
        integration_parameters.min_ccd_dt = dt / 100.0;

        let mut controller = KinematicCharacterController::default();
        controller.offset = CharacterLength::Absolute(0.02);
        controller.up = Vector::Y;
        controller.max_slope_climb_angle = 50_f32.to_radians();
        controller.min_slope_slide_angle = 35_f32.to_radians();
        controller.snap_to_ground = Some(CharacterLength::Absolute(0.2));
        controller.autostep = Some(CharacterAutostep {
            max_height: CharacterLength::Absolute(0.35),
            min_width: CharacterLength::Absolute(0.15),
            include_dynamic_bodies: false,
        });

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -9.81, 0.0),
            controller,
            character_shape: SharedShape::cylinder(config.half_height(), config.player_radius),
            ground_probe: config.ground_probe,
            characters: HashMap::new(),
            owners: HashMap::new(),
            queries_stale: false,
        }
    }

    pub fn with_arena(config: &MovementConfig, arena: &Arena) -> Self {
        let mut world = Self::new(config);
        arena.build(&mut world);
        world.step();
        world
    }

    pub fn step(&mut self) {
        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.queries_stale = false;
    }

    pub fn add_static_box(&mut self, position: Vec3, half_extents: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(Vector::new(position.x, position.y, position.z))
            .build();
        self.queries_stale = true;
        self.colliders.insert(collider)
    }

    pub fn add_ground(&mut self, top: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, GROUND_THICKNESS, half_size)
            .translation(Vector::new(0.0, top - GROUND_THICKNESS, 0.0))
            .build();
        self.queries_stale = true;
        self.colliders.insert(collider)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    fn set_body_position(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let current_rot = *body.rotation();
            let new_pose =
                Pose::from_parts(Vector::new(position.x, position.y, position.z), current_rot);
            body.set_position(new_pose, true);
            body.set_next_kinematic_position(new_pose);
            self.queries_stale = true;
        }
    }

    fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec3::new(t.x, t.y, t.z)
        })
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn insert_character(&mut self, entity: EntityId, position: Vec3) {
        if self.characters.contains_key(&entity) {
            self.place(entity, position);
            return;
        }

        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(Vector::new(position.x, position.y, position.z))
            .lock_rotations()
            .build();
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::new(self.character_shape.clone())
            .friction(0.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        self.characters.insert(entity, handle);
        self.owners.insert(handle, entity);
        self.queries_stale = true;
    }

    fn remove_character(&mut self, entity: EntityId) {
        let Some(handle) = self.characters.remove(&entity) else {
            return;
        };
        self.owners.remove(&handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.queries_stale = true;
    }

    fn place(&mut self, entity: EntityId, position: Vec3) {
        if let Some(&handle) = self.characters.get(&entity) {
            self.set_body_position(handle, position);
        }
    }

    fn position(&self, entity: EntityId) -> Option<Vec3> {
        let handle = self.characters.get(&entity)?;
        self.body_position(*handle)
    }

    fn move_character(&mut self, entity: EntityId, displacement: Vec3) -> Option<Vec3> {
        let handle = *self.characters.get(&entity)?;
        let character_pos = *self.bodies.get(handle)?.position();

        let corrected = {
            let filter = QueryFilter::default().exclude_rigid_body(handle);
            let query_pipeline = self.broad_phase.as_query_pipeline(
                self.narrow_phase.query_dispatcher(),
                &self.bodies,
                &self.colliders,
                filter,
            );

            self.controller.move_shape(
                self.integration_parameters.dt,
                &query_pipeline,
                self.character_shape.as_ref(),
                &character_pos,
                Vector::new(displacement.x, displacement.y, displacement.z),
                |_collision| {},
            )
        };

        let current_pos = character_pos.translation;
        let new_position = current_pos + corrected.translation;
        let new_position = Vec3::new(new_position.x, new_position.y, new_position.z);
        self.set_body_position(handle, new_position);
        Some(new_position)
    }

    fn is_grounded(&self, entity: EntityId) -> bool {
        let Some(&handle) = self.characters.get(&entity) else {
            return false;
        };
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };

        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default().exclude_rigid_body(handle),
        );

        let pos = body.translation();
        let ray = Ray::new(
            Vector::new(pos.x, pos.y, pos.z),
            Vector::new(0.0, -1.0, 0.0),
        );

        query.cast_ray(&ray, self.ground_probe, true).is_some()
    }

    fn raycast(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: Option<EntityId>,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        self.refresh_queries();

        let mut filter = QueryFilter::default();
        if let Some(&handle) = ignore.and_then(|id| self.characters.get(&id)) {
            filter = filter.exclude_rigid_body(handle);
        }

        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );
        let ray = Ray::new(
            Vector::new(origin.x, origin.y, origin.z),
            Vector::new(direction.x, direction.y, direction.z),
        );

        let (collider, toi) = query.cast_ray(&ray, max_distance, true)?;
        let entity = self
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .and_then(|body| self.owners.get(&body))
            .copied();

        Some(RayHit {
            entity,
            point: origin + direction * toi,
            distance: toi,
        })
    }

    fn set_collider_enabled(&mut self, entity: EntityId, enabled: bool) {
        let Some(&handle) = self.characters.get(&entity) else {
            return;
        };
        let Some(body) = self.bodies.get(handle) else {
            return;
        };

        let collider_handles: Vec<_> = body.colliders().to_vec();
        for collider_handle in collider_handles {
            if let Some(collider) = self.colliders.get_mut(collider_handle) {
                collider.set_enabled(enabled);
            }
        }
        self.queries_stale = true;
    }

    fn refresh_queries(&mut self) {
        if self.queries_stale {
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsWorld {
        PhysicsWorld::with_arena(&MovementConfig::default(), &Arena::flat())
    }

    #[test]
    fn character_lands_on_ground() {
        let mut world = world();
        world.insert_character(1, Vec3::new(0.0, 3.0, 0.0));
        assert!(!world.is_grounded(1));

        for _ in 0..40 {
            world.move_character(1, Vec3::new(0.0, -0.2, 0.0));
        }

        let position = world.position(1).unwrap();
        assert!(position.y > 0.85 && position.y < 1.1, "y = {}", position.y);
        assert!(world.is_grounded(1));
    }

    #[test]
    fn ray_reports_owning_entity() {
        let mut world = world();
        world.insert_character(1, Vec3::new(0.0, 1.0, 0.0));
        world.insert_character(2, Vec3::new(0.0, 1.0, 6.0));

        let hit = world
            .raycast(Vec3::new(0.0, 1.5, 0.0), Vec3::Z, 200.0, Some(1))
            .unwrap();
        assert_eq!(hit.entity, Some(2));
        assert!((hit.distance - 5.7).abs() < 0.05);
    }

    #[test]
    fn disabled_collider_is_not_hit() {
        let mut world = world();
        world.insert_character(2, Vec3::new(0.0, 1.0, 6.0));
        world.set_collider_enabled(2, false);

        let hit = world.raycast(Vec3::new(0.0, 1.5, 0.0), Vec3::Z, 200.0, None);
        assert!(hit.is_none_or(|h| h.entity != Some(2)));

        world.set_collider_enabled(2, true);
        let hit = world.raycast(Vec3::new(0.0, 1.5, 0.0), Vec3::Z, 200.0, None);
        assert_eq!(hit.and_then(|h| h.entity), Some(2));
    }

    #[test]
    fn placed_character_is_found_at_new_position() {
        let mut world = world();
        world.insert_character(2, Vec3::new(0.0, 1.0, 6.0));
        world.place(2, Vec3::new(0.0, 1.0, -6.0));

        let hit = world
            .raycast(Vec3::new(0.0, 1.5, 0.0), Vec3::NEG_Z, 200.0, None)
            .unwrap();
        assert_eq!(hit.entity, Some(2));

        world.remove_character(2);
        assert_eq!(world.character_count(), 0);
        assert!(world.position(2).is_none());
    }
}
