use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

use crate::movement::MovementConfig;
use crate::snapshot::EntityId;

use super::{PhysicsBackend, RayHit};

#[derive(Debug, Clone, Copy)]
struct FlatBody {
    position: Vec3,
    enabled: bool,
}

/// Infinite floor at y = 0 with no other obstacles. Characters are vertical
/// cylinders that never collide with each other.
#[derive(Debug, Clone)]
pub struct FlatWorld {
    bodies: BTreeMap<EntityId, FlatBody>,
    radius: f32,
    half_height: f32,
    ground_probe: f32,
}

impl FlatWorld {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            bodies: BTreeMap::new(),
            radius: config.player_radius,
            half_height: config.half_height(),
            ground_probe: config.ground_probe,
        }
    }

    /// Height of a character's center when standing on the floor.
    pub fn standing_height(&self) -> f32 {
        self.half_height
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn is_enabled(&self, entity: EntityId) -> bool {
        self.bodies.get(&entity).is_some_and(|b| b.enabled)
    }

    fn hit_body(&self, origin: Vec3, direction: Vec3, center: Vec3) -> Option<f32> {
        let (mut enter, mut exit) = (f32::NEG_INFINITY, f32::INFINITY);

        let offset = Vec2::new(origin.x - center.x, origin.z - center.z);
        let dir = Vec2::new(direction.x, direction.z);
        let a = dir.length_squared();
        let c = offset.length_squared() - self.radius * self.radius;
        if a <= f32::EPSILON {
            if c > 0.0 {
                return None;
            }
        } else {
            let b = offset.dot(dir);
            let discriminant = b * b - a * c;
            if discriminant < 0.0 {
                return None;
            }
            let root = discriminant.sqrt();
            enter = enter.max((-b - root) / a);
            exit = exit.min((-b + root) / a);
        }

        let bottom = center.y - self.half_height;
        let top = center.y + self.half_height;
        if direction.y.abs() <= f32::EPSILON {
            if origin.y < bottom || origin.y > top {
                return None;
            }
        } else {
            let t0 = (bottom - origin.y) / direction.y;
            let t1 = (top - origin.y) / direction.y;
            enter = enter.max(t0.min(t1));
            exit = exit.min(t0.max(t1));
        }

        if enter > exit || exit < 0.0 {
            return None;
        }
        Some(enter.max(0.0))
    }
}

impl PhysicsBackend for FlatWorld {
    fn insert_character(&mut self, entity: EntityId, position: Vec3) {
        self.bodies.insert(
            entity,
            FlatBody {
                position,
                enabled: true,
            },
        );
    }

    fn remove_character(&mut self, entity: EntityId) {
        self.bodies.remove(&entity);
    }

    fn place(&mut self, entity: EntityId, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(&entity) {
            body.position = position;
        }
    }

    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.bodies.get(&entity).map(|b| b.position)
    }

    fn move_character(&mut self, entity: EntityId, displacement: Vec3) -> Option<Vec3> {
        let floor = self.half_height;
        let body = self.bodies.get_mut(&entity)?;
        let mut target = body.position + displacement;
        if target.y < floor {
            target.y = floor;
        }
        body.position = target;
        Some(target)
    }

    fn is_grounded(&self, entity: EntityId) -> bool {
        self.bodies
            .get(&entity)
            .is_some_and(|b| b.position.y <= self.ground_probe)
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

        let mut best: Option<(Option<EntityId>, f32)> = None;
        if direction.y < 0.0 && origin.y >= 0.0 {
            best = Some((None, -origin.y / direction.y));
        }

        for (id, body) in &self.bodies {
            if !body.enabled || Some(*id) == ignore {
                continue;
            }
            if let Some(t) = self.hit_body(origin, direction, body.position) {
                if best.is_none_or(|(_, nearest)| t < nearest) {
                    best = Some((Some(*id), t));
                }
            }
        }

        let (entity, distance) = best.filter(|(_, t)| *t <= max_distance)?;
        Some(RayHit {
            entity,
            point: origin + direction * distance,
            distance,
        })
    }

    fn set_collider_enabled(&mut self, entity: EntityId, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(&entity) {
            body.enabled = enabled;
        }
    }
}
