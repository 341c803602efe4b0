use glam::Vec3;

use super::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaObject {
    /// Square slab whose top face sits at `top`.
    Ground { top: f32, half_size: f32 },
    StaticBox { position: Vec3, half_extents: Vec3 },
}

/// Static level geometry shared by every room of a server.
#[derive(Debug, Clone)]
pub struct Arena {
    objects: Vec<ArenaObject>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::proving_ground()
    }
}

impl Arena {
    const GROUND_SIZE: f32 = 100.0;

    pub fn new(objects: Vec<ArenaObject>) -> Self {
        Self { objects }
    }

    /// Bare floor with its top face at y = 0.
    pub fn flat() -> Self {
        Self::new(vec![ArenaObject::Ground {
            top: 0.0,
            half_size: Self::GROUND_SIZE,
        }])
    }

    /// Floor plus a ring of cover boxes around the spawn point.
    pub fn proving_ground() -> Self {
        let mut arena = Self::flat();

        for (x, z) in [(12.0, 0.0), (-12.0, 0.0), (0.0, 12.0), (0.0, -12.0)] {
            arena.objects.push(ArenaObject::StaticBox {
                position: Vec3::new(x, 1.0, z),
                half_extents: Vec3::new(1.5, 1.0, 1.5),
            });
        }

        for i in 0..6 {
            let step = i as f32;
            arena.objects.push(ArenaObject::StaticBox {
                position: Vec3::new(-20.0, 0.15 + 0.3 * step, 20.0 + 0.4 * step),
                half_extents: Vec3::new(2.0, 0.15, 0.2),
            });
        }

        arena
    }

    pub fn objects(&self) -> &[ArenaObject] {
        &self.objects
    }

    pub fn build(&self, physics: &mut PhysicsWorld) {
        for object in &self.objects {
            match *object {
                ArenaObject::Ground { top, half_size } => {
                    physics.add_ground(top, half_size);
                }
                ArenaObject::StaticBox {
                    position,
                    half_extents,
                } => {
                    physics.add_static_box(position, half_extents);
                }
            }
        }
        log::debug!("built arena with {} static objects", self.objects.len());
    }
}
