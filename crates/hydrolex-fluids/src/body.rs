use std::collections::HashMap;

use glam::Vec3;

use crate::grid::Bounds;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub usize);

/// The rigid-body engine that owns fluid particle transforms, masses and velocities.
///
/// The solver only reads state through this interface and writes back through
/// [`RigidBodies::apply_impulse`].
pub trait RigidBodies {
    /// Creates a body at `position` with the given mass and zero velocity.
    fn create(&mut self, position: Vec3, mass: f32) -> BodyId;

    fn remove(&mut self, id: BodyId);

    fn position(&self, id: BodyId) -> Vec3;

    fn mass(&self, id: BodyId) -> f32;

    fn velocity(&self, id: BodyId) -> Vec3;

    fn apply_impulse(&mut self, id: BodyId, impulse: Vec3);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub inverse_mass: f32,
}

/// Minimal in-memory rigid-body store: point masses moved by their velocity.
#[derive(Clone, Debug, Default)]
pub struct BodyStore {
    bodies: HashMap<usize, RigidBody>,
    /// The number of bodies ever created (used for IDs).
    n_bodies: usize,
}

impl BodyStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(&id.0)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(&id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies.iter().map(|(&i, body)| (BodyId(i), body))
    }

    /// Advances every position by its velocity.
    pub fn integrate(&mut self, dt: f32) {
        self.bodies.values_mut().for_each(|body| {
            body.position += body.velocity * dt;
        });
    }

    /// Clamps bodies into `bounds`, killing the velocity component that pushed them out.
    pub fn confine(&mut self, bounds: Bounds) {
        self.bodies.values_mut().for_each(|body| {
            let p = &mut body.position;
            let v = &mut body.velocity;

            for axis in 0..3 {
                if p[axis] < bounds.min[axis] {
                    p[axis] = bounds.min[axis];
                    v[axis] = 0.0;
                }

                if p[axis] > bounds.max[axis] {
                    p[axis] = bounds.max[axis];
                    v[axis] = 0.0;
                }
            }
        });
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }
}

impl RigidBodies for BodyStore {
    fn create(&mut self, position: Vec3, mass: f32) -> BodyId {
        let i = self.n_bodies;
        self.n_bodies += 1;

        self.bodies.insert(i, RigidBody {
            position,
            velocity: Vec3::ZERO,
            inverse_mass: 1.0 / mass,
        });
        BodyId(i)
    }

    fn remove(&mut self, id: BodyId) {
        self.bodies.remove(&id.0);
    }

    fn position(&self, id: BodyId) -> Vec3 {
        self.get(id).map_or(Vec3::ZERO, |body| body.position)
    }

    fn mass(&self, id: BodyId) -> f32 {
        self.get(id).map_or(0.0, |body| 1.0 / body.inverse_mass)
    }

    fn velocity(&self, id: BodyId) -> Vec3 {
        self.get(id).map_or(Vec3::ZERO, |body| body.velocity)
    }

    fn apply_impulse(&mut self, id: BodyId, impulse: Vec3) {
        if let Some(body) = self.get_mut(id) {
            body.velocity += impulse * body.inverse_mass;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_scales_by_inverse_mass() {
        let mut bodies = BodyStore::new();
        let id = bodies.create(Vec3::ZERO, 2.0);

        bodies.apply_impulse(id, Vec3::new(4.0, 0.0, -2.0));
        assert_eq!(bodies.velocity(id), Vec3::new(2.0, 0.0, -1.0));
        assert_eq!(bodies.mass(id), 2.0);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut bodies = BodyStore::new();
        let a = bodies.create(Vec3::ZERO, 1.0);
        bodies.remove(a);
        let b = bodies.create(Vec3::ONE, 1.0);

        assert_ne!(a, b);
        assert_eq!(bodies.len(), 1);
        assert!(bodies.get(a).is_none());
    }

    #[test]
    fn integrate_then_confine() {
        let mut bodies = BodyStore::new();
        let id = bodies.create(Vec3::new(0.5, 0.5, 0.5), 1.0);
        bodies.apply_impulse(id, Vec3::new(1.0, -2.0, 0.0));
        bodies.integrate(0.5);

        assert_eq!(bodies.position(id), Vec3::new(1.0, -0.5, 0.5));

        bodies.confine(Bounds { min: Vec3::ZERO, max: Vec3::splat(0.8) });
        let body = bodies.get(id).copied().unwrap();
        assert_eq!(body.position, Vec3::new(0.8, 0.0, 0.5));
        assert_eq!(body.velocity, Vec3::ZERO);
    }
}
