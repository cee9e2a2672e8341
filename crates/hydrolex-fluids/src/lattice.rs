//! Regular particle lattices filling oriented boxes.

use glam::{Mat4, UVec3, Vec3};
use rayon::prelude::*;

use crate::{error::GeometryError, particle::ParticleKind};

/// Upper bound on the particles a single lattice may emit.
pub const MAX_LATTICE_PARTICLES: u64 = 1 << 26;

/// Object-space axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub size: Vec3,
}

impl Aabb {
    #[inline(always)]
    pub fn new(min: Vec3, size: Vec3) -> Self {
        Self { min, size }
    }
}

/// Receives "create particle at world position" commands. May be called from many threads.
pub trait SpawnSink: Sync {
    fn spawn(&self, template: ParticleKind, position: Vec3);
}

/// A box tiled with particles spaced `2 * radius` apart (in object space, per axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    transform: Mat4,
    bounds_min: Vec3,
    /// Radius divided by the transform's per-axis scale.
    scaled_radius: Vec3,
    counts: UVec3,
}

impl Lattice {
    /// Lays out a lattice of particles of `radius` over `bounds` placed in the world by
    /// `transform`.
    ///
    /// The radius is divided by each basis vector's length so spacing is uniform in world space
    /// even when the transform scales non-uniformly.
    pub fn new(bounds: Aabb, transform: Mat4, radius: f32) -> Result<Self, GeometryError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(GeometryError::Radius(radius));
        }

        if !(bounds.size.is_finite() && bounds.size.cmpge(Vec3::ZERO).all() && bounds.min.is_finite()) {
            return Err(GeometryError::Bounds(bounds.size));
        }

        let scale = Vec3::new(
            transform.x_axis.truncate().length(),
            transform.y_axis.truncate().length(),
            transform.z_axis.truncate().length(),
        );

        let scaled_radius = radius / scale;
        if !(scaled_radius.is_finite() && scaled_radius.cmpgt(Vec3::ZERO).all()) {
            return Err(GeometryError::Scale(scale));
        }

        let counts = (bounds.size / (2.0 * scaled_radius)).ceil();
        let total = counts.x as f64 * counts.y as f64 * counts.z as f64;
        if total > MAX_LATTICE_PARTICLES as f64 {
            return Err(GeometryError::TooManyParticles(total as u64));
        }

        Ok(Self {
            transform,
            bounds_min: bounds.min,
            scaled_radius,
            counts: counts.as_uvec3(),
        })
    }

    /// Particles along each axis.
    #[inline(always)]
    pub fn counts(&self) -> UVec3 {
        self.counts
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.counts.x as usize * self.counts.y as usize * self.counts.z as usize
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lattice coordinate of a linear index, x varying fastest.
    #[inline(always)]
    pub fn coordinate(&self, index: usize) -> UVec3 {
        let nx = self.counts.x as usize;
        let ny = self.counts.y as usize;

        UVec3::new(
            (index % nx) as u32,
            ((index / nx) % ny) as u32,
            (index / (nx * ny)) as u32,
        )
    }

    /// World position of the particle at `index`, centered inside its lattice cell.
    pub fn position(&self, index: usize) -> Vec3 {
        let local = self.coordinate(index).as_vec3() * 2.0 * self.scaled_radius + self.bounds_min + self.scaled_radius;
        self.transform.transform_point3(local)
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.len()).map(|i| self.position(i))
    }

    /// Sends every particle to `sink`. Emission order is unspecified.
    pub fn emit<S: SpawnSink + ?Sized>(&self, template: ParticleKind, sink: &S, batch_size: usize) -> usize {
        (0..self.len())
            .into_par_iter()
            .with_min_len(batch_size)
            .for_each(|i| sink.spawn(template, self.position(i)));

        self.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use glam::Quat;

    use crate::particle::FluidParticle;

    use super::*;

    struct Collect(Mutex<Vec<Vec3>>);

    impl SpawnSink for Collect {
        fn spawn(&self, _template: ParticleKind, position: Vec3) {
            self.0.lock().unwrap().push(position);
        }
    }

    fn template() -> ParticleKind {
        ParticleKind::Fluid { particle: FluidParticle::default(), mass: 1.0 }
    }

    #[test]
    fn unit_lattice_is_two_cubed() {
        let lattice = Lattice::new(Aabb::new(Vec3::ZERO, Vec3::splat(4.0)), Mat4::IDENTITY, 1.0).unwrap();
        assert_eq!(lattice.counts(), UVec3::splat(2));

        let mut positions: Vec<Vec3> = lattice.positions().collect();
        positions.sort_by(|a, b| a.to_array().partial_cmp(&b.to_array()).unwrap());

        assert_eq!(positions.len(), 8);
        assert_eq!(positions[0], Vec3::ONE);
        assert_eq!(positions[7], Vec3::splat(3.0));
    }

    #[test]
    fn partial_cells_round_up() {
        let lattice = Lattice::new(Aabb::new(Vec3::ZERO, Vec3::new(4.5, 2.0, 0.1)), Mat4::IDENTITY, 1.0).unwrap();
        assert_eq!(lattice.counts(), UVec3::new(3, 1, 1));
    }

    #[test]
    fn scale_is_compensated() {
        let transform = Mat4::from_scale_rotation_translation(Vec3::new(2.0, 1.0, 1.0), Quat::IDENTITY, Vec3::ZERO);
        let lattice = Lattice::new(Aabb::new(Vec3::ZERO, Vec3::splat(4.0)), transform, 1.0).unwrap();

        // Object-space spacing halves along x, world-space spacing stays 2.
        assert_eq!(lattice.counts(), UVec3::new(4, 2, 2));
        let a = lattice.position(0);
        let b = lattice.position(1);
        assert!(((b - a).length() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn coordinates_cover_every_cell_once() {
        let lattice = Lattice::new(Aabb::new(Vec3::ZERO, Vec3::new(6.0, 4.0, 2.0)), Mat4::IDENTITY, 1.0).unwrap();
        let mut coords: Vec<[u32; 3]> = (0..lattice.len()).map(|i| lattice.coordinate(i).to_array()).collect();
        coords.sort_unstable();
        coords.dedup();
        assert_eq!(coords.len(), 3 * 2 * 1);
    }

    #[test]
    fn emit_reaches_sink_in_parallel() {
        let lattice = Lattice::new(Aabb::new(Vec3::splat(-1.0), Vec3::splat(2.0)), Mat4::IDENTITY, 0.1).unwrap();
        let sink = Collect(Mutex::new(Vec::new()));

        assert_eq!(lattice.emit(template(), &sink, 4), 1000);
        assert_eq!(sink.0.into_inner().unwrap().len(), 1000);
    }

    #[test]
    fn degenerate_geometry_is_refused() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);

        assert_eq!(Lattice::new(bounds, Mat4::IDENTITY, 0.0), Err(GeometryError::Radius(0.0)));
        assert_eq!(Lattice::new(bounds, Mat4::IDENTITY, -1.0), Err(GeometryError::Radius(-1.0)));

        let flat = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(Lattice::new(bounds, flat, 0.1), Err(GeometryError::Scale(_))));

        let negative = Aabb::new(Vec3::ZERO, Vec3::new(1.0, -1.0, 1.0));
        assert!(matches!(Lattice::new(negative, Mat4::IDENTITY, 0.1), Err(GeometryError::Bounds(_))));

        assert!(matches!(Lattice::new(bounds, Mat4::IDENTITY, 1e-6), Err(GeometryError::TooManyParticles(_))));
    }
}
