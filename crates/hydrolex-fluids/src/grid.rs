//! Per-step spatial grids over fluid and boundary particles.

use std::{
    collections::HashMap,
    ops::Range,
    sync::atomic::{AtomicU32, Ordering},
};

use glam::{IVec3, Vec3};
use rayon::prelude::*;

use crate::{
    hash::{hash_position, neighborhood},
    particle::{BoundarySnapshot, FluidParticle, FluidSnapshot},
};

/// Starting value of the cell size reduction, replaced by the first real particle.
pub const CELL_SIZE_SENTINEL: f32 = f32::MAX;

/// Axis-aligned min/max of a set of positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Bounds containing nothing. Including any point yields that point.
    pub const EMPTY: Bounds = Bounds {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    #[inline(always)]
    pub fn include(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    #[inline(always)]
    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn from_positions(positions: &[Vec3], batch_size: usize) -> Self {
        positions
            .par_iter()
            .with_min_len(batch_size)
            .fold(|| Bounds::EMPTY, |b, &p| b.include(p))
            .reduce(|| Bounds::EMPTY, Bounds::union)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Multi-map from cell hash to particle indices.
///
/// Built once, then read-only. Entries are kept sorted by `(hash, index)` so that rebuilding from
/// the same positions always yields the same buckets.
#[derive(Clone, Debug, Default)]
pub struct SpatialGrid {
    entries: Vec<(u32, usize)>,
    buckets: HashMap<u32, Range<usize>>,
}

impl SpatialGrid {
    pub fn build(positions: &[Vec3], cell_size: f32, batch_size: usize) -> Self {
        let mut entries: Vec<(u32, usize)> = positions
            .par_iter()
            .with_min_len(batch_size)
            .enumerate()
            .map(|(i, &p)| (hash_position(p, cell_size), i))
            .collect();

        entries.par_sort_unstable();

        let mut buckets = HashMap::new();
        let mut first = 0;

        for i in 1..=entries.len() {
            if i == entries.len() || entries[i].0 != entries[first].0 {
                buckets.insert(entries[first].0, first..i);
                first = i;
            }
        }

        Self { entries, buckets }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices stored under `key`, in ascending order.
    pub fn bucket(&self, key: u32) -> impl Iterator<Item = usize> + '_ {
        let range = self.buckets.get(&key).cloned().unwrap_or(0..0);
        self.entries[range].iter().map(|&(_, i)| i)
    }

    /// Candidate neighbors of a particle in `cell`: everything in the surrounding 3×3×3 cells.
    pub fn neighbors(&self, cell: IVec3) -> impl Iterator<Item = usize> + '_ {
        neighborhood(cell).flat_map(move |key| self.bucket(key))
    }
}

/// Smallest `radius * kernel_radius_rate` over all particles with a positive radius.
///
/// Positive finite floats order the same way as their bit patterns, so the reduction is an
/// atomic min on `u32`.
pub fn find_cell_size(particles: &[FluidParticle], kernel_radius_rate: f32, batch_size: usize) -> f32 {
    let cell_size = AtomicU32::new(CELL_SIZE_SENTINEL.to_bits());

    particles.par_iter().with_min_len(batch_size).for_each(|particle| {
        let size = particle.radius * kernel_radius_rate;
        if size > 0.0 && size.is_finite() {
            cell_size.fetch_min(size.to_bits(), Ordering::Relaxed);
        }
    });

    f32::from_bits(cell_size.into_inner())
}

/// Everything the density and force stages look particles up in.
#[derive(Clone, Debug)]
pub struct Grids {
    pub cell_size: f32,
    pub fluid: SpatialGrid,
    pub boundary: SpatialGrid,
    /// Bounds of fluid and boundary positions together.
    pub bounds: Bounds,
}

impl Grids {
    pub fn build(fluid: &FluidSnapshot, boundary: &BoundarySnapshot, kernel_radius_rate: f32, batch_size: usize) -> Self {
        let cell_size = find_cell_size(&fluid.particles, kernel_radius_rate, batch_size);

        let ((fluid_grid, boundary_grid), bounds) = rayon::join(
            || rayon::join(
                || SpatialGrid::build(&fluid.positions, cell_size, batch_size),
                || SpatialGrid::build(&boundary.positions, cell_size, batch_size),
            ),
            || Bounds::from_positions(&fluid.positions, batch_size)
                .union(Bounds::from_positions(&boundary.positions, batch_size)),
        );

        Self {
            cell_size,
            fluid: fluid_grid,
            boundary: boundary_grid,
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hash::quantize;

    use super::*;

    fn particle(radius: f32) -> FluidParticle {
        FluidParticle { radius, ..Default::default() }
    }

    #[test]
    fn cell_size_follows_smallest_radius() {
        let particles: Vec<_> = (0..1000).map(|i| particle(0.5 + (i % 17) as f32 * 0.01)).chain([particle(0.1)]).collect();
        assert_eq!(find_cell_size(&particles, 4.0, 8), 0.4);
    }

    #[test]
    fn cell_size_ignores_invalid_radii() {
        let particles = [particle(0.0), particle(-1.0), particle(f32::NAN), particle(0.25)];
        assert_eq!(find_cell_size(&particles, 4.0, 1), 1.0);
        assert_eq!(find_cell_size(&[], 4.0, 1), CELL_SIZE_SENTINEL);
    }

    #[test]
    fn buckets_hold_every_particle_once() {
        let positions: Vec<Vec3> = (0..200).map(|i| Vec3::new(i as f32 * 0.13, (i % 7) as f32, -(i as f32) * 0.05)).collect();
        let grid = SpatialGrid::build(&positions, 0.5, 16);

        assert_eq!(grid.len(), positions.len());

        for (i, &p) in positions.iter().enumerate() {
            let found: Vec<usize> = grid.bucket(hash_position(p, 0.5)).collect();
            assert!(found.contains(&i));
        }
    }

    #[test]
    fn neighbors_find_adjacent_cells() {
        let positions = [Vec3::ZERO, Vec3::new(0.9, 0.0, 0.0), Vec3::new(1.1, 0.0, 0.0), Vec3::new(-0.2, -0.2, 0.9)];
        let grid = SpatialGrid::build(&positions, 1.0, 1);

        let mut found: Vec<usize> = grid.neighbors(quantize(Vec3::ZERO, 1.0)).collect();
        found.sort_unstable();
        found.dedup();

        assert_eq!(found, vec![0, 1, 2, 3]);
    }

    #[test]
    fn bounds_cover_all_positions() {
        let positions = [Vec3::new(1.0, -2.0, 3.0), Vec3::new(-4.0, 5.0, 0.0), Vec3::new(0.0, 0.0, -6.0)];
        let bounds = Bounds::from_positions(&positions, 1);

        assert_eq!(bounds.min, Vec3::new(-4.0, -2.0, -6.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 5.0, 3.0));
        assert!(Bounds::from_positions(&[], 1).is_empty());
    }
}
