use glam::Vec3;
use rayon::prelude::*;

use crate::{
    grid::Grids,
    hash::quantize,
    particle::{BoundarySnapshot, FluidSnapshot},
};

use super::kernel;

/// A particle on the other side of a pairwise interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Neighbor {
    Fluid(usize),
    Boundary(usize),
}

/// The state a pair interaction reads from either side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleState {
    pub density: f32,
    pub pressure: f32,
    pub velocity: Vec3,
    pub mass: f32,
}

/// Read-only view over everything the force stage needs.
pub struct ForceContext<'a> {
    pub fluid: &'a FluidSnapshot,
    pub boundary: &'a BoundarySnapshot,
    pub grids: &'a Grids,
    pub densities: &'a [f32],
    pub pressures: &'a [f32],
    pub kernel_radius_rate: f32,
    pub gravity: Vec3,
}

impl ForceContext<'_> {
    /// Boundary particles sit at rest density with no pressure and no velocity.
    #[inline(always)]
    pub fn state(&self, neighbor: Neighbor) -> ParticleState {
        match neighbor {
            Neighbor::Fluid(j) => ParticleState {
                density: self.densities[j],
                pressure: self.pressures[j],
                velocity: self.fluid.velocities[j],
                mass: self.fluid.masses[j],
            },
            Neighbor::Boundary(j) => {
                let particle = &self.boundary.particles[j];
                ParticleState {
                    density: particle.rest_density,
                    pressure: 0.0,
                    velocity: Vec3::ZERO,
                    mass: particle.mass,
                }
            }
        }
    }

    #[inline(always)]
    fn position(&self, neighbor: Neighbor) -> Vec3 {
        match neighbor {
            Neighbor::Fluid(j) => self.fluid.positions[j],
            Neighbor::Boundary(j) => self.boundary.positions[j],
        }
    }

    /// Net force on fluid particle `i`: pressure + viscosity + density-scaled gravity.
    pub fn force(&self, i: usize) -> Vec3 {
        let current = self.state(Neighbor::Fluid(i));
        let position = self.fluid.positions[i];
        let particle = self.fluid.particles[i];

        let h = particle.radius * self.kernel_radius_rate;
        let cell = quantize(position, self.grids.cell_size);

        let neighbors = self.grids.fluid.neighbors(cell)
            .filter(|&j| j != i)
            .map(Neighbor::Fluid)
            .chain(self.grids.boundary.neighbors(cell).map(Neighbor::Boundary));

        let (pressure, viscosity) = neighbors.fold((Vec3::ZERO, Vec3::ZERO), |(fp, fv), neighbor| {
            let (dp, dv) = pair_force(
                &current,
                &self.state(neighbor),
                position - self.position(neighbor),
                h,
                particle.viscosity,
            );
            (fp + dp, fv + dv)
        });

        pressure + viscosity + self.gravity * current.density
    }

    /// Forces on every fluid particle, in snapshot order.
    pub fn compute_forces(&self, batch_size: usize) -> Vec<Vec3> {
        (0..self.fluid.len())
            .into_par_iter()
            .with_min_len(batch_size)
            .map(|i| self.force(i))
            .collect()
    }
}

#[inline(always)]
fn pressure_term(pressure: f32, density: f32) -> f32 {
    if density != 0.0 {
        pressure / (density * density)
    } else {
        0.0
    }
}

/// Pressure and viscosity force exerted on `current` by `neighbor`, with `offset = pᵢ - pⱼ`.
///
/// Returns zero for pairs at or beyond the kernel radius `h`.
pub fn pair_force(
    current: &ParticleState,
    neighbor: &ParticleState,
    offset: Vec3,
    h: f32,
    viscosity: f32,
) -> (Vec3, Vec3) {
    let d = offset.length();
    if !(d < h) || current.density == 0.0 {
        return (Vec3::ZERO, Vec3::ZERO);
    }

    let pressure = -current.density
        * neighbor.mass
        * (pressure_term(current.pressure, current.density) + pressure_term(neighbor.pressure, neighbor.density))
        * kernel::spiky_gradient(h, d)
        * offset.normalize_or_zero();

    let viscosity = viscosity / current.density
        * neighbor.mass
        * (neighbor.velocity - current.velocity)
        * kernel::viscosity_laplacian(h, d);

    (pressure, viscosity)
}
