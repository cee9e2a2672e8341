use rayon::prelude::*;

use crate::{
    grid::Grids,
    hash::quantize,
    particle::{BoundarySnapshot, FluidSnapshot},
};

use super::kernel;

/// Ideal gas equation of state `p = k (ρ - ρ₀)`, clamped so pressure never attracts.
#[inline(always)]
pub fn equation_of_state(gas_constant: f32, density: f32, rest_density: f32) -> f32 {
    (gas_constant * (density - rest_density)).max(0.0)
}

/// Density and pressure of fluid particle `i`.
///
/// Neighbors are weighted with `i`'s own smoothing length and mass, and `i` counts itself.
pub fn density_and_pressure(
    i: usize,
    fluid: &FluidSnapshot,
    boundary: &BoundarySnapshot,
    grids: &Grids,
    kernel_radius_rate: f32,
) -> (f32, f32) {
    let particle = fluid.particles[i];
    let position = fluid.positions[i];

    let h = particle.radius * kernel_radius_rate;
    let h2 = h * h;
    let poly6 = kernel::poly6_constant(fluid.masses[i], h);

    let cell = quantize(position, grids.cell_size);
    let mut density = 0.0;

    for j in grids.fluid.neighbors(cell) {
        density += kernel::poly6(poly6, h2, position.distance_squared(fluid.positions[j]));
    }

    for j in grids.boundary.neighbors(cell) {
        density += kernel::poly6(poly6, h2, position.distance_squared(boundary.positions[j]));
    }

    let pressure = equation_of_state(particle.gas_constant, density, particle.rest_density);
    (density, pressure)
}

/// Densities and pressures of every fluid particle, in snapshot order.
pub fn compute_densities(
    fluid: &FluidSnapshot,
    boundary: &BoundarySnapshot,
    grids: &Grids,
    kernel_radius_rate: f32,
    batch_size: usize,
) -> (Vec<f32>, Vec<f32>) {
    (0..fluid.len())
        .into_par_iter()
        .with_min_len(batch_size)
        .map(|i| density_and_pressure(i, fluid, boundary, grids, kernel_radius_rate))
        .unzip()
}
