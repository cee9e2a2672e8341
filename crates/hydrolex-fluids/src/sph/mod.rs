//! Weakly compressible SPH step.
//!
//! A step runs four data-parallel stages, each fully joined before the next begins:
//! grid building, density/pressure, forces, and impulse integration. Every buffer lives for a
//! single step only.

use glam::Vec3;
use log::{debug, warn};

use crate::{
    body::{BodyId, RigidBodies},
    grid::{Bounds, Grids},
    particle::{BoundarySnapshot, FluidSnapshot},
};

pub mod density;
pub mod force;
pub mod integrate;
pub mod kernel;

use force::ForceContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphParams {
    /// Kernel radius as a multiple of particle radius. Also sets the grid cell size.
    pub kernel_radius_rate: f32,
    pub gravity: Vec3,
    /// Minimum number of particles handled by one parallel task.
    pub batch_size: usize,
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            kernel_radius_rate: 4.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            batch_size: 32,
        }
    }
}

/// Conditions worth surfacing while tuning a scene. None of them stop a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Diagnostic {
    /// A particle ended the density stage with zero density and received no impulse.
    DegenerateDensity { index: usize, body: BodyId },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub n_fluid: usize,
    pub n_boundary: usize,
    pub cell_size: f32,
    pub bounds: Bounds,
    pub diagnostics: Vec<Diagnostic>,
}

/// Intermediate results of the density and force stages.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub grids: Grids,
    pub densities: Vec<f32>,
    pub pressures: Vec<f32>,
    pub forces: Vec<Vec3>,
}

/// Builds the grids and evaluates density, pressure and force for every fluid particle.
pub fn evaluate(fluid: &FluidSnapshot, boundary: &BoundarySnapshot, params: &SphParams) -> Evaluation {
    let grids = Grids::build(fluid, boundary, params.kernel_radius_rate, params.batch_size);

    let (densities, pressures) = density::compute_densities(
        fluid,
        boundary,
        &grids,
        params.kernel_radius_rate,
        params.batch_size,
    );

    let forces = ForceContext {
        fluid,
        boundary,
        grids: &grids,
        densities: &densities,
        pressures: &pressures,
        kernel_radius_rate: params.kernel_radius_rate,
        gravity: params.gravity,
    }.compute_forces(params.batch_size);

    Evaluation {
        grids,
        densities,
        pressures,
        forces,
    }
}

/// Runs one full step and applies the resulting impulses through `bodies`.
pub fn step<B: RigidBodies>(
    fluid: &FluidSnapshot,
    boundary: &BoundarySnapshot,
    bodies: &mut B,
    dt: f32,
    params: &SphParams,
) -> StepReport {
    if fluid.is_empty() {
        return StepReport {
            n_boundary: boundary.len(),
            ..Default::default()
        };
    }

    let eval = evaluate(fluid, boundary, params);
    let impulses = integrate::compute_impulses(&eval.forces, &eval.densities, &fluid.masses, dt, params.batch_size);

    let mut diagnostics = Vec::new();

    for (index, impulse) in impulses.into_iter().enumerate() {
        let body = fluid.bodies[index];
        match impulse {
            Some(impulse) => bodies.apply_impulse(body, impulse),
            None => {
                warn!("fluid particle {index} ({body:?}) has zero density, skipping its impulse");
                diagnostics.push(Diagnostic::DegenerateDensity { index, body });
            }
        }
    }

    debug!(
        "sph step: {} fluid, {} boundary, cell size {}, bounds {:?}",
        fluid.len(),
        boundary.len(),
        eval.grids.cell_size,
        eval.grids.bounds,
    );

    StepReport {
        n_fluid: fluid.len(),
        n_boundary: boundary.len(),
        cell_size: eval.grids.cell_size,
        bounds: eval.grids.bounds,
        diagnostics,
    }
}
