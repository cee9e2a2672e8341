use glam::Vec3;

use crate::{body::BodyId, error::ParticleError};

/// Static properties of a fluid particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidParticle {
    /// Smoothing (and packing) radius.
    pub radius: f32,
    /// Density at which the particle feels no pressure.
    pub rest_density: f32,
    /// Viscosity coefficient.
    pub viscosity: f32,
    /// Stiffness of the equation of state.
    pub gas_constant: f32,
}

impl Default for FluidParticle {
    fn default() -> Self {
        Self {
            radius: 0.05,
            rest_density: 1000.0,
            viscosity: 0.5,
            gas_constant: 2000.0,
        }
    }
}

/// A static (or externally driven) particle representing solid geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryParticle {
    pub radius: f32,
    pub mass: f32,
    pub rest_density: f32,
}

/// What a spawn volume fills itself with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleKind {
    Fluid { particle: FluidParticle, mass: f32 },
    Boundary(BoundaryParticle),
}

impl ParticleKind {
    #[inline(always)]
    pub fn radius(&self) -> f32 {
        match self {
            ParticleKind::Fluid { particle, .. } => particle.radius,
            ParticleKind::Boundary(particle) => particle.radius,
        }
    }

    #[inline(always)]
    pub fn mass(&self) -> f32 {
        match self {
            ParticleKind::Fluid { mass, .. } => *mass,
            ParticleKind::Boundary(particle) => particle.mass,
        }
    }

    #[inline(always)]
    pub fn is_fluid(&self) -> bool {
        matches!(self, ParticleKind::Fluid { .. })
    }

    /// Checks the invariants every spawned particle must hold: `radius > 0` and `mass > 0`.
    pub fn validate(&self) -> Result<(), ParticleError> {
        let radius = self.radius();
        if !(radius > 0.0) {
            return Err(ParticleError::Radius(radius));
        }

        let mass = self.mass();
        if !(mass > 0.0) {
            return Err(ParticleError::Mass(mass));
        }

        Ok(())
    }
}

/// Per-step copy of every live fluid particle. All arrays share one ordering.
#[derive(Debug, Clone, Default)]
pub struct FluidSnapshot {
    pub bodies: Vec<BodyId>,
    pub positions: Vec<Vec3>,
    pub particles: Vec<FluidParticle>,
    pub masses: Vec<f32>,
    pub velocities: Vec<Vec3>,
}

impl FluidSnapshot {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(n),
            positions: Vec::with_capacity(n),
            particles: Vec::with_capacity(n),
            masses: Vec::with_capacity(n),
            velocities: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, body: BodyId, position: Vec3, particle: FluidParticle, mass: f32, velocity: Vec3) {
        self.bodies.push(body);
        self.positions.push(position);
        self.particles.push(particle);
        self.masses.push(mass);
        self.velocities.push(velocity);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Per-step copy of every boundary particle.
#[derive(Debug, Clone, Default)]
pub struct BoundarySnapshot {
    pub positions: Vec<Vec3>,
    pub particles: Vec<BoundaryParticle>,
}

impl BoundarySnapshot {
    pub fn push(&mut self, position: Vec3, particle: BoundaryParticle) {
        self.positions.push(position);
        self.particles.push(particle);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_templates() {
        let fluid = ParticleKind::Fluid { particle: FluidParticle::default(), mass: 1.0 };
        assert_eq!(fluid.validate(), Ok(()));

        let zero_radius = ParticleKind::Fluid {
            particle: FluidParticle { radius: 0.0, ..Default::default() },
            mass: 1.0,
        };
        assert_eq!(zero_radius.validate(), Err(ParticleError::Radius(0.0)));

        let no_mass = ParticleKind::Boundary(BoundaryParticle { radius: 0.1, mass: -1.0, rest_density: 1000.0 });
        assert_eq!(no_mass.validate(), Err(ParticleError::Mass(-1.0)));

        let nan = ParticleKind::Fluid {
            particle: FluidParticle { radius: f32::NAN, ..Default::default() },
            mass: 1.0,
        };
        assert!(nan.validate().is_err());
    }
}
