use glam::Vec3;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SphError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),
    #[error("invalid particle: {0}")]
    InvalidParticle(#[from] ParticleError),
}

/// Reasons a volume cannot be filled with a particle lattice.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("particle radius must be positive and finite, got {0}")]
    Radius(f32),
    #[error("transform scale {0} has a degenerate axis")]
    Scale(Vec3),
    #[error("bounds size {0} must be finite and non-negative")]
    Bounds(Vec3),
    #[error("lattice of {0} particles exceeds the spawn limit")]
    TooManyParticles(u64),
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ParticleError {
    #[error("particle radius must be positive, got {0}")]
    Radius(f32),
    #[error("particle mass must be positive, got {0}")]
    Mass(f32),
}
