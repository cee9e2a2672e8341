//! Smoothing kernels (Müller et al. 2003). All have closed support: zero at and beyond `h`.

use std::f32::consts::PI;

/// Poly6 normalization folded together with the evaluating particle's mass.
///
/// `W_poly6 = 315 / (64 π h⁹) (h² - r²)³`
#[inline(always)]
pub fn poly6_constant(mass: f32, h: f32) -> f32 {
    mass * 315.0 / (64.0 * PI * h.powi(9))
}

/// Poly6 weight of a neighbor at squared distance `d2`, for squared support `h2`.
#[inline(always)]
pub fn poly6(constant: f32, h2: f32, d2: f32) -> f32 {
    if d2 < h2 {
        constant * (h2 - d2).powi(3)
    } else {
        0.0
    }
}

/// Magnitude of the spiky kernel gradient along `r̂`: `-45 / (π h⁶) (h - r)²`.
#[inline(always)]
pub fn spiky_gradient(h: f32, d: f32) -> f32 {
    if d < h {
        -45.0 / (PI * h.powi(6)) * (h - d).powi(2)
    } else {
        0.0
    }
}

/// Laplacian of the viscosity kernel: `45 / (π h⁶) (h - r)`.
#[inline(always)]
pub fn viscosity_laplacian(h: f32, d: f32) -> f32 {
    if d < h {
        45.0 / (PI * h.powi(6)) * (h - d)
    } else {
        0.0
    }
}
