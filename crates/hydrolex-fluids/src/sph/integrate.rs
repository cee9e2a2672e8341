use glam::Vec3;
use rayon::prelude::*;

/// Velocity impulse for one particle: `(f / ρ) · m · dt`.
///
/// Returns `None` when the density is exactly zero.
#[inline(always)]
pub fn impulse(force: Vec3, density: f32, mass: f32, dt: f32) -> Option<Vec3> {
    if density == 0.0 {
        return None;
    }

    Some(force / density * mass * dt)
}

/// Impulses for every particle, in snapshot order.
pub fn compute_impulses(
    forces: &[Vec3],
    densities: &[f32],
    masses: &[f32],
    dt: f32,
    batch_size: usize,
) -> Vec<Option<Vec3>> {
    forces
        .par_iter()
        .zip(densities.par_iter())
        .zip(masses.par_iter())
        .with_min_len(batch_size)
        .map(|((&f, &density), &mass)| impulse(f, density, mass, dt))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_density_is_skipped() {
        assert_eq!(impulse(Vec3::ONE, 0.0, 1.0, 0.1), None);
    }

    #[test]
    fn impulse_yields_density_independent_acceleration() {
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        let mass = 0.5;
        let dt = 0.02;

        for density in [1.0, 10.0, 1000.0] {
            let j = impulse(gravity * density, density, mass, dt).unwrap();
            let dv = j / mass;
            assert!((dv - gravity * dt).length() < 1e-5);
        }
    }
}
