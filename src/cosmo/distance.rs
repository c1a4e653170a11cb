//! Comoving coordinate distance in an FRW metric.
//!
//! We integrate `dχ/dz = 1/E(z)` with
//!
//! ```text
//! E(z)² = Ωm(1+z)³ + ΩK(1+z)² + ΩΛ + ΩQ(1+z)^(3+3wQ),   ΩK = 1 - Ωm - ΩΛ - ΩQ
//! ```
//!
//! accumulating bin by bin over the input redshifts, then map the line-of-sight
//! distance `χ` to the coordinate distance `r` according to the sign of the
//! curvature. Distances are in Hubble-distance units; multiply by
//! [`HUBBLE_DISTANCE`] for Mpc/h.

use crate::domain::Cosmology;
use crate::error::CvError;
use crate::math::{QuadConfig, integrate};

/// Hubble distance `c/H0` in Mpc/h.
pub const HUBBLE_DISTANCE: f64 = 3000.0;

/// Relative tolerance of the distance integral.
pub const DISTANCE_EPSREL: f64 = 1e-10;

/// `|K|` below this is treated as flat.
pub const FLAT_TOLERANCE: f64 = 1e-4;

/// Dimensionless Hubble parameter `E(z) = H(z)/H0`.
pub fn hubble_e(cosmo: &Cosmology, z: f64) -> Result<f64, CvError> {
    let x = 1.0 + z;
    let omega_k = 1.0 - cosmo.omega_m - cosmo.omega_lambda - cosmo.omega_q;
    let e2 = cosmo.omega_m * x.powi(3)
        + omega_k * x * x
        + cosmo.omega_lambda
        + cosmo.omega_q * x.powf(3.0 + 3.0 * cosmo.w_q);
    if !(e2.is_finite() && e2 > 0.0) {
        return Err(CvError::domain(format!("E(z)^2 = {e2} at z = {z} is not positive")));
    }
    Ok(e2.sqrt())
}

/// Coordinate distances `r(z_i)` for a non-decreasing list of redshifts.
pub fn comoving_distances(cosmo: &Cosmology, z: &[f64]) -> Result<Vec<f64>, CvError> {
    validate_redshifts(z)?;

    let config = QuadConfig::default().with_epsrel(DISTANCE_EPSREL);
    let inv_e = |zz: f64| hubble_e(cosmo, zz).map(|e| 1.0 / e);

    let mut chi = Vec::with_capacity(z.len());
    let mut acc = 0.0;
    let mut prev = 0.0;
    for &zi in z {
        if zi > prev {
            acc += integrate(inv_e, prev, zi, &config)?.value;
        }
        chi.push(acc);
        prev = zi;
    }

    Ok(chi.into_iter().map(|c| curvature_map(c, cosmo.curvature())).collect())
}

/// Coordinate distance to a single redshift.
pub fn comoving_distance(cosmo: &Cosmology, z: f64) -> Result<f64, CvError> {
    Ok(comoving_distances(cosmo, &[z])?[0])
}

/// Map line-of-sight distance `chi` to coordinate distance for curvature `kurv`.
pub fn curvature_map(chi: f64, kurv: f64) -> f64 {
    if kurv.abs() < FLAT_TOLERANCE {
        chi
    } else if kurv > 0.0 {
        let s = kurv.sqrt();
        (chi * s).sin() / s
    } else {
        let s = (-kurv).sqrt();
        (chi * s).sinh() / s
    }
}

fn validate_redshifts(z: &[f64]) -> Result<(), CvError> {
    if let Some(bad) = z.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
        return Err(CvError::invalid(format!("redshifts must be finite and >= 0 (got {bad})")));
    }
    if let Some(w) = z.windows(2).find(|w| w[1] < w[0]) {
        return Err(CvError::invalid(format!(
            "redshifts must be non-decreasing ({} then {})",
            w[0], w[1]
        )));
    }
    Ok(())
}
