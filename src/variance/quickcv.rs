//! Cosmic variance for one redshift slice of a rectangular field.
//!
//! Pipeline per slice:
//!
//! 1. `r(za)`, `r(za - Δz/2)`, `r(za + Δz/2)` from the distance engine
//! 2. box sides `x0 = 1500·r(za)·side1/57.2958`, `x1` likewise with `side2`,
//!    `x2 = 3000·(r_max - r_min)/2`
//! 3. windowed power integral over the box
//! 4. `σ = sqrt(integral · σ8²) · D(za)`
//!
//! The result is a fractional error σ/N for unbiased (b = 1) tracers; it is
//! **not** a variance.

use std::time::Duration;

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::cosmo::{HUBBLE_DISTANCE, comoving_distance, growth_factor};
use crate::domain::{AccuracyMode, BoxSides, Cosmology, DEG_PER_RAD, SurveyGeometry};
use crate::error::CvError;
use crate::math::Deadline;
use crate::variance::integrator::integrate_variance;

/// Per-call options for [`quickcv`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickCvOptions {
    pub accuracy: AccuracyMode,
    /// Abort the variance integral once this passes.
    pub deadline: Option<Deadline>,
    /// Report integration timing at `info` instead of `debug`.
    pub verbose: bool,
}

/// Detailed output of one slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosmicVariance {
    /// Dark-matter fractional error σ.
    pub sigma: f64,
    pub sides: BoxSides,
    /// Raw integral before `σ8²` and growth.
    pub integral: f64,
    pub growth: f64,
    pub elapsed: Duration,
}

/// Comoving box sides (Mpc) for a field at `za` spanning `deltaz`.
pub fn box_sides(
    geometry: &SurveyGeometry,
    za: f64,
    deltaz: f64,
    cosmo: &Cosmology,
) -> Result<BoxSides, CvError> {
    if !(za.is_finite() && za >= 0.0) {
        return Err(CvError::invalid(format!("bin center must be finite and >= 0 (got {za})")));
    }
    if !(deltaz.is_finite() && deltaz >= 0.0) {
        return Err(CvError::invalid(format!("bin width must be finite and >= 0 (got {deltaz})")));
    }
    let z_min = za - deltaz / 2.0;
    if z_min < 0.0 {
        return Err(CvError::invalid(format!(
            "bin [{z_min}, {}] extends below z = 0",
            za + deltaz / 2.0
        )));
    }

    let r_a = comoving_distance(cosmo, za)?;
    let r_min = comoving_distance(cosmo, z_min)?;
    let r_max = comoving_distance(cosmo, za + deltaz / 2.0)?;

    let transverse = HUBBLE_DISTANCE / 2.0 * r_a / DEG_PER_RAD;
    Ok(Vector3::new(
        transverse * geometry.side1_deg,
        transverse * geometry.side2_deg,
        HUBBLE_DISTANCE * (r_max - r_min) / 2.0,
    ))
}

/// Dark-matter σ with the intermediate quantities.
pub fn quickcv_detailed(
    geometry: &SurveyGeometry,
    za: f64,
    deltaz: f64,
    cosmo: &Cosmology,
    opts: &QuickCvOptions,
) -> Result<CosmicVariance, CvError> {
    cosmo.validate()?;
    let sides = box_sides(geometry, za, deltaz, cosmo)?;
    let integral = integrate_variance(&sides, cosmo, opts.accuracy, opts.deadline)?;
    let growth = growth_factor(cosmo.omega_m, za)?;
    let sigma = (integral.value * cosmo.sigma8 * cosmo.sigma8).sqrt() * growth;

    if !sigma.is_finite() {
        return Err(CvError::IntegrationNonConvergence {
            result: sigma,
            abserr: f64::NAN,
        });
    }

    let secs = integral.elapsed.as_secs_f64();
    if opts.verbose {
        info!(za, deltaz, sigma, elapsed_secs = secs, "integration time {secs:.2}s");
    } else {
        debug!(za, deltaz, sigma, elapsed_secs = secs, "slice done");
    }

    Ok(CosmicVariance {
        sigma,
        sides,
        integral: integral.value,
        growth,
        elapsed: integral.elapsed,
    })
}

/// Fractional dark-matter error σ for the slice centered at `za` with width `deltaz`.
pub fn quickcv(
    geometry: &SurveyGeometry,
    za: f64,
    deltaz: f64,
    cosmo: &Cosmology,
    opts: &QuickCvOptions,
) -> Result<f64, CvError> {
    Ok(quickcv_detailed(geometry, za, deltaz, cosmo, opts)?.sigma)
}

/// [`quickcv`] over paired arrays of centers and widths.
pub fn quickcv_many(
    geometry: &SurveyGeometry,
    za: &[f64],
    deltaz: &[f64],
    cosmo: &Cosmology,
    opts: &QuickCvOptions,
) -> Result<Vec<f64>, CvError> {
    if za.len() != deltaz.len() {
        return Err(CvError::invalid(format!(
            "za and deltaz must have the same length ({} vs {})",
            za.len(),
            deltaz.len()
        )));
    }
    za.iter()
        .zip(deltaz)
        .map(|(&z, &dz)| quickcv(geometry, z, dz, cosmo, opts))
        .collect()
}
