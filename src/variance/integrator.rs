//! Windowed power-spectrum integral over a box.
//!
//! ```text
//! σ²_box = (1/π³) ∫₀^{kmax0} ∫₀^{kmax1} ∫₀^{kmax2} W²(k) P(|k|) dk2 dk1 dk0
//! W(k)   = sinc(k0·x0) · sinc(k1·x1) · sinc(k2·x2)
//! ```
//!
//! Only the positive octant is integrated and the matching factor of 8 is not
//! applied; callers scale by `σ8²` and the growth factor afterwards.
//!
//! The per-axis cutoff `kmax_i = (0.4 + 16/x_i)·1.25 / divisor` is empirical.
//! It reproduces the reference tables; it is not derived from the window's
//! support, so do not replace it with e.g. `4π/x_i`.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use nalgebra::Vector3;
use tracing::debug;

use crate::cosmo::PowerSpectrum;
use crate::domain::{AccuracyMode, BoxSides, Cosmology};
use crate::error::CvError;
use crate::math::{Deadline, QuadConfig, integrate, sinc_sq};

/// Degenerate (zero-length) sides are raised to this, in Mpc.
///
/// A zero-width redshift bin collapses the radial side; the floor keeps the
/// cutoff finite and the variance large but finite.
pub const MIN_BOX_SIDE_MPC: f64 = 0.1;

/// Sub-interval limit per axis. The integrand has a kink at `|k| = 0` and the
/// sinc factors oscillate, so this is well above the one-dimensional default.
pub const VARIANCE_QUAD_LIMIT: usize = 200;

/// Result of one variance integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceIntegral {
    /// `∫∫∫ W²P d³k / π³` (fractional variance before `σ8²` and growth).
    pub value: f64,
    /// Per-axis upper integration bounds.
    pub kmax: Vector3<f64>,
    pub elapsed: Duration,
}

/// Per-axis truncation wavenumber.
pub fn kmax(side: f64, accuracy: AccuracyMode) -> f64 {
    (0.4 + 16.0 / side) * 1.25 / accuracy.divisor()
}

/// Integrate the squared box window against the power spectrum.
pub fn integrate_variance(
    sides: &BoxSides,
    cosmo: &Cosmology,
    accuracy: AccuracyMode,
    deadline: Option<Deadline>,
) -> Result<VarianceIntegral, CvError> {
    let x = effective_sides(sides)?;
    let k_max = x.map(|side| kmax(side, accuracy));
    let spectrum = PowerSpectrum::new(cosmo)?;
    let config = QuadConfig {
        limit: VARIANCE_QUAD_LIMIT,
        ..QuadConfig::default()
    }
    .with_deadline(deadline);

    let start = Instant::now();
    let outer = integrate(
        |k0| {
            let w0 = sinc_sq(k0, x.x);
            let middle = integrate(
                |k1| {
                    let w1 = sinc_sq(k1, x.y);
                    let inner = integrate(
                        |k2| {
                            let k = Vector3::new(k0, k1, k2);
                            Ok(sinc_sq(k2, x.z) * spectrum.power_at(&k))
                        },
                        0.0,
                        k_max.z,
                        &config,
                    )?;
                    Ok(w1 * inner.value)
                },
                0.0,
                k_max.y,
                &config,
            )?;
            Ok(w0 * middle.value)
        },
        0.0,
        k_max.x,
        &config,
    )?;
    let elapsed = start.elapsed();

    let value = outer.value / PI.powi(3);
    if !(value.is_finite() && value >= 0.0) {
        return Err(CvError::IntegrationNonConvergence {
            result: value,
            abserr: outer.abserr / PI.powi(3),
        });
    }

    debug!(
        sides = ?[x.x, x.y, x.z],
        kmax = ?[k_max.x, k_max.y, k_max.z],
        %accuracy,
        value,
        elapsed_secs = elapsed.as_secs_f64(),
        "variance integral done"
    );

    Ok(VarianceIntegral {
        value,
        kmax: k_max,
        elapsed,
    })
}

fn effective_sides(sides: &BoxSides) -> Result<BoxSides, CvError> {
    if let Some(bad) = sides.iter().find(|s| !(s.is_finite() && **s >= 0.0)) {
        return Err(CvError::invalid(format!("box sides must be finite and >= 0 Mpc (got {bad})")));
    }
    Ok(sides.map(|s| s.max(MIN_BOX_SIDE_MPC)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SurveyGeometry;
    use crate::variance::box_sides;

    // Box for a 3.4' x 10.2' field at z = 3.5, Δz = 1 (default cosmology),
    // roughly 2.34 x 7.01 x 281.7 Mpc.
    fn reference_sides() -> BoxSides {
        let field = SurveyGeometry::new(3.4 / 60.0, 10.2 / 60.0).unwrap();
        box_sides(&field, 3.5, 1.0, &Cosmology::default()).unwrap()
    }

    #[test]
    fn reference_box_matches_field() {
        let s = reference_sides();
        assert!((s.x - 2.335).abs() < 0.01, "{s:?}");
        assert!((s.y - 7.006).abs() < 0.02, "{s:?}");
        assert!((s.z - 281.74).abs() < 0.5, "{s:?}");
    }

    #[test]
    fn kmax_formula() {
        assert!((kmax(16.0, AccuracyMode::High) - 1.75).abs() < 1e-15);
        assert!((kmax(16.0, AccuracyMode::Low) - 0.35).abs() < 1e-15);
    }

    #[test]
    fn result_is_positive_and_finite() {
        let r = integrate_variance(&reference_sides(), &Cosmology::default(), AccuracyMode::Low, None).unwrap();
        assert!(r.value.is_finite() && r.value > 0.0, "value = {}", r.value);
        assert!((r.kmax.z - kmax(reference_sides().z, AccuracyMode::Low)).abs() < 1e-15);
    }

    #[test]
    fn larger_box_has_smaller_variance() {
        let c = Cosmology::default();
        let small = integrate_variance(&Vector3::new(20.0, 20.0, 20.0), &c, AccuracyMode::Low, None).unwrap();
        let large = integrate_variance(&Vector3::new(80.0, 80.0, 80.0), &c, AccuracyMode::Low, None).unwrap();
        assert!(large.value < small.value);
    }

    #[test]
    fn low_accuracy_within_five_percent_of_high() {
        let c = Cosmology::default();
        let low = integrate_variance(&reference_sides(), &c, AccuracyMode::Low, None).unwrap();
        let high = integrate_variance(&reference_sides(), &c, AccuracyMode::High, None).unwrap();
        let rel = (low.value - high.value).abs() / high.value;
        assert!(rel < 0.05, "low={} high={} rel={rel}", low.value, high.value);
    }

    #[test]
    fn zero_side_is_floored_and_finite() {
        assert_eq!(MIN_BOX_SIDE_MPC, 0.1);
        assert_eq!(VARIANCE_QUAD_LIMIT, 200);
        let sides = Vector3::new(2.35, 7.05, 0.0);
        let r = integrate_variance(&sides, &Cosmology::default(), AccuracyMode::Low, None).unwrap();
        assert!(r.value.is_finite() && r.value > 0.0);
        assert!((r.kmax.z - kmax(MIN_BOX_SIDE_MPC, AccuracyMode::Low)).abs() < 1e-9);
    }

    #[test]
    fn negative_side_is_invalid() {
        let sides = Vector3::new(-1.0, 7.0, 100.0);
        let r = integrate_variance(&sides, &Cosmology::default(), AccuracyMode::Low, None);
        assert!(matches!(r, Err(CvError::InvalidInput(_))));
    }

    #[test]
    fn expired_deadline_times_out() {
        let deadline = Some(Deadline::after(Duration::ZERO));
        let r = integrate_variance(&reference_sides(), &Cosmology::default(), AccuracyMode::High, deadline);
        assert!(matches!(r, Err(CvError::IntegrationTimeout { .. })));
    }
}
