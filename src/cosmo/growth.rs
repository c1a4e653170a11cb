//! Linear growth factor for a flat cosmology (Carroll, Press & Turner fit).
//!
//! ```text
//! Ω(z) = Ωm(1+z)³ / (1 - Ωm + Ωm(1+z)³)
//! g(z) = 2.5Ω / (1/70 + 209Ω/140 + Ω^(4/7))
//! D(z) = g(z) / (g(0)(1+z))
//! ```

use crate::error::CvError;

/// Growth factor `D(z)`, normalized so `D(0) = 1`.
pub fn growth_factor(omega_m: f64, z: f64) -> Result<f64, CvError> {
    if !(omega_m.is_finite() && omega_m > 0.0) {
        return Err(CvError::domain(format!("growth factor needs omega_m > 0 (got {omega_m})")));
    }
    if !(z.is_finite() && z > -1.0) {
        return Err(CvError::invalid(format!("growth factor needs finite z > -1 (got {z})")));
    }

    // g(0) goes through the same Ω(z) path so that D(0) is exactly 1.
    let g0 = suppression(omega_at(omega_m, 0.0)?)?;
    let gz = suppression(omega_at(omega_m, z)?)?;
    Ok(gz / (g0 * (1.0 + z)))
}

/// [`growth_factor`] for each redshift.
pub fn growth_factors(omega_m: f64, z: &[f64]) -> Result<Vec<f64>, CvError> {
    z.iter().map(|&zi| growth_factor(omega_m, zi)).collect()
}

fn omega_at(omega_m: f64, z: f64) -> Result<f64, CvError> {
    let x3 = (1.0 + z).powi(3);
    let denom = 1.0 - omega_m + x3 * omega_m;
    if !(denom.is_finite() && denom > 0.0) {
        return Err(CvError::domain(format!("Omega(z) denominator {denom} at z = {z}")));
    }
    Ok(omega_m * x3 / denom)
}

fn suppression(omega: f64) -> Result<f64, CvError> {
    let denom = 1.0 / 70.0 + 209.0 * omega / 140.0 + omega.powf(4.0 / 7.0);
    let g = 2.5 * omega / denom;
    if !(g.is_finite() && g > 0.0) {
        return Err(CvError::domain(format!("growth suppression g = {g} for Omega = {omega}")));
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_today() {
        for om in [0.05, 0.2, 0.308, 0.5, 0.99] {
            assert_eq!(growth_factor(om, 0.0).unwrap(), 1.0, "omega_m = {om}");
        }
    }

    #[test]
    fn matter_dominated_scales_as_inverse_expansion() {
        for z in [0.5, 2.0, 7.0] {
            let d = growth_factor(1.0, z).unwrap();
            assert!((d - 1.0 / (1.0 + z)).abs() < 1e-14);
        }
    }

    #[test]
    fn decreases_with_redshift() {
        let d = growth_factors(0.308, &[0.0, 1.0, 3.5, 6.0]).unwrap();
        assert!(d.windows(2).all(|w| w[1] < w[0]));
        // Λ suppresses late growth, so D(z) sits above the EdS 1/(1+z).
        assert!(d[2] > 1.0 / 4.5);
    }

    #[test]
    fn zero_omega_m_is_domain_error() {
        assert!(matches!(growth_factor(0.0, 1.0), Err(CvError::NumericDomain(_))));
        assert!(matches!(growth_factor(0.3, -1.0), Err(CvError::InvalidInput(_))));
    }
}
