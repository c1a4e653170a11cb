//! Box window function in Fourier space.
//!
//! The Fourier transform of a rectangular box is separable:
//!
//! - `W(k) = sinc(k0·x0) · sinc(k1·x1) · sinc(k2·x2)`
//! - `sinc(u) = sin(u) / u`, with `sinc(0) = 1`
//!
//! The variance integral evaluates each factor once per axis (hoisted out of
//! the inner quadratures), so only the one-dimensional pieces live here.
//!
//! Numerical notes:
//! - For small `u`, `sin(u)/u` loses precision; we switch to the series
//!   `1 - u²/6 + u⁴/120`.

/// Threshold below which we switch to the series approximation.
const SMALL_U: f64 = 1e-4;

/// Unnormalized sinc, `sin(u)/u`.
pub fn sinc(u: f64) -> f64 {
    if u.abs() < SMALL_U {
        let u2 = u * u;
        return 1.0 - u2 / 6.0 + u2 * u2 / 120.0;
    }
    u.sin() / u
}

/// One axis of the squared box window, `sinc²(k·x)`.
pub fn sinc_sq(k: f64, side: f64) -> f64 {
    let s = sinc(k * side);
    s * s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinc_limit_at_zero() {
        assert_eq!(sinc(0.0), 1.0);
        assert!((sinc(1e-9) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn sinc_series_matches_direct_near_threshold() {
        let u = 2.0 * SMALL_U;
        let series = 1.0 - u * u / 6.0 + u.powi(4) / 120.0;
        assert!((sinc(u) - series).abs() < 1e-14);
        assert!(sinc(std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn squared_axis_window_is_bounded() {
        assert_eq!(sinc_sq(0.0, 25.0), 1.0);
        for i in 1..200 {
            let w = sinc_sq(i as f64 * 0.01, 30.0);
            assert!((0.0..=1.0).contains(&w));
        }
        assert!((sinc_sq(0.1, 20.0) - sinc(2.0).powi(2)).abs() < 1e-15);
    }
}
