//! Adaptive Gauss–Kronrod quadrature.
//!
//! Global adaptive bisection driven by a 21-point Kronrod rule with an embedded
//! 10-point Gauss rule (the QUADPACK `QAG` scheme):
//!
//! ```text
//! repeat: bisect the sub-interval with the largest error estimate
//! until:  Σ err_i <= max(epsabs, epsrel * |Σ I_i|)
//! ```
//!
//! Numerical notes:
//! - Nodes are interior points only, so integrands with removable singularities
//!   at an endpoint (e.g. `sin(x)/x` at 0) are never evaluated there.
//! - The error estimate uses the QUADPACK scaling and is floored at
//!   `50 * eps * ∫|f|`, so a tolerance below roundoff is reported as
//!   non-convergence instead of looping.
//! - The integrand is fallible so nested integrals and domain errors propagate
//!   with `?`. Non-finite integrand values are rejected immediately.

use std::time::{Duration, Instant};

use crate::error::CvError;

/// Default absolute tolerance.
pub const DEFAULT_EPSABS: f64 = 1.49e-8;
/// Default relative tolerance.
pub const DEFAULT_EPSREL: f64 = 1.49e-8;
/// Default maximum number of sub-intervals.
pub const DEFAULT_LIMIT: usize = 50;

// Kronrod abscissae; odd indices are the Gauss nodes.
const XGK: [f64; 11] = [
    0.995_657_163_025_808_080_735_527_280_689_003,
    0.973_906_528_517_171_720_077_964_012_084_452,
    0.930_157_491_355_708_226_001_207_180_059_508,
    0.865_063_366_688_984_510_732_096_688_423_493,
    0.780_817_726_586_416_897_063_717_578_345_042,
    0.679_409_568_299_024_406_234_327_365_114_874,
    0.562_757_134_668_604_683_339_000_099_272_694,
    0.433_395_394_129_247_190_799_265_943_165_784,
    0.294_392_862_701_460_198_131_126_603_103_866,
    0.148_874_338_981_631_210_884_826_001_129_720,
    0.0,
];

const WGK: [f64; 11] = [
    0.011_694_638_867_371_874_278_064_396_062_192,
    0.032_558_162_307_964_727_478_818_972_459_390,
    0.054_755_896_574_351_996_031_381_300_244_580,
    0.075_039_674_810_919_952_767_043_140_916_190,
    0.093_125_454_583_697_605_535_065_465_083_366,
    0.109_387_158_802_297_641_899_210_590_325_805,
    0.123_491_976_262_065_851_077_208_404_987_784,
    0.134_709_217_311_473_325_928_054_001_771_707,
    0.142_775_938_577_060_080_797_094_273_138_717,
    0.147_739_104_901_338_491_374_841_515_972_068,
    0.149_445_554_002_916_905_664_936_468_389_821,
];

const WG: [f64; 5] = [
    0.066_671_344_308_688_137_593_568_809_893_332,
    0.149_451_349_150_580_593_145_776_339_657_697,
    0.219_086_362_515_982_043_995_534_934_228_163,
    0.269_266_719_309_996_355_091_226_921_569_469,
    0.295_524_224_714_752_870_173_892_994_651_338,
];

/// Wall-clock budget shared by every quadrature of one computation.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn check(&self) -> Result<(), CvError> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.budget {
            return Err(CvError::IntegrationTimeout {
                elapsed_secs: elapsed.as_secs_f64(),
            });
        }
        Ok(())
    }
}

/// Tolerances and limits for [`integrate`].
#[derive(Debug, Clone, Copy)]
pub struct QuadConfig {
    pub epsabs: f64,
    pub epsrel: f64,
    /// Maximum number of sub-intervals.
    pub limit: usize,
    pub deadline: Option<Deadline>,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            epsabs: DEFAULT_EPSABS,
            epsrel: DEFAULT_EPSREL,
            limit: DEFAULT_LIMIT,
            deadline: None,
        }
    }
}

impl QuadConfig {
    pub fn with_epsrel(mut self, epsrel: f64) -> Self {
        self.epsrel = epsrel;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    fn tolerance(&self, result: f64) -> f64 {
        self.epsabs.max(self.epsrel * result.abs())
    }
}

/// Integral estimate and its absolute error bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadResult {
    pub value: f64,
    pub abserr: f64,
    /// Number of sub-intervals used.
    pub intervals: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Integrate `f` over `[a, b]`.
///
/// `b < a` integrates over `[b, a]` and negates; `a == b` is zero.
pub fn integrate<F>(mut f: F, a: f64, b: f64, config: &QuadConfig) -> Result<QuadResult, CvError>
where
    F: FnMut(f64) -> Result<f64, CvError>,
{
    if !(a.is_finite() && b.is_finite()) {
        return Err(CvError::invalid(format!("integration bounds must be finite (got [{a}, {b}])")));
    }
    if a == b {
        return Ok(QuadResult {
            value: 0.0,
            abserr: 0.0,
            intervals: 0,
        });
    }
    if b < a {
        let r = integrate(f, b, a, config)?;
        return Ok(QuadResult { value: -r.value, ..r });
    }
    if let Some(deadline) = &config.deadline {
        deadline.check()?;
    }

    let limit = config.limit.max(1);
    let mut segments = Vec::with_capacity(limit);
    segments.push(gauss_kronrod_21(&mut f, a, b)?);

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let abserr: f64 = segments.iter().map(|s| s.error).sum();
        if !value.is_finite() || !abserr.is_finite() {
            return Err(CvError::IntegrationNonConvergence { result: value, abserr });
        }
        if abserr <= config.tolerance(value) {
            return Ok(QuadResult {
                value,
                abserr,
                intervals: segments.len(),
            });
        }
        if segments.len() >= limit {
            return Err(CvError::IntegrationNonConvergence { result: value, abserr });
        }
        if let Some(deadline) = &config.deadline {
            deadline.check()?;
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if !(seg.a < mid && mid < seg.b) {
            // Interval exhausted in floating point.
            return Err(CvError::IntegrationNonConvergence { result: value, abserr });
        }
        segments.push(gauss_kronrod_21(&mut f, seg.a, mid)?);
        segments.push(gauss_kronrod_21(&mut f, mid, seg.b)?);
    }
}

fn gauss_kronrod_21<F>(f: &mut F, a: f64, b: f64) -> Result<Segment, CvError>
where
    F: FnMut(f64) -> Result<f64, CvError>,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let abs_half = half.abs();

    let mut eval = |x: f64| -> Result<f64, CvError> {
        let v = f(x)?;
        if !v.is_finite() {
            return Err(CvError::IntegrationNonConvergence {
                result: v,
                abserr: f64::INFINITY,
            });
        }
        Ok(v)
    };

    let fc = eval(center)?;
    let mut res_g = 0.0;
    let mut res_k = WGK[10] * fc;
    let mut res_abs = res_k.abs();
    let mut fv1 = [0.0; 10];
    let mut fv2 = [0.0; 10];

    for j in 0..10 {
        let dx = half * XGK[j];
        let f1 = eval(center - dx)?;
        let f2 = eval(center + dx)?;
        fv1[j] = f1;
        fv2[j] = f2;
        let sum = f1 + f2;
        if j % 2 == 1 {
            res_g += WG[j / 2] * sum;
        }
        res_k += WGK[j] * sum;
        res_abs += WGK[j] * (f1.abs() + f2.abs());
    }

    let mean = 0.5 * res_k;
    let mut res_asc = WGK[10] * (fc - mean).abs();
    for j in 0..10 {
        res_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
    }

    let value = res_k * half;
    res_abs *= abs_half;
    res_asc *= abs_half;
    let mut error = ((res_k - res_g) * half).abs();
    if res_asc != 0.0 && error != 0.0 {
        error = res_asc * (200.0 * error / res_asc).powf(1.5).min(1.0);
    }
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * res_abs);
    }

    Ok(Segment { a, b, value, error })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_polynomial_exactly() {
        let r = integrate(|x| Ok(3.0 * x * x + 2.0 * x), 0.0, 2.0, &QuadConfig::default()).unwrap();
        assert!((r.value - 12.0).abs() < 1e-12, "got {}", r.value);
        assert_eq!(r.intervals, 1);
    }

    #[test]
    fn integrates_oscillatory_sinc_squared() {
        // ∫_0^{40π} sin²(x)/x² dx ≈ π/2 - 1/(2·40π) + O(x^-3)
        let sinc2 = |x: f64| Ok(if x == 0.0 { 1.0 } else { (x.sin() / x).powi(2) });
        let upper = 40.0 * std::f64::consts::PI;
        let r = integrate(sinc2, 0.0, upper, &QuadConfig::default()).unwrap();
        let approx = std::f64::consts::FRAC_PI_2 - 1.0 / (2.0 * upper);
        assert!((r.value - approx).abs() < 1e-4, "got {}", r.value);
        assert!(r.intervals > 1);
    }

    #[test]
    fn reversed_bounds_negate() {
        let cfg = QuadConfig::default();
        let fwd = integrate(|x| Ok(x.exp()), 0.0, 1.0, &cfg).unwrap();
        let rev = integrate(|x| Ok(x.exp()), 1.0, 0.0, &cfg).unwrap();
        assert!((fwd.value + rev.value).abs() < 1e-14);
        assert!((fwd.value - (std::f64::consts::E - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn empty_interval_is_zero() {
        let r = integrate(|_| Ok(1.0), 2.5, 2.5, &QuadConfig::default()).unwrap();
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn nan_integrand_is_non_convergence() {
        let r = integrate(|_| Ok(f64::NAN), 0.0, 1.0, &QuadConfig::default());
        assert!(matches!(r, Err(CvError::IntegrationNonConvergence { .. })));
    }

    #[test]
    fn tiny_limit_reports_non_convergence() {
        let cfg = QuadConfig {
            limit: 2,
            epsrel: 1e-14,
            epsabs: 0.0,
            ..QuadConfig::default()
        };
        let r = integrate(|x| Ok((50.0 * x).sin().abs()), 0.0, 10.0, &cfg);
        assert!(matches!(r, Err(CvError::IntegrationNonConvergence { .. })));
    }

    #[test]
    fn expired_deadline_times_out() {
        let cfg = QuadConfig::default().with_deadline(Some(Deadline::after(Duration::ZERO)));
        let r = integrate(|x| Ok(x), 0.0, 1.0, &cfg);
        assert!(matches!(r, Err(CvError::IntegrationTimeout { .. })));
    }

    #[test]
    fn integrand_errors_propagate() {
        let r = integrate(|_| Err(CvError::domain("boom")), 0.0, 1.0, &QuadConfig::default());
        assert_eq!(r, Err(CvError::domain("boom")));
    }
}
