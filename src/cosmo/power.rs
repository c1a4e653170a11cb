//! Linear matter power spectrum from a shape-parameter transfer function.
//!
//! - shape: `Γ = Ωm·h·exp(-Ωb(1 + √(2h)/Ωm))`
//! - transfer: `T(q) = ln(1+2.34q)/(2.34q) · [1 + 3.89q + (16.1q)² + (5.46q)³ + (6.71q)⁴]^(-1/4)`,
//!   `q = k/(hΓ)`
//! - amplitude: the dimensionless spectrum `k^(3+ns)·T²` is normalized so that it
//!   equals `σ8²` at `k_eff = 0.172 + 0.011·ln²(Γ/0.34)`
//!
//! [`PowerSpectrum::power`] returns `2π²·k^ns·T²·norm`: the `k³` of the
//! dimensionless spectrum is left out and the `1/k³` of `P(k)` is not applied.
//! The variance integral is written against exactly this convention; it is not a
//! standalone `P(k)` in (Mpc)³.

use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::domain::Cosmology;
use crate::error::CvError;

/// Below this `2.34q` the logarithmic factor uses its series.
const SMALL_X: f64 = 1e-8;

/// Shape parameter `Γ` with the baryon correction.
pub fn shape_parameter(cosmo: &Cosmology) -> f64 {
    cosmo.omega_m
        * cosmo.h
        * (-cosmo.omega_baryon * (1.0 + (2.0 * cosmo.h).sqrt() / cosmo.omega_m)).exp()
}

/// Effective normalization wavenumber for a given `Γ`.
pub fn effective_wavenumber(gamma: f64) -> f64 {
    0.172 + 0.011 * (gamma / 0.34).ln().powi(2)
}

/// Transfer function `T(q)`; tends to 1 as `q → 0`.
pub fn transfer_function(q: f64) -> f64 {
    let x = 2.34 * q;
    let lead = if x.abs() < SMALL_X { 1.0 - 0.5 * x } else { x.ln_1p() / x };
    let poly = 1.0 + 3.89 * q + (16.1 * q).powi(2) + (5.46 * q).powi(3) + (6.71 * q).powi(4);
    lead * poly.powf(-0.25)
}

/// Precomputed spectrum for one cosmology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSpectrum {
    gamma: f64,
    h_gamma: f64,
    ns: f64,
    k_eff: f64,
    /// `σ8² / Δ²_eff`
    norm: f64,
}

impl PowerSpectrum {
    pub fn new(cosmo: &Cosmology) -> Result<Self, CvError> {
        let gamma = shape_parameter(cosmo);
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(CvError::domain(format!("shape parameter gamma = {gamma} is not positive")));
        }
        let h_gamma = cosmo.h * gamma;
        let k_eff = effective_wavenumber(gamma);
        let delta_eff = k_eff.powf(3.0 + cosmo.ns) * transfer_function(k_eff / h_gamma).powi(2);
        if !(delta_eff.is_finite() && delta_eff > 0.0) {
            return Err(CvError::domain(format!(
                "reference amplitude at k_eff = {k_eff} is {delta_eff}"
            )));
        }

        Ok(Self {
            gamma,
            h_gamma,
            ns: cosmo.ns,
            k_eff,
            norm: cosmo.sigma8 * cosmo.sigma8 / delta_eff,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn k_eff(&self) -> f64 {
        self.k_eff
    }

    pub fn transfer(&self, k: f64) -> f64 {
        transfer_function(k / self.h_gamma)
    }

    /// Normalized dimensionless spectrum `Δ²(k)`; equals `σ8²` at `k_eff`.
    pub fn dimensionless(&self, k: f64) -> f64 {
        k.powf(3.0 + self.ns) * self.transfer(k).powi(2) * self.norm
    }

    /// Pipeline power `2π²·k^ns·T(k)²·σ8²/Δ²_eff` at `|k|`.
    pub fn power(&self, k: f64) -> f64 {
        if k == 0.0 {
            return 0.0;
        }
        2.0 * PI * PI * k.powf(self.ns) * self.transfer(k).powi(2) * self.norm
    }

    /// [`Self::power`] at the magnitude of a 3-D wavenumber.
    pub fn power_at(&self, k: &Vector3<f64>) -> f64 {
        self.power(k.norm())
    }
}
