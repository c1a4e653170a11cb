//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed by value through the numeric core
//! - exported to JSON/CSV
//! - reloaded later for display

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::CvError;

/// Default matter density.
pub const DEFAULT_OMEGA_M: f64 = 0.308;
/// Default cosmological-constant density.
pub const DEFAULT_OMEGA_LAMBDA: f64 = 0.692;
/// Default dimensionless Hubble constant.
pub const DEFAULT_H: f64 = 0.678;
/// Default baryon density, `0.022 / h^2` evaluated at [`DEFAULT_H`].
///
/// This is a fixed constant; changing `h` on a [`Cosmology`] does not move it.
pub const DEFAULT_OMEGA_BARYON: f64 = 0.022 / (DEFAULT_H * DEFAULT_H);
/// Default power spectrum amplitude.
pub const DEFAULT_SIGMA8: f64 = 0.82;
/// Default primordial spectral index.
pub const DEFAULT_NS: f64 = 0.96;

/// Degrees per radian as used for the transverse box sides.
pub const DEG_PER_RAD: f64 = 57.2958;

/// Comoving side lengths of the survey box, in Mpc.
pub type BoxSides = Vector3<f64>;

/// Cosmological parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    pub omega_m: f64,
    pub omega_lambda: f64,
    pub omega_baryon: f64,
    pub sigma8: f64,
    pub ns: f64,
    pub h: f64,
    /// Extra dark-energy component with constant equation of state `w_q`.
    pub omega_q: f64,
    pub w_q: f64,
}

impl Default for Cosmology {
    fn default() -> Self {
        Self {
            omega_m: DEFAULT_OMEGA_M,
            omega_lambda: DEFAULT_OMEGA_LAMBDA,
            omega_baryon: DEFAULT_OMEGA_BARYON,
            sigma8: DEFAULT_SIGMA8,
            ns: DEFAULT_NS,
            h: DEFAULT_H,
            omega_q: 0.0,
            w_q: 0.0,
        }
    }
}

impl Cosmology {
    /// Check the parameter invariants.
    ///
    /// A non-positive `omega_m` is a numeric-domain error (it zeroes the growth
    /// factor denominator); every other violation is invalid input.
    pub fn validate(&self) -> Result<(), CvError> {
        if !(self.omega_m.is_finite() && self.omega_m > 0.0) {
            return Err(CvError::domain(format!("omega_m must be finite and > 0 (got {})", self.omega_m)));
        }
        let positive = [
            ("omega_lambda", self.omega_lambda),
            ("sigma8", self.sigma8),
            ("h", self.h),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CvError::invalid(format!("{name} must be finite and > 0 (got {value})")));
            }
        }
        if !(self.omega_baryon.is_finite() && self.omega_baryon >= 0.0) {
            return Err(CvError::invalid(format!(
                "omega_baryon must be finite and >= 0 (got {})",
                self.omega_baryon
            )));
        }
        for (name, value) in [("ns", self.ns), ("omega_q", self.omega_q), ("w_q", self.w_q)] {
            if !value.is_finite() {
                return Err(CvError::invalid(format!("{name} must be finite (got {value})")));
            }
        }
        Ok(())
    }

    /// Curvature term `K = Ωm + ΩΛ + ΩQ - 1` (positive means closed).
    pub fn curvature(&self) -> f64 {
        self.omega_m + self.omega_lambda + self.omega_q - 1.0
    }
}

/// Rectangular sky footprint, sides in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyGeometry {
    pub side1_deg: f64,
    pub side2_deg: f64,
}

impl SurveyGeometry {
    pub fn new(side1_deg: f64, side2_deg: f64) -> Result<Self, CvError> {
        for (name, value) in [("side1", side1_deg), ("side2", side2_deg)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CvError::invalid(format!("{name} must be finite and > 0 degrees (got {value})")));
            }
        }
        Ok(Self { side1_deg, side2_deg })
    }

    /// Build from sides given in `unit`.
    pub fn with_unit(side1: f64, side2: f64, unit: AngleUnit) -> Result<Self, CvError> {
        Self::new(unit.to_degrees(side1), unit.to_degrees(side2))
    }
}

/// Unit of the angular sides supplied on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    Deg,
    Arcmin,
    Arcsec,
}

impl AngleUnit {
    pub fn to_degrees(self, value: f64) -> f64 {
        match self {
            AngleUnit::Deg => value,
            AngleUnit::Arcmin => value / 60.0,
            AngleUnit::Arcsec => value / 3600.0,
        }
    }
}

/// Speed/precision trade-off of the variance integral.
///
/// `Low` truncates the k-space domain five times harder than `High`: roughly
/// 40x faster for about 2% error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyMode {
    #[default]
    Low,
    High,
}

impl AccuracyMode {
    /// Divisor applied to the per-axis `kmax`.
    pub fn divisor(self) -> f64 {
        match self {
            AccuracyMode::Low => 5.0,
            AccuracyMode::High => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccuracyMode::Low => "low",
            AccuracyMode::High => "high",
        }
    }
}

impl fmt::Display for AccuracyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccuracyMode {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(AccuracyMode::Low),
            "high" => Ok(AccuracyMode::High),
            other => Err(CvError::invalid(format!(
                "unsupported accuracy mode '{other}' (expected 'low' or 'high')"
            ))),
        }
    }
}

/// One redshift slice: center and full width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedshiftBin {
    pub center: f64,
    pub width: f64,
}

impl RedshiftBin {
    pub fn z_min(&self) -> f64 {
        self.center - self.width / 2.0
    }

    pub fn z_max(&self) -> f64 {
        self.center + self.width / 2.0
    }
}

/// Ordered redshift bins of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftBins(Vec<RedshiftBin>);

impl RedshiftBins {
    /// Bins between consecutive edges. Edges must be finite, non-negative and
    /// strictly increasing.
    pub fn from_edges(edges: &[f64]) -> Result<Self, CvError> {
        if edges.len() < 2 {
            return Err(CvError::invalid(format!(
                "need at least two redshift bin edges (got {})",
                edges.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|z| !(z.is_finite() && **z >= 0.0)) {
            return Err(CvError::invalid(format!("redshift edges must be finite and >= 0 (got {bad})")));
        }
        if let Some(w) = edges.windows(2).find(|w| w[1] <= w[0]) {
            return Err(CvError::invalid(format!(
                "redshift edges must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }

        let bins = edges
            .windows(2)
            .map(|w| RedshiftBin {
                center: (w[0] + w[1]) / 2.0,
                width: w[1] - w[0],
            })
            .collect();
        Ok(Self(bins))
    }

    /// Bins centered at `centers`, all sharing `width`.
    pub fn from_centers(centers: &[f64], width: f64) -> Result<Self, CvError> {
        if centers.is_empty() {
            return Err(CvError::invalid("need at least one redshift bin center"));
        }
        if !(width.is_finite() && width >= 0.0) {
            return Err(CvError::invalid(format!("bin width must be finite and >= 0 (got {width})")));
        }
        if let Some(bad) = centers.iter().find(|z| !(z.is_finite() && **z >= 0.0)) {
            return Err(CvError::invalid(format!("redshift centers must be finite and >= 0 (got {bad})")));
        }
        Ok(Self(
            centers
                .iter()
                .map(|&center| RedshiftBin { center, width })
                .collect(),
        ))
    }

    pub fn as_slice(&self) -> &[RedshiftBin] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One row of the result table: dark-matter σ plus σ for each stellar-mass bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasRow {
    pub zmid: f64,
    pub dz: f64,
    pub cv_dm: f64,
    /// Galaxy σ per stellar-mass bin, in bias-table order.
    pub cv: Vec<f64>,
}

/// A bin whose computation failed; the rest of the batch still runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinFailure {
    pub zmid: f64,
    pub dz: f64,
    pub error: String,
}

/// Outcome for one redshift bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BinOutcome {
    Ok(BiasRow),
    Failed(BinFailure),
}

impl BinOutcome {
    pub fn zmid(&self) -> f64 {
        match self {
            BinOutcome::Ok(row) => row.zmid,
            BinOutcome::Failed(f) => f.zmid,
        }
    }

    pub fn dz(&self) -> f64 {
        match self {
            BinOutcome::Ok(row) => row.dz,
            BinOutcome::Failed(f) => f.dz,
        }
    }
}

/// Everything a run was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub geometry: SurveyGeometry,
    /// Redshift values as given: bin edges, or bin centers when `dz` is set.
    pub zarr: Vec<f64>,
    pub dz: Option<f64>,
    pub accuracy: AccuracyMode,
    pub cosmology: Cosmology,
    pub timeout_secs: Option<f64>,
    pub verbose: bool,
}

/// All outputs of a batch run, in bin order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub meta: RunMeta,
    /// Mass-bin column labels, matching `BiasRow::cv`.
    pub labels: Vec<String>,
    pub outcomes: Vec<BinOutcome>,
}

impl BatchOutput {
    pub fn rows(&self) -> impl Iterator<Item = &BiasRow> {
        self.outcomes.iter().filter_map(|o| match o {
            BinOutcome::Ok(row) => Some(row),
            BinOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &BinFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            BinOutcome::Ok(_) => None,
            BinOutcome::Failed(f) => Some(f),
        })
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub geometry: SurveyGeometry,
    /// Bin edges, or bin centers when `dz` is set.
    pub zarr: Vec<f64>,
    pub dz: Option<f64>,
    pub accuracy: AccuracyMode,
    pub cosmology: Cosmology,
    /// Per-bin wall-clock budget for the variance integral.
    pub timeout: Option<Duration>,
    /// Report integration timing at `info` level.
    pub verbose: bool,

    /// Run name; when set, values and metadata CSVs are written to `output_dir`.
    pub name: Option<String>,
    pub output_dir: PathBuf,
    pub export_json: Option<PathBuf>,
    pub bias_table: Option<PathBuf>,
}

impl RunConfig {
    /// Config for an in-memory run with default cosmology and no persistence.
    pub fn new(geometry: SurveyGeometry, zarr: Vec<f64>, dz: Option<f64>) -> Self {
        Self {
            geometry,
            zarr,
            dz,
            accuracy: AccuracyMode::default(),
            cosmology: Cosmology::default(),
            timeout: None,
            verbose: false,
            name: None,
            output_dir: PathBuf::from("dfs"),
            export_json: None,
            bias_table: None,
        }
    }

    /// Resolve `zarr`/`dz` into bins.
    pub fn bins(&self) -> Result<RedshiftBins, CvError> {
        match self.dz {
            None => RedshiftBins::from_edges(&self.zarr),
            Some(width) => RedshiftBins::from_centers(&self.zarr, width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cosmology_is_valid_and_flat() {
        let c = Cosmology::default();
        c.validate().unwrap();
        assert!(c.curvature().abs() < 1e-12);
        assert!((c.omega_baryon - 0.022 / (0.678 * 0.678)).abs() < 1e-15);
    }

    #[test]
    fn cosmology_rejects_non_positive_parameters() {
        let c = Cosmology { omega_m: 0.0, ..Cosmology::default() };
        assert!(matches!(c.validate(), Err(CvError::NumericDomain(_))));
        let c = Cosmology { omega_lambda: 0.0, ..Cosmology::default() };
        assert!(matches!(c.validate(), Err(CvError::InvalidInput(_))));
        let c = Cosmology { h: f64::NAN, ..Cosmology::default() };
        assert!(c.validate().is_err());
        let c = Cosmology { sigma8: -0.8, ..Cosmology::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn edges_give_centers_and_widths() {
        let bins = RedshiftBins::from_edges(&[3.0, 4.0, 5.0, 6.5]).unwrap();
        let centers: Vec<f64> = bins.as_slice().iter().map(|b| b.center).collect();
        let widths: Vec<f64> = bins.as_slice().iter().map(|b| b.width).collect();
        assert_eq!(centers, vec![3.5, 4.5, 5.75]);
        assert_eq!(widths, vec![1.0, 1.0, 1.5]);
    }

    #[test]
    fn non_increasing_edges_are_rejected() {
        assert!(matches!(
            RedshiftBins::from_edges(&[3.0, 4.0, 4.0]),
            Err(CvError::InvalidInput(_))
        ));
        assert!(RedshiftBins::from_edges(&[5.0, 4.0]).is_err());
        assert!(RedshiftBins::from_edges(&[1.0]).is_err());
        assert!(RedshiftBins::from_edges(&[-1.0, 1.0]).is_err());
    }

    #[test]
    fn centers_share_width() {
        let bins = RedshiftBins::from_centers(&[1.0, 2.0], 0.2).unwrap();
        assert_eq!(bins.len(), 2);
        assert!(bins.as_slice().iter().all(|b| b.width == 0.2));
        assert!(RedshiftBins::from_centers(&[1.0], -0.1).is_err());
        assert!(RedshiftBins::from_centers(&[], 0.1).is_err());
    }

    #[test]
    fn accuracy_mode_parses_and_rejects() {
        assert_eq!("low".parse::<AccuracyMode>().unwrap(), AccuracyMode::Low);
        assert_eq!(" HIGH ".parse::<AccuracyMode>().unwrap(), AccuracyMode::High);
        assert!(matches!("medium".parse::<AccuracyMode>(), Err(CvError::InvalidInput(_))));
        assert_eq!(AccuracyMode::Low.divisor(), 5.0);
        assert_eq!(AccuracyMode::High.divisor(), 1.0);
    }

    #[test]
    fn geometry_units_and_validation() {
        let g = SurveyGeometry::with_unit(3.4, 10.2, AngleUnit::Arcmin).unwrap();
        assert!((g.side1_deg - 3.4 / 60.0).abs() < 1e-15);
        assert!((g.side2_deg - 10.2 / 60.0).abs() < 1e-15);
        assert!(SurveyGeometry::new(0.0, 1.0).is_err());
        assert!(SurveyGeometry::new(1.0, f64::INFINITY).is_err());
    }
}
