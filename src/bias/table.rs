//! Linear bias of galaxies per stellar-mass bin.
//!
//! Each bin carries a triple `(b0, b1, b2)` and the bias at redshift `z` is
//!
//! ```text
//! b(z) = b0 · (1+z)^b1 + b2
//! ```
//!
//! Galaxy σ is `b(z) · σ_dm`.
//!
//! Known data issue: the fits for log M* = 7.0, 7.5 and 8.0 were extrapolated
//! incorrectly, so those bins currently reuse the 8.5 coefficients. The default
//! table keeps these literal values; downstream tables depend on them.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::CvError;

/// Number of stellar-mass bins in a table.
pub const MASS_BIN_COUNT: usize = 9;

/// Coefficients of `b(z) = b0·(1+z)^b1 + b2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

impl BiasCoefficients {
    pub const fn new(b0: f64, b1: f64, b2: f64) -> Self {
        Self { b0, b1, b2 }
    }

    pub fn bias(&self, z: f64) -> f64 {
        self.b0 * (1.0 + z).powf(self.b1) + self.b2
    }
}

/// One stellar-mass bin, `log M* ± 0.25`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassBin {
    /// Column label, e.g. `cv_95`.
    pub label: String,
    pub log_mstar: f64,
    pub coefficients: BiasCoefficients,
}

const DEFAULT_BINS: [(&str, f64, BiasCoefficients); MASS_BIN_COUNT] = [
    ("cv_70", 7.0, BiasCoefficients::new(0.062, 2.59, 1.025)),
    ("cv_75", 7.5, BiasCoefficients::new(0.062, 2.59, 1.025)),
    ("cv_80", 8.0, BiasCoefficients::new(0.062, 2.59, 1.025)),
    ("cv_85", 8.5, BiasCoefficients::new(0.062, 2.59, 1.025)),
    ("cv_90", 9.0, BiasCoefficients::new(0.074, 2.58, 1.039)),
    ("cv_95", 9.5, BiasCoefficients::new(0.042, 3.17, 1.147)),
    ("cv_100", 10.0, BiasCoefficients::new(0.053, 3.07, 1.225)),
    ("cv_105", 10.5, BiasCoefficients::new(0.069, 3.19, 1.269)),
    ("cv_110", 11.0, BiasCoefficients::new(0.173, 2.89, 1.438)),
];

/// Immutable lookup of bias coefficients keyed by mass-bin label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MassBin>", into = "Vec<MassBin>")]
pub struct BiasTable {
    bins: Vec<MassBin>,
}

impl Default for BiasTable {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS
                .iter()
                .map(|(label, log_mstar, coefficients)| MassBin {
                    label: (*label).to_string(),
                    log_mstar: *log_mstar,
                    coefficients: *coefficients,
                })
                .collect(),
        }
    }
}

impl TryFrom<Vec<MassBin>> for BiasTable {
    type Error = CvError;

    fn try_from(bins: Vec<MassBin>) -> Result<Self, Self::Error> {
        Self::new(bins)
    }
}

impl From<BiasTable> for Vec<MassBin> {
    fn from(table: BiasTable) -> Self {
        table.bins
    }
}

impl BiasTable {
    /// Build a table; requires [`MASS_BIN_COUNT`] bins with unique labels and
    /// finite coefficients.
    pub fn new(bins: Vec<MassBin>) -> Result<Self, CvError> {
        if bins.len() != MASS_BIN_COUNT {
            return Err(CvError::invalid(format!(
                "bias table needs {MASS_BIN_COUNT} mass bins (got {})",
                bins.len()
            )));
        }
        for (i, bin) in bins.iter().enumerate() {
            let c = bin.coefficients;
            if ![bin.log_mstar, c.b0, c.b1, c.b2].iter().all(|v| v.is_finite()) {
                return Err(CvError::invalid(format!("bias bin '{}' has non-finite values", bin.label)));
            }
            if bins[..i].iter().any(|other| other.label == bin.label) {
                return Err(CvError::invalid(format!("duplicate bias bin label '{}'", bin.label)));
            }
        }
        Ok(Self { bins })
    }

    /// Parse a JSON array of mass bins.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, CvError> {
        serde_json::from_reader(reader).map_err(|e| CvError::invalid(format!("invalid bias table JSON: {e}")))
    }

    pub fn bins(&self) -> &[MassBin] {
        &self.bins
    }

    pub fn labels(&self) -> Vec<String> {
        self.bins.iter().map(|b| b.label.clone()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&MassBin> {
        self.bins.iter().find(|b| b.label == label)
    }

    /// Bias of every bin at redshift `z`, in table order.
    pub fn biases(&self, z: f64) -> Vec<f64> {
        self.bins.iter().map(|b| b.coefficients.bias(z)).collect()
    }

    /// Galaxy σ per bin for dark-matter σ `sigma_dm` at redshift `z`.
    pub fn apply(&self, z: f64, sigma_dm: f64) -> Vec<f64> {
        self.biases(z).into_iter().map(|b| b * sigma_dm).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_literal_values() {
        let t = BiasTable::default();
        assert_eq!(t.bins().len(), MASS_BIN_COUNT);
        assert_eq!(
            t.labels(),
            vec!["cv_70", "cv_75", "cv_80", "cv_85", "cv_90", "cv_95", "cv_100", "cv_105", "cv_110"]
        );
        let low = t.get("cv_85").unwrap().coefficients;
        for label in ["cv_70", "cv_75", "cv_80"] {
            assert_eq!(t.get(label).unwrap().coefficients, low);
        }
        assert_eq!(t.get("cv_110").unwrap().coefficients, BiasCoefficients::new(0.173, 2.89, 1.438));
        assert!(t.get("cv_120").is_none());
    }

    #[test]
    fn bias_formula() {
        let c = BiasCoefficients::new(0.5, 2.0, 1.0);
        assert!((c.bias(1.0) - 3.0).abs() < 1e-15);
        assert!((c.bias(0.0) - 1.5).abs() < 1e-15);
    }

    #[test]
    fn bias_increases_from_bin_nine_upward() {
        let t = BiasTable::default();
        for z in [3.5, 4.5, 5.75] {
            let b = t.biases(z);
            assert!(b.iter().all(|v| *v > 0.0));
            assert!(b[..4].windows(2).all(|w| w[0] == w[1]));
            assert!(b[3..].windows(2).all(|w| w[1] > w[0]), "z={z}: {b:?}");
        }
    }

    #[test]
    fn apply_scales_sigma() {
        let t = BiasTable::default();
        let cv = t.apply(3.5, 0.1);
        let b = t.biases(3.5);
        for (g, bi) in cv.iter().zip(&b) {
            assert!((g - 0.1 * bi).abs() < 1e-15);
        }
    }

    #[test]
    fn json_round_trip_and_validation() {
        let t = BiasTable::default();
        let json = serde_json::to_string(&t).unwrap();
        let back = BiasTable::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(back, t);

        let short = r#"[{"label":"cv_70","log_mstar":7.0,"coefficients":{"b0":0.1,"b1":2.0,"b2":1.0}}]"#;
        assert!(matches!(
            BiasTable::from_json_reader(short.as_bytes()),
            Err(CvError::InvalidInput(_))
        ));

        let mut bins = t.bins().to_vec();
        bins[1].label = "cv_70".to_string();
        assert!(BiasTable::new(bins).is_err());
    }
}
