//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration (`Cosmology`, `SurveyGeometry`, `AccuracyMode`, `RunConfig`)
//! - redshift binning (`RedshiftBin`, `RedshiftBins`)
//! - batch outputs (`BiasRow`, `BinOutcome`, `RunMeta`)

pub mod types;

pub use types::*;
