//! Shared batch pipeline used by the CLI (and usable directly as a library).
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate inputs -> resolve bins -> σ_dm per bin (parallel) -> bias table -> outcomes
//!
//! The CLI can then focus on presentation and persistence.

use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::bias::BiasTable;
use crate::domain::{BatchOutput, BiasRow, BinFailure, BinOutcome, RedshiftBin, RunConfig, RunMeta};
use crate::error::CvError;
use crate::math::Deadline;
use crate::variance::{QuickCvOptions, quickcv};

/// Run every redshift bin of `config` and apply `table`.
///
/// Input errors (bad geometry, bins, cosmology) fail the whole call before any
/// integration starts. Failures inside a bin's computation are recorded as
/// [`BinOutcome::Failed`] and the remaining bins still run.
pub fn run_batch(config: &RunConfig, table: &BiasTable) -> Result<BatchOutput, CvError> {
    config.cosmology.validate()?;
    let bins = config.bins()?;
    if let Some(bin) = bins.as_slice().iter().find(|b| b.z_min() < 0.0) {
        return Err(CvError::invalid(format!(
            "bin centered at z = {} with width {} extends below z = 0",
            bin.center, bin.width
        )));
    }

    info!(
        bins = bins.len(),
        accuracy = %config.accuracy,
        side1_deg = config.geometry.side1_deg,
        side2_deg = config.geometry.side2_deg,
        "starting cosmic variance batch"
    );

    let outcomes: Vec<BinOutcome> = bins
        .as_slice()
        .par_iter()
        .map(|bin| match run_bin(bin, config, table) {
            Ok(row) => BinOutcome::Ok(row),
            Err(e) => {
                warn!(zmid = bin.center, dz = bin.width, error = %e, "bin failed");
                BinOutcome::Failed(BinFailure {
                    zmid: bin.center,
                    dz: bin.width,
                    error: e.to_string(),
                })
            }
        })
        .collect();

    Ok(BatchOutput {
        meta: run_meta(config),
        labels: table.labels(),
        outcomes,
    })
}

/// σ_dm and galaxy σ for a single bin.
pub fn run_bin(bin: &RedshiftBin, config: &RunConfig, table: &BiasTable) -> Result<BiasRow, CvError> {
    let opts = QuickCvOptions {
        accuracy: config.accuracy,
        deadline: config.timeout.map(Deadline::after),
        verbose: config.verbose,
    };
    let cv_dm = quickcv(&config.geometry, bin.center, bin.width, &config.cosmology, &opts)?;
    let cv = table.apply(bin.center, cv_dm);

    info!(zmid = bin.center, dz = bin.width, cv_dm, "bin done");

    Ok(BiasRow {
        zmid: bin.center,
        dz: bin.width,
        cv_dm,
        cv,
    })
}

fn run_meta(config: &RunConfig) -> RunMeta {
    RunMeta {
        tool: format!("cv {}", env!("CARGO_PKG_VERSION")),
        generated: Utc::now(),
        geometry: config.geometry,
        zarr: config.zarr.clone(),
        dz: config.dz,
        accuracy: config.accuracy,
        cosmology: config.cosmology,
        timeout_secs: config.timeout.map(|t| t.as_secs_f64()),
        verbose: config.verbose,
    }
}
