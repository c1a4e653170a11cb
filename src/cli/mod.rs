//! Command-line parsing for the cosmic variance calculator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the numeric code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    AccuracyMode, AngleUnit, Cosmology, DEFAULT_H, DEFAULT_NS, DEFAULT_OMEGA_BARYON, DEFAULT_OMEGA_LAMBDA,
    DEFAULT_OMEGA_M, DEFAULT_SIGMA8,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cv", version, about = "Cosmic variance for pencil-beam galaxy surveys")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute dark-matter and galaxy cosmic variance for a set of redshift bins.
    Table(TableArgs),
    /// Compute dark-matter cosmic variance for a single redshift slice.
    Quick(QuickArgs),
    /// Print a previously exported run JSON.
    Show(ShowArgs),
}

/// Survey field size.
#[derive(Debug, Args, Clone)]
pub struct FieldArgs {
    /// First side of the field (degrees unless `--unit` says otherwise).
    #[arg(long)]
    pub side1: f64,

    /// Second side of the field (degrees unless `--unit` says otherwise).
    #[arg(long)]
    pub side2: f64,

    /// Unit of `--side1`/`--side2`.
    #[arg(long, value_enum, default_value_t = AngleUnit::Deg)]
    pub unit: AngleUnit,
}

/// Cosmological parameters.
#[derive(Debug, Args, Clone)]
pub struct CosmologyArgs {
    #[arg(long = "omega-m", default_value_t = DEFAULT_OMEGA_M)]
    pub omega_m: f64,

    #[arg(long = "omega-l", default_value_t = DEFAULT_OMEGA_LAMBDA)]
    pub omega_lambda: f64,

    /// Baryon density (defaults to 0.022/h^2 at h = 0.678).
    #[arg(long = "omega-b", default_value_t = DEFAULT_OMEGA_BARYON)]
    pub omega_baryon: f64,

    #[arg(long, default_value_t = DEFAULT_SIGMA8)]
    pub sigma8: f64,

    #[arg(long, default_value_t = DEFAULT_NS)]
    pub ns: f64,

    #[arg(long, default_value_t = DEFAULT_H)]
    pub h: f64,

    /// Extra dark-energy density with constant equation of state `--w-q`.
    #[arg(long = "omega-q", default_value_t = 0.0)]
    pub omega_q: f64,

    #[arg(long = "w-q", default_value_t = 0.0, allow_negative_numbers = true)]
    pub w_q: f64,
}

impl CosmologyArgs {
    pub fn to_cosmology(&self) -> Cosmology {
        Cosmology {
            omega_m: self.omega_m,
            omega_lambda: self.omega_lambda,
            omega_baryon: self.omega_baryon,
            sigma8: self.sigma8,
            ns: self.ns,
            h: self.h,
            omega_q: self.omega_q,
            w_q: self.w_q,
        }
    }
}

/// Options for a batch table.
#[derive(Debug, Args, Clone)]
pub struct TableArgs {
    #[command(flatten)]
    pub field: FieldArgs,

    /// Redshift bin edges (comma separated), or bin centers when `--dz` is given.
    #[arg(long = "z", value_delimiter = ',', num_args = 1.., required = true)]
    pub z: Vec<f64>,

    /// Shared bin width; turns `--z` into bin centers.
    #[arg(long)]
    pub dz: Option<f64>,

    /// Integration accuracy (low is ~40x faster for ~2% error).
    #[arg(long, value_enum, default_value_t = AccuracyMode::Low)]
    pub acc: AccuracyMode,

    #[command(flatten)]
    pub cosmology: CosmologyArgs,

    /// Save `<name>.csv` and `<name>_meta.csv` in the output directory.
    #[arg(long)]
    pub name: Option<String>,

    /// Directory for named runs.
    #[arg(long = "output-dir", env = "CV_OUTPUT_DIR", default_value = "dfs")]
    pub output_dir: PathBuf,

    /// Export the whole run to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Bias table JSON replacing the built-in stellar-mass table.
    #[arg(long = "bias-table", value_name = "JSON")]
    pub bias_table: Option<PathBuf>,

    /// Per-bin time limit for the variance integral, in seconds.
    #[arg(long = "timeout-secs")]
    pub timeout_secs: Option<f64>,

    /// Log integration timing per bin.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for a single slice.
#[derive(Debug, Args, Clone)]
pub struct QuickArgs {
    #[command(flatten)]
    pub field: FieldArgs,

    /// Slice center.
    #[arg(long = "z")]
    pub z: f64,

    /// Slice width.
    #[arg(long)]
    pub dz: f64,

    #[arg(long, value_enum, default_value_t = AccuracyMode::Low)]
    pub acc: AccuracyMode,

    #[command(flatten)]
    pub cosmology: CosmologyArgs,

    #[arg(long = "timeout-secs")]
    pub timeout_secs: Option<f64>,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for redisplaying a saved run.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Run JSON produced by `cv table --export-json`.
    #[arg(long, value_name = "JSON")]
    pub json: PathBuf,
}
