//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - runs the batch or single-slice computation
//! - prints reports and writes optional exports

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bias::BiasTable;
use crate::cli::{Command, QuickArgs, ShowArgs, TableArgs};
use crate::domain::{RunConfig, SurveyGeometry};
use crate::error::AppError;
use crate::math::Deadline;
use crate::variance::{QuickCvOptions, quickcv_detailed};

pub mod pipeline;

/// Entry point for the `cv` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    let verbose = match &cli.command {
        Command::Table(args) => args.verbose,
        Command::Quick(args) => args.verbose,
        Command::Show(_) => false,
    };
    init_tracing(verbose);

    match cli.command {
        Command::Table(args) => handle_table(args),
        Command::Quick(args) => handle_quick(args),
        Command::Show(args) => handle_show(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over the `--verbose` default.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_table(args: TableArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let table = match &config.bias_table {
        Some(path) => crate::io::read_bias_table(path)?,
        None => BiasTable::default(),
    };

    let output = pipeline::run_batch(&config, &table)?;

    println!("{}", crate::report::format_run_summary(&output.meta));
    print!("{}", crate::report::format_table(&output));
    let failures = crate::report::format_failures(&output);
    if !failures.is_empty() {
        println!();
        print!("{failures}");
    }

    // Optional exports.
    if let Some(name) = &config.name {
        let files = crate::io::write_named_run(&config.output_dir, name, &output)?;
        info!(values = %files.values.display(), meta = %files.meta.display(), "saved run");
    }
    if let Some(path) = &config.export_json {
        crate::io::write_run_json(path, &output)?;
        info!(path = %path.display(), "exported run JSON");
    }

    Ok(())
}

fn handle_quick(args: QuickArgs) -> Result<(), AppError> {
    let geometry = SurveyGeometry::with_unit(args.field.side1, args.field.side2, args.field.unit)?;
    let opts = QuickCvOptions {
        accuracy: args.acc,
        deadline: timeout_from_secs(args.timeout_secs)?.map(Deadline::after),
        verbose: args.verbose,
    };
    let cosmology = args.cosmology.to_cosmology();

    let cv = quickcv_detailed(&geometry, args.z, args.dz, &cosmology, &opts)?;
    print!("{}", crate::report::format_quick(&geometry, args.z, args.dz, &cv));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let output = crate::io::read_run_json(&args.json)?;
    println!("{}", crate::report::format_run_summary(&output.meta));
    print!("{}", crate::report::format_table(&output));
    let failures = crate::report::format_failures(&output);
    if !failures.is_empty() {
        println!();
        print!("{failures}");
    }
    Ok(())
}

pub fn run_config_from_args(args: &TableArgs) -> Result<RunConfig, AppError> {
    let geometry = SurveyGeometry::with_unit(args.field.side1, args.field.side2, args.field.unit)?;
    Ok(RunConfig {
        geometry,
        zarr: args.z.clone(),
        dz: args.dz,
        accuracy: args.acc,
        cosmology: args.cosmology.to_cosmology(),
        timeout: timeout_from_secs(args.timeout_secs)?,
        verbose: args.verbose,
        name: args.name.clone(),
        output_dir: args.output_dir.clone(),
        export_json: args.export_json.clone(),
        bias_table: args.bias_table.clone(),
    })
}

fn timeout_from_secs(secs: Option<f64>) -> Result<Option<Duration>, AppError> {
    match secs {
        None => Ok(None),
        Some(s) => Duration::try_from_secs_f64(s)
            .map(Some)
            .map_err(|_| AppError::new(2, format!("Invalid --timeout-secs {s}: expected a non-negative number"))),
    }
}
