//! Read/write run JSON files.
//!
//! Run JSON is the portable form of a batch: the full [`BatchOutput`] (inputs,
//! mass-bin labels and per-bin outcomes), so `cv show` can redisplay it later.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::bias::BiasTable;
use crate::domain::BatchOutput;
use crate::error::AppError;

/// Write a run JSON file.
pub fn write_run_json(path: &Path, output: &BatchOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create run JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, output)
        .map_err(|e| AppError::new(2, format!("Failed to write run JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush run JSON '{}': {e}", path.display())))?;

    Ok(())
}

/// Read a run JSON file.
pub fn read_run_json(path: &Path) -> Result<BatchOutput, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open run JSON '{}': {e}", path.display())))?;
    let output: BatchOutput = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid run JSON: {e}")))?;
    if output.rows().any(|row| row.cv.len() != output.labels.len()) {
        return Err(AppError::new(2, "Invalid run JSON: row width does not match mass-bin labels"));
    }
    Ok(output)
}

/// Load a bias table from a JSON array of mass bins.
pub fn read_bias_table(path: &Path) -> Result<BiasTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open bias table '{}': {e}", path.display())))?;
    Ok(BiasTable::from_json_reader(BufReader::new(file))?)
}
