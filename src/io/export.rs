//! Persist batch results as CSV.
//!
//! A named run produces two files in the output directory:
//!
//! - `<name>.csv`: one row per redshift bin (`zmid, dz, cv_dm, cv_70 .. cv_110, status`)
//! - `<name>_meta.csv`: the inputs, one row per supplied redshift value
//!
//! Failed bins keep their `zmid`/`dz` and carry the error message in `status`;
//! their σ cells are left empty.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::{BatchOutput, BinOutcome};
use crate::error::AppError;

/// Columns of the metadata file.
pub const META_COLUMNS: [&str; 13] = [
    "side1",
    "side2",
    "zarr",
    "dz",
    "acc",
    "OmegaM",
    "OmegaL",
    "OmegaBaryon",
    "sigma8",
    "ns",
    "h",
    "verbose",
    "generated",
];

/// Paths written by [`write_named_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    pub values: PathBuf,
    pub meta: PathBuf,
}

/// Write `<dir>/<name>.csv` and `<dir>/<name>_meta.csv`, creating `dir` if needed.
pub fn write_named_run(dir: &Path, name: &str, output: &BatchOutput) -> Result<RunFiles, AppError> {
    validate_run_name(name)?;
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output directory '{}': {e}", dir.display())))?;

    let files = RunFiles {
        values: dir.join(format!("{name}.csv")),
        meta: dir.join(format!("{name}_meta.csv")),
    };
    write_values_csv(&files.values, output)?;
    write_meta_csv(&files.meta, output)?;
    Ok(files)
}

/// Write the per-bin table.
pub fn write_values_csv(path: &Path, output: &BatchOutput) -> Result<(), AppError> {
    let mut writer = create_csv(path)?;

    let mut header = vec!["zmid".to_string(), "dz".to_string(), "cv_dm".to_string()];
    header.extend(output.labels.iter().cloned());
    header.push("status".to_string());
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header to '{}': {e}", path.display())))?;

    for outcome in &output.outcomes {
        let mut record = vec![outcome.zmid().to_string(), outcome.dz().to_string()];
        match outcome {
            BinOutcome::Ok(row) => {
                record.push(row.cv_dm.to_string());
                record.extend(row.cv.iter().map(|v| v.to_string()));
                record.push("ok".to_string());
            }
            BinOutcome::Failed(failure) => {
                record.extend(std::iter::repeat_n(String::new(), output.labels.len() + 1));
                record.push(failure.error.clone());
            }
        }
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row to '{}': {e}", path.display())))?;
    }

    finish_csv(writer, path)
}

/// Write the run inputs, one row per value of `zarr`.
pub fn write_meta_csv(path: &Path, output: &BatchOutput) -> Result<(), AppError> {
    let meta = &output.meta;
    let mut writer = create_csv(path)?;
    writer
        .write_record(META_COLUMNS)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header to '{}': {e}", path.display())))?;

    let c = &meta.cosmology;
    let generated = meta.generated.to_rfc3339();
    for z in &meta.zarr {
        let record = [
            meta.geometry.side1_deg.to_string(),
            meta.geometry.side2_deg.to_string(),
            z.to_string(),
            meta.dz.map(|w| w.to_string()).unwrap_or_default(),
            meta.accuracy.to_string(),
            c.omega_m.to_string(),
            c.omega_lambda.to_string(),
            c.omega_baryon.to_string(),
            c.sigma8.to_string(),
            c.ns.to_string(),
            c.h.to_string(),
            meta.verbose.to_string(),
            generated.clone(),
        ];
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row to '{}': {e}", path.display())))?;
    }

    finish_csv(writer, path)
}

fn validate_run_name(name: &str) -> Result<(), AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed != name || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(AppError::new(2, format!("Invalid run name '{name}': use a plain file stem")));
    }
    Ok(())
}

fn create_csv(path: &Path) -> Result<csv::Writer<BufWriter<File>>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

fn finish_csv(writer: csv::Writer<BufWriter<File>>, path: &Path) -> Result<(), AppError> {
    let mut inner = writer
        .into_inner()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    inner
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{AccuracyMode, BiasRow, BinFailure, Cosmology, RunMeta, SurveyGeometry};

    fn sample_output() -> BatchOutput {
        let labels: Vec<String> = ["cv_70", "cv_75", "cv_80", "cv_85", "cv_90", "cv_95", "cv_100", "cv_105", "cv_110"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        BatchOutput {
            meta: RunMeta {
                tool: "cv test".to_string(),
                generated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                geometry: SurveyGeometry::new(0.05, 0.15).unwrap(),
                zarr: vec![3.0, 4.0, 5.0],
                dz: None,
                accuracy: AccuracyMode::Low,
                cosmology: Cosmology::default(),
                timeout_secs: None,
                verbose: false,
            },
            outcomes: vec![
                BinOutcome::Ok(BiasRow {
                    zmid: 3.5,
                    dz: 1.0,
                    cv_dm: 0.12,
                    cv: (0..9).map(|i| 0.2 + i as f64 * 0.01).collect(),
                }),
                BinOutcome::Failed(BinFailure {
                    zmid: 4.5,
                    dz: 1.0,
                    error: "integration timed out after 0.0s".to_string(),
                }),
            ],
            labels,
        }
    }

    #[test]
    fn values_csv_has_header_and_one_line_per_bin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        write_values_csv(&path, &sample_output()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 13);
        assert_eq!(&headers[0], "zmid");
        assert_eq!(&headers[3], "cv_70");
        assert_eq!(&headers[12], "status");

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "3.5");
        assert_eq!(records[0][2].parse::<f64>().unwrap(), 0.12);
        assert_eq!(&records[0][12], "ok");
        assert_eq!(&records[1][0], "4.5");
        assert_eq!(&records[1][2], "");
        assert!(records[1][12].contains("timed out"));
    }

    #[test]
    fn meta_csv_has_one_row_per_redshift_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_meta.csv");
        write_meta_csv(&path, &sample_output()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(|s| s.to_string()).collect();
        assert_eq!(headers, META_COLUMNS.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[2][2], "5");
        assert_eq!(&records[0][3], "");
        assert_eq!(&records[0][4], "low");
        assert_eq!(records[0][5].parse::<f64>().unwrap(), 0.308);
        assert!(records[0][12].starts_with("2024-05-01T12:00:00"));
    }

    #[test]
    fn named_run_creates_directory_and_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("dfs");
        let files = write_named_run(&out_dir, "deep_field", &sample_output()).unwrap();
        assert_eq!(files.values, out_dir.join("deep_field.csv"));
        assert_eq!(files.meta, out_dir.join("deep_field_meta.csv"));
        assert!(files.values.is_file());
        assert!(files.meta.is_file());
    }

    #[test]
    fn named_run_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", "a/b", "..", " padded"] {
            let err = write_named_run(dir.path(), bad, &sample_output()).unwrap_err();
            assert_eq!(err.exit_code(), 2);
        }
    }
}
