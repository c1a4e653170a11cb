//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the numeric core stays free of presentation concerns
//! - output changes are localized

use crate::domain::{BatchOutput, BinOutcome, RunMeta, SurveyGeometry};
use crate::variance::CosmicVariance;

/// Run header: field, accuracy and cosmology.
pub fn format_run_summary(meta: &RunMeta) -> String {
    let mut out = String::new();
    let c = &meta.cosmology;

    out.push_str("=== cv - cosmic variance ===\n");
    out.push_str(&format!(
        "Field: {:.4} x {:.4} deg ({:.2}' x {:.2}')\n",
        meta.geometry.side1_deg,
        meta.geometry.side2_deg,
        meta.geometry.side1_deg * 60.0,
        meta.geometry.side2_deg * 60.0,
    ));
    match meta.dz {
        Some(dz) => out.push_str(&format!("Centers: {} (dz={dz})\n", fmt_vec(&meta.zarr))),
        None => out.push_str(&format!("Edges: {}\n", fmt_vec(&meta.zarr))),
    }
    out.push_str(&format!("Accuracy: {}\n", meta.accuracy));
    out.push_str(&format!(
        "Cosmology: OmegaM={} OmegaL={} OmegaBaryon={:.5} sigma8={} ns={} h={}",
        c.omega_m, c.omega_lambda, c.omega_baryon, c.sigma8, c.ns, c.h
    ));
    if c.omega_q != 0.0 {
        out.push_str(&format!(" OmegaQ={} wQ={}", c.omega_q, c.w_q));
    }
    out.push('\n');
    out.push_str(&format!("Generated: {}\n", meta.generated.format("%Y-%m-%d %H:%M:%S UTC")));

    out
}

/// Result table, one line per bin. Failed bins show `-` in every σ column.
pub fn format_table(output: &BatchOutput) -> String {
    let mut out = String::new();

    let mut header = format!("{:>7} {:>6} {:>9}", "zmid", "dz", "cv_dm");
    for label in &output.labels {
        header.push_str(&format!(" {label:>9}"));
    }
    out.push_str(&header);
    out.push('\n');

    let rule_len = 7 + 1 + 6 + 1 + 9 + output.labels.len() * 10;
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');

    for outcome in &output.outcomes {
        let mut line = format!("{:>7.3} {:>6.3}", outcome.zmid(), outcome.dz());
        match outcome {
            BinOutcome::Ok(row) => {
                line.push_str(&format!(" {:>9.5}", row.cv_dm));
                for v in &row.cv {
                    line.push_str(&format!(" {v:>9.5}"));
                }
            }
            BinOutcome::Failed(_) => {
                for _ in 0..=output.labels.len() {
                    line.push_str(&format!(" {:>9}", "-"));
                }
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// List of failed bins with their errors; empty when every bin succeeded.
pub fn format_failures(output: &BatchOutput) -> String {
    let mut out = String::new();
    let failures: Vec<_> = output.failures().collect();
    if failures.is_empty() {
        return out;
    }

    out.push_str(&format!("Failed bins ({}):\n", failures.len()));
    for f in failures {
        out.push_str(&format!("- z={:.3} dz={:.3}: {}\n", f.zmid, f.dz, f.error));
    }
    out
}

/// One-slice summary for `cv quick`.
pub fn format_quick(geometry: &SurveyGeometry, za: f64, deltaz: f64, cv: &CosmicVariance) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Field {:.4} x {:.4} deg at z={za} (dz={deltaz})\n",
        geometry.side1_deg, geometry.side2_deg
    ));
    out.push_str(&format!(
        "Box: {:.3} x {:.3} x {:.3} Mpc\n",
        cv.sides.x, cv.sides.y, cv.sides.z
    ));
    out.push_str(&format!("Growth D(z): {:.6}\n", cv.growth));
    out.push_str(&format!("Integral: {:.6e}\n", cv.integral));
    out.push_str(&format!("cv_dm: {:.6}\n", cv.sigma));
    out.push_str(&format!("Time: {:.2}s\n", cv.elapsed.as_secs_f64()));
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
