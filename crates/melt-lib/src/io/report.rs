use crate::metrics::melt_pool::MeltPoolMeasurement;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix shared by every per-slice result file.
pub const RESULTS_SUFFIX: &str = "_results.json";

/// A slice measurement together with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltPoolReport {
    pub source_file: String,
    pub source_path: PathBuf,
    pub field: String,
    pub file_size_mb: f64,
    pub file_modification_time: Option<String>,
    pub analysis_timestamp: String,
    #[serde(flatten)]
    pub measurement: MeltPoolMeasurement,
}

impl MeltPoolReport {
    pub fn new(source: &Path, field: &str, measurement: MeltPoolMeasurement) -> Self {
        let meta = fs::metadata(source).ok();
        let file_size_mb = meta
            .as_ref()
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);
        let file_modification_time = meta
            .and_then(|m| m.modified().ok())
            .map(|t| DateTime::<Local>::from(t).to_rfc3339());
        Self {
            source_file: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source_path: source.to_path_buf(),
            field: field.to_string(),
            file_size_mb,
            file_modification_time,
            analysis_timestamp: Local::now().to_rfc3339(),
            measurement,
        }
    }

    /// File stem with anything but alphanumerics, `-`, `_` and `.` dropped.
    pub fn safe_stem(&self) -> String {
        let stem = Path::new(&self.source_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "slice".into());
        stem.chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect()
    }
}

pub fn write_report_json(path: &Path, report: &MeltPoolReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

pub fn read_report_json(path: &Path) -> Result<MeltPoolReport> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Human-readable report; lengths in mm, area in mm².
pub fn render_report_text(report: &MeltPoolReport) -> String {
    let m = &report.measurement;
    let mut out = String::new();
    let _ = writeln!(out, "MELT POOL ANALYSIS RESULTS");
    let _ = writeln!(out, "==========================");
    let _ = writeln!(out, "File: {}", report.source_file);
    let _ = writeln!(out, "Full path: {}", report.source_path.display());
    let _ = writeln!(out, "Field used: {}", report.field);
    if let Some(modified) = &report.file_modification_time {
        let _ = writeln!(out, "File modified: {}", modified);
    }
    let _ = writeln!(out, "Analysis time: {}", report.analysis_timestamp);
    let _ = writeln!(out, "File size: {:.2} MB", report.file_size_mb);
    let _ = writeln!(out, "Reference line: Y = {:.3} mm", m.y_reference_actual * 1e3);
    let _ = writeln!(out, "Threshold: {}", m.threshold);
    let _ = writeln!(out);
    let _ = writeln!(out, "MEASUREMENTS:");
    let _ = writeln!(out, "Width: {:.3} mm", m.width * 1e3);
    let _ = writeln!(out, "Depth: {:.3} mm", m.depth * 1e3);
    let _ = writeln!(out, "Height: {:.3} mm", m.height * 1e3);
    let _ = writeln!(out, "Area: {:.3} mm²", m.area * 1e6);
    let _ = writeln!(out, "Center X: {:.3} mm", m.center_x * 1e3);
    let _ = writeln!(out, "Center Y: {:.3} mm", m.center_y * 1e3);
    let _ = writeln!(out, "Max value: {:.3}", m.max_value);
    let _ = writeln!(out, "Depth end Y: {:.3} mm", m.depth_end_y * 1e3);
    let _ = writeln!(out, "Height end Y: {:.3} mm", m.height_end_y * 1e3);
    out
}

/// Write `<stem>_results.json` and `<stem>_results.txt` into `out_dir`.
pub fn write_report_files(out_dir: &Path, report: &MeltPoolReport) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let stem = report.safe_stem();
    let json_path = out_dir.join(format!("{}{}", stem, RESULTS_SUFFIX));
    let txt_path = out_dir.join(format!("{}_results.txt", stem));
    write_report_json(&json_path, report)?;
    fs::write(&txt_path, render_report_text(report))
        .with_context(|| format!("writing {}", txt_path.display()))?;
    Ok((json_path, txt_path))
}

/// Mean, population standard deviation and range of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn spread(values: &[f64]) -> Option<Spread> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(Spread {
        mean,
        std: var.sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Load every result file in `dir`, sorted by file name. Unreadable files are skipped.
pub fn collect_reports(dir: &Path) -> Result<Vec<MeltPoolReport>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(RESULTS_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        match read_report_json(&path) {
            Ok(r) => reports.push(r),
            Err(e) => debug!("skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(reports)
}

/// Summary table plus statistics over positive widths, depths and heights (mm).
pub fn render_summary(reports: &[MeltPoolReport], generated: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "MELT POOL ANALYSIS SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out);
    let _ = writeln!(out, "Total analyses: {}", reports.len());
    let _ = writeln!(out, "Report generated: {}", generated);
    let _ = writeln!(out);
    let _ = writeln!(out, "INDIVIDUAL RESULTS:");
    let _ = writeln!(out, "{}", "-".repeat(95));
    let _ = writeln!(
        out,
        "{:<20} {:<25} {:<12} {:<12} {:<12} {:<12}",
        "Timestamp", "Source File", "Width(mm)", "Depth(mm)", "Height(mm)", "Area(mm²)"
    );
    let _ = writeln!(out, "{}", "-".repeat(95));
    for r in reports {
        let m = &r.measurement;
        let ts: String = r.analysis_timestamp.chars().take(19).collect();
        let _ = writeln!(
            out,
            "{:<20} {:<25} {:<12.3} {:<12.3} {:<12.3} {:<12.3}",
            if ts.is_empty() { "N/A".to_string() } else { ts },
            r.source_file,
            m.width * 1e3,
            m.depth * 1e3,
            m.height * 1e3,
            m.area * 1e6
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "=".repeat(60));

    let positive = |f: fn(&MeltPoolMeasurement) -> f64| -> Vec<f64> {
        reports
            .iter()
            .map(|r| f(&r.measurement) * 1e3)
            .filter(|v| *v > 0.0)
            .collect()
    };
    let sections: [(&str, Vec<f64>); 3] = [
        ("Width", positive(|m| m.width)),
        ("Depth", positive(|m| m.depth)),
        ("Height", positive(|m| m.height)),
    ];
    for (label, values) in sections {
        if let Some(s) = spread(&values) {
            let _ = writeln!(out, "{} statistics (mm):", label);
            let _ = writeln!(out, "  Mean: {:.3}", s.mean);
            let _ = writeln!(out, "  Std:  {:.3}", s.std);
            let _ = writeln!(out, "  Min:  {:.3}", s.min);
            let _ = writeln!(out, "  Max:  {:.3}", s.max);
            let _ = writeln!(out);
        }
    }
    out
}

/// Aggregate every result file in `dir` into `analysis_summary.txt`.
/// Returns `None` when there is nothing to summarize.
pub fn write_summary_report(dir: &Path) -> Result<Option<PathBuf>> {
    let reports = collect_reports(dir)?;
    if reports.is_empty() {
        return Ok(None);
    }
    let path = dir.join("analysis_summary.txt");
    fs::write(&path, render_summary(&reports, &Local::now().to_rfc3339()))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}
