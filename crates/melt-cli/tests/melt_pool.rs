use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn close(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < 1e-9)
        .unwrap_or(false)
}

#[test]
fn melt_pool_measures_slice_and_writes_results() -> Result<(), Box<dyn Error>> {
    let out = tempdir()?;
    let mut cmd = cargo_bin_cmd!("melt");
    cmd.args([
        "melt-pool",
        "--input",
        &sample_path("test_data/slice_melt.csv"),
        "--out-dir",
        out.path().to_str().expect("utf-8 temp path"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: Value = serde_json::from_slice(&output)?;

    assert_eq!(report["source_file"].as_str(), Some("slice_melt.csv"));
    assert_eq!(report["field"].as_str(), Some("meltHistory"));
    assert_eq!(report["melted_cells"].as_u64(), Some(35));
    assert!(close(&report["width"], 4e-4));
    assert!(close(&report["depth"], 5e-4));
    assert!(close(&report["depth_end_y"], 2e-4));
    assert!(close(&report["height"], 3e-4));
    assert!(close(&report["height_end_y"], -6e-4));
    assert!(close(&report["area"], 35.0 * 1e-8));
    assert!(close(&report["center_x"], 0.0));

    assert!(out.path().join("slice_melt_results.json").is_file());
    let text = fs::read_to_string(out.path().join("slice_melt_results.txt"))?;
    assert!(text.contains("slice_melt.csv"));
    Ok(())
}

#[test]
fn melt_pool_renders_png_plot() -> Result<(), Box<dyn Error>> {
    let out = tempdir()?;
    let png = out.path().join("pool.png");
    cargo_bin_cmd!("melt")
        .args([
            "melt-pool",
            "--input",
            &sample_path("test_data/slice_melt.csv"),
            "--out-dir",
            out.path().to_str().expect("utf-8 temp path"),
            "--plot",
            png.to_str().expect("utf-8 temp path"),
        ])
        .assert()
        .success();
    assert!(fs::metadata(&png)?.len() > 0);
    Ok(())
}

#[test]
fn summary_report_aggregates_results() -> Result<(), Box<dyn Error>> {
    let out = tempdir()?;
    let out_dir = out.path().to_str().expect("utf-8 temp path").to_string();
    cargo_bin_cmd!("melt")
        .args([
            "melt-pool",
            "--input",
            &sample_path("test_data/slice_melt.csv"),
            "--out-dir",
            &out_dir,
            "--y-reference",
            "-0.0003",
        ])
        .assert()
        .success();

    let output = cargo_bin_cmd!("melt")
        .args(["summary-report", "--dir", &out_dir])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let printed = String::from_utf8(output)?;
    assert!(printed.trim().ends_with("analysis_summary.txt"));

    let summary = fs::read_to_string(out.path().join("analysis_summary.txt"))?;
    assert!(summary.contains("Total analyses: 1"));
    assert!(summary.contains("Width statistics (mm):"));
    assert!(summary.contains("Mean: 0.400"));
    Ok(())
}

#[test]
fn summary_report_fails_without_results() -> Result<(), Box<dyn Error>> {
    let empty = tempdir()?;
    cargo_bin_cmd!("melt")
        .args([
            "summary-report",
            "--dir",
            empty.path().to_str().expect("utf-8 temp path"),
        ])
        .assert()
        .failure();
    Ok(())
}

fn sample_path(relative: &str) -> String {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join(relative);
    root.to_string_lossy().to_string()
}
