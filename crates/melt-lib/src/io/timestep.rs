use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// A file that carries one timestep of simulation output.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestepFile {
    pub timestep: f64,
    pub path: PathBuf,
}

/// Parse the trailing numeric run of a file stem: `test_small_1500.csv` → 1500,
/// `run_12.5.csv` → 12.5. Returns `None` when the stem does not end in a number.
pub fn parse_timestep(file_name: &str) -> Option<f64> {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphabetic()) => {
            stem
        }
        _ => file_name,
    };
    let start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
        .last()
        .map(|(i, _)| i)?;
    let digits = stem[start..].trim_start_matches('.');
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List timestep files in `dir`, filtered by name prefix and extension, sorted by timestep.
pub fn discover_timestep_files(
    dir: &Path,
    prefix: Option<&str>,
    extensions: &[&str],
) -> Result<Vec<TimestepFile>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if !ext_ok || prefix.map(|p| !name.starts_with(p)).unwrap_or(false) {
            continue;
        }
        match parse_timestep(name) {
            Some(timestep) => files.push(TimestepFile {
                timestep,
                path: path.clone(),
            }),
            None => debug!("skipping {}: no timestep in file name", path.display()),
        }
    }
    files.sort_by(|a, b| {
        a.timestep
            .total_cmp(&b.timestep)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(files)
}
