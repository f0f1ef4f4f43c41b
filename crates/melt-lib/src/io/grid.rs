use crate::{io::series_csv::locate_column, metrics::melt_pool::SliceGrid};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Coordinates closer than this (metres) share a grid line.
pub const GRID_TOLERANCE: f64 = 1e-12;

/// Read a regular slice exported as `x,y,<value>` rows into a lattice.
pub fn read_slice_csv(path: &Path, value_col: &str) -> Result<SliceGrid> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_slice_from(file, value_col).with_context(|| format!("reading slice {}", path.display()))
}

pub fn read_slice_from<R: std::io::Read>(reader: R, value_col: &str) -> Result<SliceGrid> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let x_idx = locate_column(&headers, "x", "x coordinate")?;
    let y_idx = locate_column(&headers, "y", "y coordinate")?;
    let v_idx = locate_column(&headers, value_col, "slice value")?;

    let mut nodes = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let cell = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("");
            raw.parse::<f64>()
                .with_context(|| format!("row {} column {} is not f64: {:?}", row + 1, idx + 1, raw))
        };
        nodes.push((cell(x_idx)?, cell(y_idx)?, cell(v_idx)?));
    }
    Ok(SliceGrid::from_nodes(&nodes, GRID_TOLERANCE)?)
}
