//! Melt-pool geometry on a regular 2-D slice.
//!
//! The slice is expected to come out of a resampling step that already put the
//! field on a lattice (one value per `(x, y)` node). Measurements follow the
//! reference-line approach: width along the row nearest `y_reference`, depth
//! and bead height by walking rows away from it until a row has no melted cell.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("slice grid has no points")]
    Empty,
    #[error("slice grid is missing node ({x}, {y})")]
    MissingNode { x: f64, y: f64 },
    #[error("slice grid has duplicate node ({x}, {y})")]
    DuplicateNode { x: f64, y: f64 },
    #[error("expected {expected} values for a {nx}x{ny} grid, got {found}")]
    ShapeMismatch {
        nx: usize,
        ny: usize,
        expected: usize,
        found: usize,
    },
}

/// Regular lattice of one scalar field, stored row-major (`y` rows, `x` columns).
#[derive(Debug, Clone)]
pub struct SliceGrid {
    x: Vec<f64>,
    y: Vec<f64>,
    values: Vec<f64>,
}

impl SliceGrid {
    pub fn new(x: Vec<f64>, y: Vec<f64>, values: Vec<f64>) -> Result<Self, GridError> {
        if x.is_empty() || y.is_empty() {
            return Err(GridError::Empty);
        }
        let expected = x.len() * y.len();
        if values.len() != expected {
            return Err(GridError::ShapeMismatch {
                nx: x.len(),
                ny: y.len(),
                expected,
                found: values.len(),
            });
        }
        Ok(Self { x, y, values })
    }

    /// Rebuild the lattice from scattered `(x, y, value)` nodes.
    ///
    /// Coordinates closer than `tolerance` are treated as the same grid line.
    pub fn from_nodes(nodes: &[(f64, f64, f64)], tolerance: f64) -> Result<Self, GridError> {
        if nodes.is_empty() {
            return Err(GridError::Empty);
        }
        let x = unique_axis(nodes.iter().map(|n| n.0), tolerance);
        let y = unique_axis(nodes.iter().map(|n| n.1), tolerance);
        let mut values = vec![None; x.len() * y.len()];
        for &(nx, ny, v) in nodes {
            let col = nearest_index(&x, nx);
            let row = nearest_index(&y, ny);
            let slot = &mut values[row * x.len() + col];
            if slot.is_some() {
                return Err(GridError::DuplicateNode { x: nx, y: ny });
            }
            *slot = Some(v);
        }
        let mut filled = Vec::with_capacity(values.len());
        for (idx, v) in values.into_iter().enumerate() {
            match v {
                Some(v) => filled.push(v),
                None => {
                    return Err(GridError::MissingNode {
                        x: x[idx % x.len()],
                        y: y[idx / x.len()],
                    })
                }
            }
        }
        Self::new(x, y, filled)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let nx = self.x.len();
        &self.values[row * nx..(row + 1) * nx]
    }

    /// Values down one column, ordered by `y`.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.values
            .iter()
            .skip(col)
            .step_by(self.x.len())
            .copied()
            .collect()
    }

    pub fn nearest_row(&self, y: f64) -> usize {
        nearest_index(&self.y, y)
    }

    pub fn nearest_column(&self, x: f64) -> usize {
        nearest_index(&self.x, x)
    }

    pub fn max_value(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn spacing(axis: &[f64]) -> f64 {
        if axis.len() < 2 {
            0.0
        } else {
            axis[1] - axis[0]
        }
    }
}

fn unique_axis(coords: impl Iterator<Item = f64>, tolerance: f64) -> Vec<f64> {
    let mut all: Vec<f64> = coords.collect();
    all.sort_by(f64::total_cmp);
    let mut axis: Vec<f64> = Vec::new();
    for c in all {
        match axis.last() {
            Some(&last) if (c - last).abs() <= tolerance => {}
            _ => axis.push(c),
        }
    }
    axis
}

fn nearest_index(axis: &[f64], target: f64) -> usize {
    axis.iter()
        .enumerate()
        .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltPoolMeasurement {
    pub threshold: f64,
    /// Requested reference line.
    pub y_reference: f64,
    /// Grid row the reference snapped to.
    pub y_reference_actual: f64,
    pub width: f64,
    pub width_start_x: Option<f64>,
    pub width_end_x: Option<f64>,
    pub depth: f64,
    pub depth_end_y: f64,
    pub height: f64,
    pub height_end_y: f64,
    pub area: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub melted_cells: usize,
    pub max_value: f64,
}

pub fn measure_melt_pool(grid: &SliceGrid, y_reference: f64, threshold: f64) -> MeltPoolMeasurement {
    let x = grid.x();
    let y = grid.y();
    let ref_row = grid.nearest_row(y_reference);
    let row_melted = |row: usize| grid.row(row).iter().any(|&v| v > threshold);

    let mut span = None;
    for (col, &v) in grid.row(ref_row).iter().enumerate() {
        if v > threshold {
            span = Some(match span {
                None => (col, col),
                Some((first, _)) => (first, col),
            });
        }
    }
    let (width, width_start_x, width_end_x) = match span {
        Some((first, last)) => (x[last] - x[first], Some(x[first]), Some(x[last])),
        None => (0.0, None, None),
    };

    // Rows are stored with y ascending: depth walks toward higher rows, height toward lower.
    let depth_end_y = (ref_row..y.len())
        .find(|&row| !row_melted(row))
        .map(|row| y[row])
        .unwrap_or(y[y.len() - 1]);
    let height_end_y = (0..=ref_row)
        .rev()
        .find(|&row| !row_melted(row))
        .map(|row| y[row])
        .unwrap_or(y[0]);

    let mut melted_cells = 0usize;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for row in 0..y.len() {
        for (col, &v) in grid.row(row).iter().enumerate() {
            if v > threshold {
                melted_cells += 1;
                sum_x += x[col];
                sum_y += y[row];
            }
        }
    }
    let (center_x, center_y) = if melted_cells > 0 {
        (sum_x / melted_cells as f64, sum_y / melted_cells as f64)
    } else {
        (0.0, 0.0)
    };
    let area = melted_cells as f64 * SliceGrid::spacing(x) * SliceGrid::spacing(y);

    MeltPoolMeasurement {
        threshold,
        y_reference,
        y_reference_actual: y[ref_row],
        width,
        width_start_x,
        width_end_x,
        depth: (y_reference - depth_end_y).abs(),
        depth_end_y,
        height: (y_reference - height_end_y).abs(),
        height_end_y,
        area,
        center_x,
        center_y,
        melted_cells,
        max_value: grid.max_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 6x6 lattice at 1 unit spacing with a melted block covering x=1..=3, y=1..=3.
    fn block_grid() -> SliceGrid {
        let mut nodes = Vec::new();
        for yi in 0..6 {
            for xi in 0..6 {
                let melted = (1..=3).contains(&xi) && (1..=3).contains(&yi);
                nodes.push((xi as f64, yi as f64, if melted { 2000.0 } else { 0.0 }));
            }
        }
        SliceGrid::from_nodes(&nodes, 1e-9).unwrap()
    }

    #[test]
    fn measures_block_pool() {
        let grid = block_grid();
        let m = measure_melt_pool(&grid, 2.0, 1000.0);
        assert_eq!(m.y_reference_actual, 2.0);
        assert_eq!(m.width, 2.0);
        assert_eq!(m.width_start_x, Some(1.0));
        assert_eq!(m.width_end_x, Some(3.0));
        assert_eq!(m.depth_end_y, 4.0);
        assert_eq!(m.depth, 2.0);
        assert_eq!(m.height_end_y, 0.0);
        assert_eq!(m.height, 2.0);
        assert_eq!(m.melted_cells, 9);
        assert_eq!(m.area, 9.0);
        assert_eq!((m.center_x, m.center_y), (2.0, 2.0));
        assert_eq!(m.max_value, 2000.0);
    }

    #[test]
    fn reference_outside_pool_has_no_width() {
        let grid = block_grid();
        let m = measure_melt_pool(&grid, 5.0, 1000.0);
        assert_eq!(m.width, 0.0);
        assert!(m.width_start_x.is_none());
        assert_eq!(m.depth_end_y, 5.0);
        assert_eq!(m.height_end_y, 5.0);
        assert_eq!(m.height, 0.0);
    }

    #[test]
    fn fully_melted_column_runs_to_grid_edge() {
        let grid = SliceGrid::new(vec![0.0, 1.0], vec![0.0, 1.0, 2.0], vec![5.0; 6]).unwrap();
        let m = measure_melt_pool(&grid, 1.0, 1.0);
        assert_eq!(m.depth_end_y, 2.0);
        assert_eq!(m.height_end_y, 0.0);
    }

    #[test]
    fn column_walks_rows_in_y_order() {
        let grid = block_grid();
        let col = grid.nearest_column(2.2);
        assert_eq!(col, 2);
        assert_eq!(grid.column(col), vec![0.0, 2000.0, 2000.0, 2000.0, 0.0, 0.0]);
        assert_eq!(grid.nearest_row(-3.0), 0);
    }

    #[test]
    fn missing_node_is_reported() {
        let nodes = [(0.0, 0.0, 1.0), (1.0, 0.0, 1.0), (0.0, 1.0, 1.0)];
        assert_eq!(
            SliceGrid::from_nodes(&nodes, 1e-9).unwrap_err(),
            GridError::MissingNode { x: 1.0, y: 1.0 }
        );
    }

    #[test]
    fn duplicate_node_is_reported() {
        let nodes = [(0.0, 0.0, 1.0), (0.0, 0.0, 2.0)];
        assert!(matches!(
            SliceGrid::from_nodes(&nodes, 1e-9),
            Err(GridError::DuplicateNode { .. })
        ));
    }
}
