use crate::{
    metrics::{
        melt::CrossingAnalysis,
        melt_pool::{MeltPoolMeasurement, SliceGrid},
    },
    signal::Series as SampleSeries,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub size: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
    /// Horizontal reference line across the whole x range.
    HLine { name: String, y: f64, style: Style },
    /// Shaded band between two x positions.
    Span {
        name: String,
        start: f64,
        end: f64,
        color: Color,
    },
}

impl Series {
    /// Points this series contributes to the axis ranges.
    pub fn extent_points(&self) -> Vec<[f64; 2]> {
        match self {
            Series::Line(line) => line.points.clone(),
            Series::Markers(markers) => markers.points.clone(),
            Series::HLine { .. } => Vec::new(),
            Series::Span { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over lines, markers and reference lines.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for s in &self.series {
            for p in s.extent_points() {
                xs.push(p[0]);
                ys.push(p[1]);
            }
            if let Series::HLine { y, .. } = s {
                ys.push(*y);
            }
        }
        if xs.is_empty() {
            return None;
        }
        let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
        let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min(&xs), max(&xs), min(&ys), max(&ys)))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        let sample = points[start];
        result.push(sample);
    }
    result
}

pub fn figure_from_series(title: &str, series: &SampleSeries, max_points: usize, color: u32) -> Figure {
    let points: Vec<[f64; 2]> = series.samples().iter().map(|s| [s.time, s.value]).collect();
    let decimated = decimate_points(&points, max_points);
    let mut fig = Figure::new(Some(title.into()));
    fig.add_series(Series::Line(LineSeries {
        name: title.into(),
        points: decimated,
        style: Style {
            width: 2.0,
            dash: None,
            color: Color(color),
        },
    }));
    fig
}

/// Value curve with the threshold line, crossing markers and shaded intervals.
pub fn figure_from_crossings(
    title: &str,
    series: &SampleSeries,
    analysis: &CrossingAnalysis,
    max_points: usize,
) -> Figure {
    let mut fig = figure_from_series(title, series, max_points, 0x1F4FD8);
    let threshold = analysis.threshold;
    fig.add_series(Series::HLine {
        name: format!("Threshold ({})", threshold),
        y: threshold,
        style: Style {
            width: 2.0,
            dash: Some([6.0, 4.0]),
            color: Color(0xD62728),
        },
    });
    let up = analysis.up_times();
    let down = analysis.down_times();
    fig.add_series(Series::Markers(MarkerSeries {
        name: format!("Up ({} points)", up.len()),
        points: up.iter().map(|&t| [t, threshold]).collect(),
        size: 5,
        color: Color(0x2CA02C),
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: format!("Down ({} points)", down.len()),
        points: down.iter().map(|&t| [t, threshold]).collect(),
        size: 5,
        color: Color(0xD62728),
    }));
    for iv in &analysis.intervals {
        fig.add_series(Series::Span {
            name: format!("Above threshold #{}", iv.sequence_number),
            start: iv.start_time,
            end: iv.end_time,
            color: Color(0xFF9900),
        });
    }
    fig
}

/// Width profile along the reference row and the vertical profile through the pool
/// centre, positions in millimetres, with the measured extents shaded.
pub fn figure_from_melt_pool(title: &str, grid: &SliceGrid, m: &MeltPoolMeasurement) -> Figure {
    const MM: f64 = 1e3;
    let ref_row = grid.nearest_row(m.y_reference);
    let center_col = grid.nearest_column(m.center_x);
    let mut fig = Figure::new(Some(title.into())).with_labels("Position (mm)", "Value");
    fig.add_series(Series::Line(LineSeries {
        name: format!("Width profile at Y = {:.3} mm", m.y_reference_actual * MM),
        points: grid
            .x()
            .iter()
            .zip(grid.row(ref_row))
            .map(|(&x, &v)| [x * MM, v])
            .collect(),
        style: Style {
            width: 2.0,
            dash: None,
            color: Color(0x1F4FD8),
        },
    }));
    fig.add_series(Series::Line(LineSeries {
        name: format!("Vertical profile at X = {:.3} mm", grid.x()[center_col] * MM),
        points: grid
            .y()
            .iter()
            .zip(grid.column(center_col))
            .map(|(&y, v)| [y * MM, v])
            .collect(),
        style: Style {
            width: 2.0,
            dash: None,
            color: Color(0x2CA02C),
        },
    }));
    fig.add_series(Series::HLine {
        name: format!("Threshold ({})", m.threshold),
        y: m.threshold,
        style: Style {
            width: 2.0,
            dash: Some([6.0, 4.0]),
            color: Color(0xD62728),
        },
    });
    fig.add_series(Series::Markers(MarkerSeries {
        name: "Reference line".into(),
        points: vec![[m.y_reference_actual * MM, m.threshold]],
        size: 6,
        color: Color(0x17BECF),
    }));
    if let (Some(start), Some(end)) = (m.width_start_x, m.width_end_x) {
        fig.add_series(Series::Span {
            name: format!("Width: {:.3} mm", m.width * MM),
            start: start * MM,
            end: end * MM,
            color: Color(0xD62728),
        });
    }
    let extents = [
        ("Depth", m.depth, m.depth_end_y, 0x2CA02C),
        ("Height", m.height, m.height_end_y, 0xFF9900),
    ];
    for (label, length, end_y, color) in extents {
        if length > 0.0 {
            fig.add_series(Series::Span {
                name: format!("{}: {:.3} mm", label, length * MM),
                start: m.y_reference.min(end_y) * MM,
                end: m.y_reference.max(end_y) * MM,
                color: Color(color),
            });
        }
    }
    fig
}
