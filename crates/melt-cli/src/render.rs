use anyhow::{anyhow, Result};
use melt_lib::plot::{Color as FigureColor, Figure, PlotBackend, Series as PlotSeries};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Writes each drawn figure to a PNG at `path`.
pub struct PngBackend {
    pub path: PathBuf,
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        draw_plotters_figure(&self.path, fig)
    }
}

fn rgb(color: FigureColor) -> RGBColor {
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

/// Render a figure to a PNG file.
pub fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = fig
        .bounds()
        .ok_or_else(|| anyhow!("figure has no data to draw"))?;
    let (x_min, x_max) = padded(x_min, x_max);
    let (y_min, y_max) = padded(y_min, y_max);

    let backend = BitMapBackend::new(path, (1200, 720));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    let mut mesh = chart.configure_mesh();
    if let Some(label) = &fig.x.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &fig.y.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw()?;

    // Spans first so curves stay visible on top of the shading.
    for series in &fig.series {
        if let PlotSeries::Span {
            start, end, color, ..
        } = series
        {
            let fill = rgb(*color).mix(0.3).filled();
            chart.draw_series(std::iter::once(Rectangle::new(
                [(*start, y_min), (*end, y_max)],
                fill,
            )))?;
        }
    }
    for series in &fig.series {
        match series {
            PlotSeries::Line(line) => {
                let color = rgb(line.style.color);
                let style = ShapeStyle::from(&color).stroke_width(line.style.width.round() as u32);
                chart
                    .draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        style,
                    ))?
                    .label(line.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            PlotSeries::Markers(markers) => {
                if markers.points.is_empty() {
                    continue;
                }
                let color = rgb(markers.color);
                let size = markers.size;
                chart
                    .draw_series(
                        markers
                            .points
                            .iter()
                            .map(move |p| Circle::new((p[0], p[1]), size, color.filled())),
                    )?
                    .label(markers.name.clone())
                    .legend(move |(x, y)| Circle::new((x + 10, y), size, color.filled()));
            }
            PlotSeries::HLine { name, y, style } => {
                let color = rgb(style.color);
                let shape = ShapeStyle::from(&color).stroke_width(style.width.round() as u32);
                chart
                    .draw_series(LineSeries::new(vec![(x_min, *y), (x_max, *y)], shape))?
                    .label(name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            PlotSeries::Span { .. } => {}
        }
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
