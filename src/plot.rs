use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::dists::Dists;
use crate::histogram::Histogram;

pub const DEFAULT_BINS: usize = 128;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("failed to prepare drawing area: {0}")]
    DrawingArea(String),

    #[error("failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("failed to draw chart elements: {0}")]
    Drawing(String),
}

type Result<T> = std::result::Result<T, PlotError>;

#[derive(Debug, Copy, Clone)]
pub struct PlotOptions {
    pub bins: usize,
    pub width: u32,
    pub height: u32,
    /// Captions and axis labels need system fonts; turn them off for headless use.
    pub labels: bool,
}

impl Default for PlotOptions {
    fn default() -> PlotOptions {
        return PlotOptions {
            bins: DEFAULT_BINS,
            width: 1000,
            height: 1600,
            labels: true,
        };
    }
}

/// Unit vectors scatter over the top two of five slots, then one histogram each
/// for `uniform`, `normalBM` and `normalMP`.
pub fn render_dists(dists: &Dists, output_path: &Path, options: PlotOptions) -> Result<()> {
    let root = BitMapBackend::new(output_path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let slot = options.height / 5;
    let (sphere_area, rest) = root.split_vertically(slot * 2);
    let histogram_areas = rest.split_evenly((3, 1));

    draw_sphere(&sphere_area, &dists.unit_vec, options.labels)?;

    let series = [
        ("uniform", &dists.uniform, BLUE),
        ("normalBM", &dists.normal_bm, RED),
        ("normalMP", &dists.normal_mp, GREEN),
    ];
    for (area, (label, samples, color)) in histogram_areas.iter().zip(series.iter()) {
        let hist = Histogram::from_samples(samples, options.bins);
        draw_histogram(area, label, &hist, color, options.labels)?;
    }

    root.present()
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;
    info!(path = %output_path.display(), "dists plot saved");
    return Ok(());
}

fn draw_sphere<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    points: &[[f64; 3]],
    labels: bool,
) -> Result<()> {
    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if labels {
        builder.caption(format!("unitVec ({} samples)", points.len()), ("sans-serif", 24));
    }
    let mut chart = builder
        .build_cartesian_3d(-1.0..1.0, -1.0..1.0, -1.0..1.0)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    if labels {
        chart
            .configure_axes()
            .light_grid_style(BLACK.mix(0.1))
            .max_light_lines(4)
            .draw()
            .map_err(|e| PlotError::ChartConfig(e.to_string()))?;
    }

    chart
        .draw_series(
            points
                .iter()
                .map(|&[x, y, z]| Circle::new((x, y, z), 1, BLACK.filled())),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    return Ok(());
}

fn draw_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    label: &str,
    hist: &Histogram,
    color: &RGBColor,
    labels: bool,
) -> Result<()> {
    let x_range = hist.range();
    let y_max = (hist.max_count() as f64 * 1.05).max(1.0);

    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if labels {
        builder
            .caption(format!("{} ({} samples)", label, hist.total()), ("sans-serif", 20))
            .x_label_area_size(30)
            .y_label_area_size(50);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, 0.0..y_max)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    if labels {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .draw()
            .map_err(|e| PlotError::ChartConfig(e.to_string()))?;
    }

    let style = color.mix(0.8).filled();
    chart
        .draw_series(hist.bins().iter().enumerate().map(|(i, &count)| {
            let bin = hist.bin_range(i);
            Rectangle::new([(bin.start, 0.0), (bin.end, count as f64)], style)
        }))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    return Ok(());
}
