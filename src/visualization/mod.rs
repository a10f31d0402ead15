//! Visualization tools for extraction results.
//!
//! This module renders clustering and line-fitting results as 2D plots
//! using the plotters library: clusters as colored scatter points, fitted
//! polynomials as curves sampled at a configurable x interval over each
//! cluster's x-range.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::VisualizationConfig;
use crate::core::loaders::PointCloud;
use crate::processors::extraction::{Extraction, LineObstacle};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Empty point cloud")]
    EmptyPointCloud,

    #[error("Curve sample interval must be positive, got {0}")]
    InvalidSampleInterval(f32),
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
const DEFAULT_WIDTH: u32 = 1920;

/// Default plot height in pixels.
const DEFAULT_HEIGHT: u32 = 1080;

/// Color palette for cluster visualization.
const CLUSTER_COLORS: &[(u8, u8, u8)] = &[
    (228, 26, 28),   // Red
    (55, 126, 184),  // Blue
    (77, 175, 74),   // Green
    (152, 78, 163),  // Purple
    (255, 127, 0),   // Orange
    (255, 255, 51),  // Yellow
    (166, 86, 40),   // Brown
    (247, 129, 191), // Pink
    (153, 153, 153), // Gray
    (0, 206, 209),   // Turquoise
    (138, 43, 226),  // Blue Violet
    (50, 205, 50),   // Lime Green
    (255, 20, 147),  // Deep Pink
    (0, 191, 255),   // Deep Sky Blue
    (255, 215, 0),   // Gold
];

/// Noise color (gray) for unclustered points (label = -1).
const NOISE_COLOR: (u8, u8, u8) = (128, 128, 128);

/// Color assigned to cluster `index`, cycling through the palette.
pub fn cluster_color(index: usize) -> [u8; 3] {
    let (r, g, b) = CLUSTER_COLORS[index % CLUSTER_COLORS.len()];
    [r, g, b]
}

/// Merge clusters into a single cloud with one palette color per cluster.
///
/// Useful for exporting clustering results as a colored PLY.
pub fn colored_cluster_cloud(clusters: &[PointCloud]) -> PointCloud {
    let total: usize = clusters.iter().map(|c| c.len()).sum();
    let mut merged = PointCloud::with_capacity(total);
    let mut colors = Vec::with_capacity(total);

    for (idx, cluster) in clusters.iter().enumerate() {
        let color = cluster_color(idx);
        for i in 0..cluster.len() {
            merged.push(cluster.x[i], cluster.y[i], cluster.z[i]);
            colors.push(color);
        }
    }

    merged.colors = Some(colors);
    merged
}

/// Plot a labeled point cloud, colored by cluster, and save as PNG.
///
/// Noise points (label -1) are drawn gray.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `cloud` - The input point cloud
/// * `labels` - One cluster label per point
/// * `max_points` - Maximum number of points to plot (subsamples if exceeded)
pub fn plot_labeled_cloud(
    output_path: &Path,
    cloud: &PointCloud,
    labels: &[i32],
    max_points: usize,
) -> Result<()> {
    if cloud.is_empty() {
        return Err(VisualizationError::EmptyPointCloud);
    }

    let n = cloud.len();
    let step = if n > max_points { n / max_points } else { 1 };

    let mut points: Vec<(f32, f32, RGBAColor)> = Vec::with_capacity(n.min(max_points));
    for i in (0..n).step_by(step) {
        let label = labels[i];
        let (r, g, b) = if label < 0 {
            NOISE_COLOR
        } else {
            let [r, g, b] = cluster_color(label as usize);
            (r, g, b)
        };
        points.push((cloud.x[i], cloud.y[i], RGBAColor(r, g, b, 1.0)));
    }

    let (x_min, x_max, y_min, y_max) =
        compute_bounds(points.iter().map(|&(x, y, _)| (x, y)));

    draw_scatter(output_path, &points, (x_min, x_max, y_min, y_max), &[])
}

/// Plot an extraction result: clusters as scatter points, fitted curves as
/// lines sampled every `config.x_delta` over each cluster's x-range.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `extraction` - Extraction result with parallel lines/clusters
/// * `config` - Visualization parameters (sample interval, subsampling)
///
/// # Errors
///
/// Fails if the extraction has no clusters or the sample interval is not
/// positive.
pub fn plot_extraction(
    output_path: &Path,
    extraction: &Extraction,
    config: &VisualizationConfig,
) -> Result<()> {
    if extraction.is_empty() {
        return Err(VisualizationError::EmptyPointCloud);
    }
    if !(config.x_delta > 0.0) {
        return Err(VisualizationError::InvalidSampleInterval(config.x_delta));
    }

    // Scatter points, colored by cluster
    let total: usize = extraction.clusters.iter().map(|c| c.len()).sum();
    let step = if total > config.max_points {
        total / config.max_points
    } else {
        1
    };
    let alpha = f64::from(config.alpha.clamp(0.0, 1.0));

    let mut points: Vec<(f32, f32, RGBAColor)> = Vec::with_capacity(total.min(config.max_points));
    for (idx, cluster) in extraction.clusters.iter().enumerate() {
        let [r, g, b] = cluster_color(idx);
        let color = RGBAColor(r, g, b, alpha);
        for i in (0..cluster.len()).step_by(step) {
            points.push((cluster.x[i], cluster.y[i], color));
        }
    }

    // Sampled curves
    let mut curves: Vec<(Vec<(f32, f32)>, RGBColor)> = Vec::with_capacity(extraction.len());
    for line in &extraction.lines {
        let [r, g, b] = cluster_color(line.cluster_index);
        let samples = sample_curve(line, config.x_delta);
        curves.push((samples, RGBColor(r, g, b)));
    }

    let bounds = compute_bounds(
        points
            .iter()
            .map(|&(x, y, _)| (x, y))
            .chain(curves.iter().flat_map(|(s, _)| s.iter().copied())),
    );

    draw_scatter(output_path, &points, bounds, &curves)
}

/// Sample a fitted curve at `x_delta` intervals over its x-range.
///
/// Both endpoints are always included.
fn sample_curve(line: &LineObstacle, x_delta: f32) -> Vec<(f32, f32)> {
    let mut samples = Vec::new();
    let mut x = line.x_min;
    while x < line.x_max {
        samples.push((x, line.polynomial.eval(f64::from(x)) as f32));
        x += x_delta;
    }
    samples.push((line.x_max, line.polynomial.eval(f64::from(line.x_max)) as f32));
    samples
}

/// Render scatter points plus optional curve overlays to a PNG.
fn draw_scatter(
    output_path: &Path,
    points: &[(f32, f32, RGBAColor)],
    bounds: (f32, f32, f32, f32),
    curves: &[(Vec<(f32, f32)>, RGBColor)],
) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = bounds;
    let x_padding = (x_max - x_min) * 0.05;
    let y_padding = (y_max - y_min) * 0.05;

    let root =
        BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();

    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(
            (x_min - x_padding)..(x_max + x_padding),
            (y_min - y_padding)..(y_max + y_padding),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y, color)| Circle::new((*x, *y), 2, color.filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    for (samples, color) in curves {
        chart
            .draw_series(LineSeries::new(samples.iter().copied(), color.stroke_width(2)))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
    }

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Compute the bounds (min/max) for x and y coordinates.
///
/// Degenerate (zero-width) ranges are widened so the chart always has a
/// valid drawing area.
fn compute_bounds(points: impl Iterator<Item = (f32, f32)>) -> (f32, f32, f32, f32) {
    let mut x_min = f32::MAX;
    let mut x_max = f32::MIN;
    let mut y_min = f32::MAX;
    let mut y_max = f32::MIN;

    for (x, y) in points {
        if x < x_min {
            x_min = x;
        }
        if x > x_max {
            x_max = x;
        }
        if y < y_min {
            y_min = y;
        }
        if y > y_max {
            y_max = y;
        }
    }

    if (x_max - x_min).abs() < f32::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f32::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (x_min, x_max, y_min, y_max)
}
