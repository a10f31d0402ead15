//! Command-line interface for the line extraction pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{ExtractorConfig, PipelineConfig};
use crate::processors::extraction::LineExtractor;

#[derive(Parser)]
#[command(name = "line-extractor")]
#[command(about = "Obstacle boundary extraction from 3D point clouds", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract line obstacles from a point cloud (PLY or CSV)
    Extract {
        /// Input point cloud file (.ply or .csv)
        input: PathBuf,
        /// Output CSV of fitted lines (defaults to <input>_lines.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Polynomial degree for the per-cluster fit
        #[arg(long)]
        degree: Option<usize>,
        /// Ridge regularization strength
        #[arg(long)]
        lambda: Option<f32>,
        /// DBSCAN neighborhood radius
        #[arg(long)]
        radius: Option<f32>,
        /// Minimum neighbours for a DBSCAN core point
        #[arg(long)]
        min_neighbours: Option<usize>,
        /// Also render clusters and fitted curves to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
        /// Also write clusters as a colored PLY to this path
        #[arg(long)]
        clusters_ply: Option<PathBuf>,
    },

    /// Run DBSCAN clustering only and write per-point labels
    Cluster {
        /// Input point cloud file (.ply or .csv)
        input: PathBuf,
        /// Output CSV of labeled points (defaults to <input>_labels.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// DBSCAN neighborhood radius
        #[arg(long)]
        radius: Option<f32>,
        /// Minimum neighbours for a DBSCAN core point
        #[arg(long)]
        min_neighbours: Option<usize>,
        /// Also render the labeled cloud to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Derive an output path from the input by appending a suffix to its stem.
fn default_output(input: &PathBuf, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let dir = input.parent().map(PathBuf::from).unwrap_or_default();
    dir.join(format!("{}{}", stem, suffix))
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            degree,
            lambda,
            radius,
            min_neighbours,
            plot,
            clusters_ply,
        } => {
            let extractor_config = ExtractorConfig {
                degree_poly: degree.unwrap_or(config.extractor.degree_poly),
                lambda: lambda.unwrap_or(config.extractor.lambda),
                min_neighbours: min_neighbours.unwrap_or(config.extractor.min_neighbours),
                radius: radius.unwrap_or(config.extractor.radius),
            };
            cmd_extract(&input, output, extractor_config, plot, clusters_ply, &config)
        }
        Commands::Cluster {
            input,
            output,
            radius,
            min_neighbours,
            plot,
        } => {
            let eff_radius = radius.unwrap_or(config.extractor.radius);
            let eff_min = min_neighbours.unwrap_or(config.extractor.min_neighbours);
            cmd_cluster(&input, output, eff_radius, eff_min, plot, &config)
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_extract(
    input: &PathBuf,
    output: Option<PathBuf>,
    extractor_config: ExtractorConfig,
    plot: Option<PathBuf>,
    clusters_ply: Option<PathBuf>,
    config: &PipelineConfig,
) -> Result<()> {
    use crate::core::{loaders, writers};
    use crate::visualization;

    let start = Instant::now();

    // Hyperparameters are checked before any data is touched.
    let extractor = LineExtractor::new(extractor_config).context("Invalid configuration")?;

    let output_path = output.unwrap_or_else(|| default_output(input, "_lines.csv"));

    println!("Extracting line obstacles...");
    println!("Input: {}", input.display());
    println!("Output: {}", output_path.display());
    println!("Parameters:");
    println!("  degree_poly: {}", extractor.config().degree_poly);
    println!("  lambda: {}", extractor.config().lambda);
    println!("  min_neighbours: {}", extractor.config().min_neighbours);
    println!("  radius: {}", extractor.config().radius);

    let spinner = create_spinner("Loading point cloud...");
    let loaded = loaders::load_point_cloud(input);
    spinner.finish_and_clear();
    let cloud =
        loaded.with_context(|| format!("Failed to load point cloud from {}", input.display()))?;

    let spinner = create_spinner("Clustering and fitting...");
    let extraction = extractor.extract(&cloud);
    spinner.finish_and_clear();

    writers::write_lines_csv(&output_path, &extraction.lines)
        .with_context(|| format!("Failed to write lines CSV to {}", output_path.display()))?;

    if let Some(ply_path) = &clusters_ply {
        let colored = visualization::colored_cluster_cloud(&extraction.clusters);
        writers::write_ply(ply_path, &colored)
            .with_context(|| format!("Failed to write cluster PLY to {}", ply_path.display()))?;
    }

    if let Some(plot_path) = &plot {
        if extraction.is_empty() {
            warn!("No clusters extracted; skipping plot");
        } else {
            visualization::plot_extraction(plot_path, &extraction, &config.visualization)
                .with_context(|| format!("Failed to render plot to {}", plot_path.display()))?;
        }
    }

    print_summary(
        "Line Extraction Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output CSV", output_path.display().to_string()),
            ("Points loaded", cloud.len().to_string()),
            ("Lines extracted", extraction.len().to_string()),
            ("degree_poly", extractor.config().degree_poly.to_string()),
            ("lambda", extractor.config().lambda.to_string()),
            ("radius", extractor.config().radius.to_string()),
            ("min_neighbours", extractor.config().min_neighbours.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_cluster(
    input: &PathBuf,
    output: Option<PathBuf>,
    radius: f32,
    min_neighbours: usize,
    plot: Option<PathBuf>,
    config: &PipelineConfig,
) -> Result<()> {
    use crate::core::{loaders, writers};
    use crate::processors::clustering;
    use crate::visualization;

    let start = Instant::now();

    let output_path = output.unwrap_or_else(|| default_output(input, "_labels.csv"));

    println!("Running DBSCAN clustering...");
    println!("Input: {}", input.display());
    println!("Output: {}", output_path.display());
    println!("Parameters:");
    println!("  radius: {}", radius);
    println!("  min_neighbours: {}", min_neighbours);

    let spinner = create_spinner("Loading point cloud...");
    let loaded = loaders::load_point_cloud(input);
    spinner.finish_and_clear();
    let cloud =
        loaded.with_context(|| format!("Failed to load point cloud from {}", input.display()))?;

    let spinner = create_spinner("Clustering point cloud...");
    let coords = cloud.to_planar_coords();
    let labels = clustering::dbscan_labels(&coords, radius, min_neighbours);
    spinner.finish_and_clear();

    writers::write_labeled_csv(&output_path, &cloud, &labels)
        .with_context(|| format!("Failed to write labels CSV to {}", output_path.display()))?;

    if let Some(plot_path) = &plot {
        visualization::plot_labeled_cloud(plot_path, &cloud, &labels, config.visualization.max_points)
            .with_context(|| format!("Failed to render plot to {}", plot_path.display()))?;
    }

    // Count clusters and noise
    let noise_count = labels.iter().filter(|&&l| l == clustering::NOISE).count();
    let cluster_count = labels.iter().copied().max().map_or(0, |m| (m + 1).max(0));

    print_summary(
        "Clustering Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output CSV", output_path.display().to_string()),
            ("Points processed", labels.len().to_string()),
            ("Clusters found", cluster_count.to_string()),
            ("Noise points", noise_count.to_string()),
            ("radius", radius.to_string()),
            ("min_neighbours", min_neighbours.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}
