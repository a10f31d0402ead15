//! Obstacle boundary extraction from 3D point clouds.
//!
//! This crate provides a perception pipeline for autonomous-vehicle
//! mapping:
//! - Loading point clouds from ASCII PLY and Cartesian CSV files
//! - DBSCAN clustering of point clouds into spatially coherent obstacles
//! - Ridge-regularized polynomial fitting of each cluster's boundary
//! - CSV/PLY export and PNG visualization of the results
//!
//! # Example
//!
//! ```no_run
//! use line_extractor::config::ExtractorConfig;
//! use line_extractor::core::loaders::load_ply;
//! use line_extractor::processors::extraction::LineExtractor;
//!
//! let cloud = load_ply("frame.ply").unwrap();
//! let extractor = LineExtractor::new(ExtractorConfig::default()).unwrap();
//! let extraction = extractor.extract(&cloud);
//! for line in &extraction.lines {
//!     println!("cluster {}: {:?}", line.cluster_index, line.polynomial);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{ConfigError, ExtractorConfig, PipelineConfig, VisualizationConfig};
pub use crate::core::loaders::PointCloud;
pub use processors::extraction::{Extraction, LineExtractor, LineObstacle};
pub use processors::regression::{FitError, Polynomial};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
