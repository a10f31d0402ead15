//! Clustering, fitting, and extraction pipeline stages.

pub mod clustering;
pub mod extraction;
pub mod regression;

// Re-export key types for convenience
pub use clustering::{cluster_cloud, dbscan_labels, NOISE};
pub use extraction::{Extraction, LineExtractor, LineObstacle};
pub use regression::{fit_polynomial, FitError, Polynomial};
