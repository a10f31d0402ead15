//! Line obstacle extraction pipeline.
//!
//! Ties the clusterer and the polynomial fitter together: one call to
//! [`LineExtractor::extract`] consumes one input frame (a point cloud),
//! clusters it, fits a curve per cluster, and returns the fitted line
//! obstacles alongside the surviving clusters for visualization.
//!
//! The extractor holds no state across frames. Hyperparameters are
//! validated once, at construction, and are immutable afterwards.

use log::{error, warn};

use crate::config::{ConfigError, ExtractorConfig};
use crate::core::loaders::PointCloud;
use crate::processors::clustering::cluster_cloud;
use crate::processors::regression::{fit_polynomial, FitError, Polynomial};

/// A fitted obstacle boundary: one polynomial per surviving cluster.
///
/// `x_min`/`x_max` span the originating cluster's points and bound where
/// the curve is meaningful; visualization samples the polynomial over this
/// interval.
#[derive(Debug, Clone)]
pub struct LineObstacle {
    /// Index of the originating cluster within [`Extraction::clusters`].
    pub cluster_index: usize,
    /// The fitted curve.
    pub polynomial: Polynomial,
    /// Minimum x coordinate over the cluster's points.
    pub x_min: f32,
    /// Maximum x coordinate over the cluster's points.
    pub x_max: f32,
}

/// Result of processing one frame.
///
/// `lines` and `clusters` are parallel sequences: `lines[i]` was fitted to
/// `clusters[i]`, and `lines[i].cluster_index == i`. Clusters whose fit
/// failed appear in neither; indices are renumbered contiguously after
/// skips so downstream consumers can index either sequence safely.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Fitted line obstacles, one per surviving cluster.
    pub lines: Vec<LineObstacle>,
    /// The surviving clusters, in the same order as `lines`.
    pub clusters: Vec<PointCloud>,
}

impl Extraction {
    /// Number of extracted line obstacles.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if no line obstacles were extracted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Drives clustering and fitting over input frames.
pub struct LineExtractor {
    config: ExtractorConfig,
}

impl LineExtractor {
    /// Create an extractor with validated hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any hyperparameter violates its domain
    /// constraint; this surfaces configuration problems before any frame
    /// is processed.
    pub fn new(config: ExtractorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The hyperparameters this extractor was built with.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract line obstacles from one frame.
    ///
    /// Clusters the cloud, then fits a polynomial of the configured degree
    /// to each cluster in discovery order. A cluster whose fit fails is
    /// skipped with a warning; the frame as a whole always produces a
    /// (possibly shorter) result. Surviving clusters are renumbered
    /// contiguously.
    pub fn extract(&self, cloud: &PointCloud) -> Extraction {
        let clusters = cluster_cloud(cloud, self.config.radius, self.config.min_neighbours);

        let mut extraction = Extraction::default();

        for (discovery_idx, cluster) in clusters.into_iter().enumerate() {
            let polynomial = match fit_polynomial(
                &cluster.x,
                &cluster.y,
                self.config.degree_poly,
                f64::from(self.config.lambda),
            ) {
                Ok(poly) => poly,
                Err(FitError::SingularSystem) => {
                    warn!(
                        "skipping cluster {} ({} points): singular fit for degree {} with lambda {}",
                        discovery_idx,
                        cluster.len(),
                        self.config.degree_poly,
                        self.config.lambda
                    );
                    continue;
                }
                Err(FitError::EmptyInput) => {
                    // Clustering never yields empty clusters.
                    error!("cluster {} was empty; clustering invariant violated", discovery_idx);
                    continue;
                }
            };

            let Some((x_min, x_max)) = cluster.x_range() else {
                continue;
            };

            extraction.lines.push(LineObstacle {
                cluster_index: extraction.clusters.len(),
                polynomial,
                x_min,
                x_max,
            });
            extraction.clusters.push(cluster);
        }

        extraction
    }
}
