//! Configuration types for the line extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised by hyperparameter validation.
///
/// An invalid configuration is a startup-time failure: it must be surfaced
/// before any frame is processed, and values are never silently clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("lambda must be finite and non-negative, got {0}")]
    InvalidLambda(f32),

    #[error("radius must be finite and positive, got {0}")]
    InvalidRadius(f32),

    #[error("min_neighbours must be at least 1, got {0}")]
    InvalidMinNeighbours(usize),
}

/// Hyperparameters for clustering and curve fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Degree of the polynomial fitted to each cluster.
    /// Non-negativity is enforced by the type.
    #[serde(default = "default_degree_poly")]
    pub degree_poly: usize,

    /// Ridge regularization strength for the polynomial fit.
    #[serde(default = "default_lambda")]
    pub lambda: f32,

    /// Minimum neighbours (the point itself included) within `radius`
    /// for a point to be a DBSCAN core point.
    #[serde(default = "default_min_neighbours")]
    pub min_neighbours: usize,

    /// DBSCAN neighbourhood radius in the x-y plane.
    #[serde(default = "default_radius")]
    pub radius: f32,
}

fn default_degree_poly() -> usize {
    1
}

fn default_lambda() -> f32 {
    0.01
}

fn default_min_neighbours() -> usize {
    3
}

fn default_radius() -> f32 {
    1.0
}

impl ExtractorConfig {
    /// Check all hyperparameters against their domain constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(ConfigError::InvalidLambda(self.lambda));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ConfigError::InvalidRadius(self.radius));
        }
        if self.min_neighbours < 1 {
            return Err(ConfigError::InvalidMinNeighbours(self.min_neighbours));
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            degree_poly: default_degree_poly(),
            lambda: default_lambda(),
            min_neighbours: default_min_neighbours(),
            radius: default_radius(),
        }
    }
}

/// Configuration for plot rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// X interval between adjacent samples when drawing a fitted curve.
    #[serde(default = "default_x_delta")]
    pub x_delta: f32,

    /// Maximum number of points to scatter-plot (subsamples if exceeded).
    #[serde(default = "default_plot_max_points")]
    pub max_points: usize,

    /// Alpha/transparency for scattered points.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

fn default_x_delta() -> f32 {
    0.1
}

fn default_plot_max_points() -> usize {
    1_000_000
}

fn default_alpha() -> f32 {
    0.8
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            x_delta: default_x_delta(),
            max_points: default_plot_max_points(),
            alpha: default_alpha(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub visualization: VisualizationConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extractor_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.degree_poly, 1);
        assert_eq!(config.min_neighbours, 3);
    }

    #[test]
    fn test_validate_rejects_negative_lambda() {
        let config = ExtractorConfig {
            lambda: -0.5,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidLambda(-0.5)));
    }

    #[test]
    fn test_validate_rejects_nan_lambda() {
        let config = ExtractorConfig {
            lambda: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLambda(_))
        ));
    }

    #[test]
    fn test_validate_rejects_nonpositive_radius() {
        let config = ExtractorConfig {
            radius: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRadius(0.0)));
    }

    #[test]
    fn test_validate_rejects_zero_min_neighbours() {
        let config = ExtractorConfig {
            min_neighbours: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMinNeighbours(0)));
    }

    #[test]
    fn test_validate_accepts_zero_lambda() {
        let config = ExtractorConfig {
            lambda: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.visualization.x_delta, 0.1);
        assert_eq!(config.extractor.radius, 1.0);
    }
}
