//! Point cloud container and file loaders.
//!
//! This module provides the [`PointCloud`] container used throughout the
//! pipeline, plus parsers for:
//! - Cartesian point cloud CSV files (x, y, z columns)
//! - ASCII PLY point cloud files (with optional RGB colors)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid PLY file: {0}")]
    InvalidPly(String),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Container for 3D point cloud data.
///
/// Points are stored as parallel coordinate vectors. Insertion order is
/// preserved and is the only source of determinism for the clustering
/// tie-breaks downstream, so it must not be perturbed.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    /// X coordinates of all points.
    pub x: Vec<f32>,
    /// Y coordinates of all points.
    pub y: Vec<f32>,
    /// Z coordinates of all points.
    pub z: Vec<f32>,
    /// Optional RGB colors for each point.
    pub colors: Option<Vec<[u8; 3]>>,
}

impl PointCloud {
    /// Creates a new empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new point cloud from coordinate vectors.
    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        Self {
            x,
            y,
            z,
            colors: None,
        }
    }

    /// Creates a new point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            colors: None,
        }
    }

    /// Returns the number of points in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Adds a point to the cloud.
    #[inline]
    pub fn push(&mut self, x: f32, y: f32, z: f32) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    /// Returns the planar (x, y) projection of point `i`.
    #[inline]
    pub fn xy(&self, i: usize) -> [f32; 2] {
        [self.x[i], self.y[i]]
    }

    /// Converts the cloud to a vector of planar [x, y] coordinate arrays.
    pub fn to_planar_coords(&self) -> Vec<[f32; 2]> {
        let n = self.len();
        let mut coords = Vec::with_capacity(n);
        for i in 0..n {
            coords.push([self.x[i], self.y[i]]);
        }
        coords
    }

    /// Builds a new cloud from the points at the given indices, in the
    /// order the indices are supplied.
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        let mut out = PointCloud::with_capacity(indices.len());
        for &i in indices {
            out.push(self.x[i], self.y[i], self.z[i]);
        }
        out
    }

    /// Minimum and maximum x coordinate across all points, or `None` if
    /// the cloud is empty.
    pub fn x_range(&self) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        let mut x_min = self.x[0];
        let mut x_max = self.x[0];
        for &x in &self.x[1..] {
            if x < x_min {
                x_min = x;
            }
            if x > x_max {
                x_max = x;
            }
        }
        Some((x_min, x_max))
    }
}

/// Load a Cartesian point cloud from a CSV file with x, y, z columns.
///
/// The CSV should have a header row with column names. The function will
/// look for columns named 'x', 'y', 'z' (case-insensitive), or fall back
/// to using the first three columns.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
///
/// # Returns
///
/// A `PointCloud` containing the x, y, z coordinates.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains no points.
pub fn load_cartesian_csv<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    // Get headers and map to lowercase
    let headers = reader.headers()?.clone();
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect();

    // Find x, y, z column indices
    let x_idx = col_map.get("x").copied().unwrap_or(0);
    let y_idx = col_map.get("y").copied().unwrap_or(1);
    let z_idx = col_map.get("z").copied().unwrap_or(2);

    let mut cloud = PointCloud::with_capacity(10_000);

    for result in reader.records() {
        let record = result?;

        let x: f32 = record.get(x_idx).and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let y: f32 = record.get(y_idx).and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let z: f32 = record.get(z_idx).and_then(|s| s.parse().ok()).unwrap_or(0.0);

        cloud.push(x, y, z);
    }

    if cloud.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(cloud)
}

/// Load a point cloud from an ASCII PLY file.
///
/// Supports PLY files with vertex elements containing:
/// - Required: x, y, z properties
/// - Optional: red, green, blue color properties
///
/// # Arguments
///
/// * `path` - Path to the PLY file
///
/// # Returns
///
/// A `PointCloud` with coordinates and optional colors.
///
/// # Errors
///
/// Returns an error if the file is not a valid PLY or lacks required properties.
pub fn load_ply<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    // Check PLY magic number
    let first_line = lines
        .next()
        .ok_or_else(|| LoaderError::InvalidPly("Empty file".to_string()))??;

    if !first_line.trim().starts_with("ply") {
        return Err(LoaderError::InvalidPly(format!(
            "{} is not a PLY file",
            path.display()
        )));
    }

    // Parse header
    let mut num_vertices: Option<usize> = None;
    let mut prop_names: Vec<String> = Vec::new();
    let mut header_done = false;

    for line in &mut lines {
        let line = line?;
        let stripped = line.trim();

        if stripped.starts_with("element vertex") {
            let parts: Vec<&str> = stripped.split_whitespace().collect();
            if let Some(count_str) = parts.last() {
                num_vertices = count_str.parse().ok();
            }
        } else if stripped.starts_with("property") {
            let parts: Vec<&str> = stripped.split_whitespace().collect();
            if let Some(name) = parts.last() {
                prop_names.push(name.to_string());
            }
        } else if stripped == "end_header" {
            header_done = true;
            break;
        }
    }

    let num_vertices = num_vertices
        .ok_or_else(|| LoaderError::InvalidPly("No vertex count in header".to_string()))?;

    if !header_done {
        return Err(LoaderError::InvalidPly("Missing end_header".to_string()));
    }

    // Build property index map
    let prop_idx: HashMap<&str, usize> = prop_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    // Verify required properties
    let x_idx = prop_idx
        .get("x")
        .copied()
        .ok_or_else(|| LoaderError::MissingColumns("x".to_string()))?;
    let y_idx = prop_idx
        .get("y")
        .copied()
        .ok_or_else(|| LoaderError::MissingColumns("y".to_string()))?;
    let z_idx = prop_idx
        .get("z")
        .copied()
        .ok_or_else(|| LoaderError::MissingColumns("z".to_string()))?;

    // Check for color properties
    let has_colors = prop_idx.contains_key("red")
        && prop_idx.contains_key("green")
        && prop_idx.contains_key("blue");

    let (r_idx, g_idx, b_idx) = if has_colors {
        (prop_idx["red"], prop_idx["green"], prop_idx["blue"])
    } else {
        (0, 0, 0)
    };

    let mut cloud = PointCloud::with_capacity(num_vertices);
    let mut colors_vec = if has_colors {
        Vec::with_capacity(num_vertices)
    } else {
        Vec::new()
    };

    // Parse vertex data
    let mut vertex_count = 0;
    for line in lines {
        if vertex_count >= num_vertices {
            break;
        }

        let line = line?;
        let values: Vec<&str> = line.split_whitespace().collect();

        if values.len() < prop_names.len() {
            continue;
        }

        let x: f32 = values[x_idx]
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid x value: {}", values[x_idx])))?;
        let y: f32 = values[y_idx]
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid y value: {}", values[y_idx])))?;
        let z: f32 = values[z_idx]
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid z value: {}", values[z_idx])))?;

        cloud.push(x, y, z);

        if has_colors {
            let r: u8 = values[r_idx].parse().unwrap_or(180);
            let g: u8 = values[g_idx].parse().unwrap_or(180);
            let b: u8 = values[b_idx].parse().unwrap_or(180);
            colors_vec.push([r, g, b]);
        }

        vertex_count += 1;
    }

    if vertex_count < num_vertices {
        return Err(LoaderError::InvalidPly(format!(
            "Expected {} vertices, found {}",
            num_vertices, vertex_count
        )));
    }

    if has_colors {
        cloud.colors = Some(colors_vec);
    }

    Ok(cloud)
}

/// Load a point cloud from a file, dispatching on its extension.
///
/// `.ply` files go through [`load_ply`], `.csv` files through
/// [`load_cartesian_csv`].
///
/// # Errors
///
/// Returns `LoaderError::UnsupportedExtension` for any other extension,
/// or the underlying loader's error.
pub fn load_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ply") => load_ply(path),
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_cartesian_csv(path),
        _ => Err(LoaderError::UnsupportedExtension(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_point_cloud_operations() {
        let mut cloud = PointCloud::new();
        assert!(cloud.is_empty());
        assert_eq!(cloud.len(), 0);

        cloud.push(1.0, 2.0, 3.0);
        cloud.push(4.0, 5.0, 6.0);

        assert_eq!(cloud.len(), 2);
        assert!(!cloud.is_empty());

        let coords = cloud.to_planar_coords();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0], [1.0, 2.0]);
        assert_eq!(coords[1], [4.0, 5.0]);
        assert_eq!(cloud.xy(1), [4.0, 5.0]);
    }

    #[test]
    fn test_point_cloud_select_preserves_order() {
        let mut cloud = PointCloud::new();
        cloud.push(0.0, 0.0, 0.0);
        cloud.push(1.0, 1.0, 1.0);
        cloud.push(2.0, 2.0, 2.0);

        let sub = cloud.select(&[0, 2]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.x, vec![0.0, 2.0]);
        assert_eq!(sub.z, vec![0.0, 2.0]);
    }

    #[test]
    fn test_x_range() {
        let mut cloud = PointCloud::new();
        assert!(cloud.x_range().is_none());

        cloud.push(3.0, 0.0, 0.0);
        cloud.push(-1.0, 0.0, 0.0);
        cloud.push(2.0, 0.0, 0.0);

        assert_eq!(cloud.x_range(), Some((-1.0, 3.0)));
    }

    #[test]
    fn test_load_cartesian_csv() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y,z").unwrap();
        writeln!(file, "1.0,2.0,3.0").unwrap();
        writeln!(file, "4.0,5.0,6.0").unwrap();
        file.flush().unwrap();

        let cloud = load_cartesian_csv(file.path())?;
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.x[0], 1.0);
        assert_eq!(cloud.y[0], 2.0);
        assert_eq!(cloud.z[0], 3.0);

        Ok(())
    }

    #[test]
    fn test_load_cartesian_csv_empty() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y,z").unwrap();
        file.flush().unwrap();

        let result = load_cartesian_csv(file.path());
        assert!(matches!(result, Err(LoaderError::EmptyFile(_))));
    }

    #[test]
    fn test_load_ply() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ply").unwrap();
        writeln!(file, "format ascii 1.0").unwrap();
        writeln!(file, "element vertex 2").unwrap();
        writeln!(file, "property float x").unwrap();
        writeln!(file, "property float y").unwrap();
        writeln!(file, "property float z").unwrap();
        writeln!(file, "property uchar red").unwrap();
        writeln!(file, "property uchar green").unwrap();
        writeln!(file, "property uchar blue").unwrap();
        writeln!(file, "end_header").unwrap();
        writeln!(file, "1.0 2.0 3.0 255 0 0").unwrap();
        writeln!(file, "4.0 5.0 6.0 0 255 0").unwrap();
        file.flush().unwrap();

        let cloud = load_ply(file.path())?;
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.x[0], 1.0);
        assert_eq!(cloud.y[1], 5.0);

        let colors = cloud.colors.unwrap();
        assert_eq!(colors[0], [255, 0, 0]);
        assert_eq!(colors[1], [0, 255, 0]);

        Ok(())
    }

    #[test]
    fn test_load_ply_rejects_non_ply() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not a ply file").unwrap();
        file.flush().unwrap();

        let result = load_ply(file.path());
        assert!(matches!(result, Err(LoaderError::InvalidPly(_))));
    }

    #[test]
    fn test_load_point_cloud_unsupported_extension() {
        let result = load_point_cloud(Path::new("points.txt"));
        assert!(matches!(result, Err(LoaderError::UnsupportedExtension(_))));
    }
}
