//! Writers for extraction results.
//!
//! This module writes pipeline outputs to disk:
//! - ASCII PLY with RGB colors (cluster visualization exports)
//! - CSV of labeled points (x, y, z, cluster label)
//! - CSV of fitted line obstacles (index, x-range, coefficients)

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::loaders::PointCloud;
use crate::processors::extraction::LineObstacle;

/// Default color for points when no colors are specified (light gray).
const DEFAULT_COLOR: [u8; 3] = [180, 180, 180];

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Mismatched array lengths.
    #[error("length mismatch: cloud has {points_len} points, labels has {labels_len} entries")]
    LengthMismatch { points_len: usize, labels_len: usize },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Write a point cloud to an ASCII PLY file with RGB colors.
///
/// If the cloud has no colors, a default light gray is used for every
/// point.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `cloud` - Point cloud data with coordinates and optional colors
///
/// # Errors
///
/// Returns an error if parent directories cannot be created or the file
/// cannot be written.
pub fn write_ply(path: &Path, cloud: &PointCloud) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;

    let path_str = path.display().to_string();
    let write_err = |e: std::io::Error| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    };

    let header = [
        "ply".to_string(),
        "format ascii 1.0".to_string(),
        format!("element vertex {}", cloud.len()),
        "property float x".to_string(),
        "property float y".to_string(),
        "property float z".to_string(),
        "property uchar red".to_string(),
        "property uchar green".to_string(),
        "property uchar blue".to_string(),
        "end_header".to_string(),
    ];
    for line in &header {
        writeln!(writer, "{}", line).map_err(write_err)?;
    }

    for i in 0..cloud.len() {
        let [r, g, b] = cloud.colors.as_ref().map(|c| c[i]).unwrap_or(DEFAULT_COLOR);
        writeln!(
            writer,
            "{:.6} {:.6} {:.6} {} {} {}",
            cloud.x[i], cloud.y[i], cloud.z[i], r, g, b
        )
        .map_err(write_err)?;
    }

    writer.flush().map_err(write_err)?;

    Ok(())
}

/// Write labeled points to CSV with "x,y,z,label" columns.
///
/// Noise points carry label -1, clustered points their cluster index.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `cloud` - The input point cloud
/// * `labels` - One cluster label per point
///
/// # Errors
///
/// Returns an error if the lengths differ or the file cannot be written.
pub fn write_labeled_csv(path: &Path, cloud: &PointCloud, labels: &[i32]) -> Result<()> {
    if cloud.len() != labels.len() {
        return Err(WriteError::LengthMismatch {
            points_len: cloud.len(),
            labels_len: labels.len(),
        });
    }

    ensure_parent_dirs(path)?;
    let mut csv_writer = csv::Writer::from_writer(create_buffered_writer(path)?);
    let path_str = path.display().to_string();
    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record(["x", "y", "z", "label"])
        .map_err(csv_err)?;

    for (i, label) in labels.iter().enumerate() {
        csv_writer
            .write_record(&[
                format!("{:.6}", cloud.x[i]),
                format!("{:.6}", cloud.y[i]),
                format!("{:.6}", cloud.z[i]),
                label.to_string(),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write fitted line obstacles to CSV.
///
/// Columns are "cluster,x_min,x_max,degree,c0,c1,...": one row per line
/// obstacle, coefficients lowest-order first. When lines of different
/// degrees are mixed, shorter rows are padded with empty fields up to the
/// highest degree present.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `lines` - The fitted line obstacles
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_lines_csv(path: &Path, lines: &[LineObstacle]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut csv_writer = csv::Writer::from_writer(create_buffered_writer(path)?);
    let path_str = path.display().to_string();
    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    let max_degree = lines
        .iter()
        .map(|l| l.polynomial.degree())
        .max()
        .unwrap_or(0);

    let mut header = vec![
        "cluster".to_string(),
        "x_min".to_string(),
        "x_max".to_string(),
        "degree".to_string(),
    ];
    for j in 0..=max_degree {
        header.push(format!("c{}", j));
    }
    csv_writer.write_record(&header).map_err(csv_err)?;

    for line in lines {
        let mut record = vec![
            line.cluster_index.to_string(),
            format!("{:.6}", line.x_min),
            format!("{:.6}", line.x_max),
            line.polynomial.degree().to_string(),
        ];
        for j in 0..=max_degree {
            match line.polynomial.coefficients.get(j) {
                Some(c) => record.push(format!("{:.9}", c)),
                None => record.push(String::new()),
            }
        }
        csv_writer.write_record(&record).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::regression::Polynomial;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_cloud() -> PointCloud {
        PointCloud {
            x: vec![1.0, 2.0, 3.0],
            y: vec![4.0, 5.0, 6.0],
            z: vec![7.0, 8.0, 9.0],
            colors: None,
        }
    }

    #[test]
    fn test_write_ply_without_colors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.ply");

        write_ply(&path, &create_test_cloud()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "ply");
        assert_eq!(lines[2], "element vertex 3");
        assert_eq!(lines[9], "end_header");
        assert!(lines[10].contains("180 180 180"));
    }

    #[test]
    fn test_write_ply_with_colors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.ply");
        let cloud = PointCloud {
            x: vec![1.0, 2.0],
            y: vec![3.0, 4.0],
            z: vec![5.0, 6.0],
            colors: Some(vec![[255, 0, 0], [0, 255, 0]]),
        };

        write_ply(&path, &cloud).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert!(lines[10].contains("255 0 0"));
        assert!(lines[11].contains("0 255 0"));
    }

    #[test]
    fn test_write_ply_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subdir").join("nested").join("test.ply");

        write_ply(&path, &create_test_cloud()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_write_labeled_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let labels = vec![0i32, 1, -1];

        write_labeled_csv(&path, &create_test_cloud(), &labels).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "x,y,z,label");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with(",0"));
        assert!(lines[3].ends_with(",-1"));
    }

    #[test]
    fn test_write_labeled_csv_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let labels = vec![0i32];

        let result = write_labeled_csv(&path, &create_test_cloud(), &labels);

        match result.unwrap_err() {
            WriteError::LengthMismatch {
                points_len,
                labels_len,
            } => {
                assert_eq!(points_len, 3);
                assert_eq!(labels_len, 1);
            }
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_write_lines_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lines.csv");

        let lines = vec![
            LineObstacle {
                cluster_index: 0,
                polynomial: Polynomial {
                    coefficients: vec![1.0, 2.0],
                },
                x_min: 0.0,
                x_max: 2.0,
            },
            LineObstacle {
                cluster_index: 1,
                polynomial: Polynomial {
                    coefficients: vec![5.0, 0.0],
                },
                x_min: -1.0,
                x_max: 1.0,
            },
        ];

        write_lines_csv(&path, &lines).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().collect();

        assert_eq!(rows[0], "cluster,x_min,x_max,degree,c0,c1");
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("0,"));
        assert!(rows[2].starts_with("1,"));
    }

    #[test]
    fn test_write_lines_csv_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lines.csv");

        write_lines_csv(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1); // header only
    }
}
