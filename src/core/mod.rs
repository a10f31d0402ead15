//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{load_cartesian_csv, load_ply, load_point_cloud, LoaderError, PointCloud};
pub use writers::{write_labeled_csv, write_lines_csv, write_ply, WriteError};
