//! DBSCAN clustering for obstacle point clouds.
//!
//! This module partitions a point cloud into density-connected clusters
//! using:
//! - `kiddo` KD-tree for fast planar radius queries
//! - `rayon` for parallel neighbor finding
//! - a sequential, input-ordered expansion phase that makes cluster
//!   discovery and border-point assignment deterministic
//!
//! Distance is measured in the (x, y) plane only; the z coordinate is
//! carried through to the output clusters but ignored by the metric.
//! Neighborhoods are inclusive: a point at exactly `radius` counts, and a
//! point's neighborhood always contains the point itself.
//!
//! # Example
//!
//! ```no_run
//! use line_extractor::processors::clustering::dbscan_labels;
//!
//! let coords = vec![[0.0f32, 0.0], [1.0, 0.0], [100.0, 100.0]];
//! let labels = dbscan_labels(&coords, 1.5, 2);
//! assert_eq!(labels[2], -1); // isolated point is noise
//! ```

use std::collections::VecDeque;

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use rayon::prelude::*;

use crate::core::loaders::PointCloud;

/// Label assigned to points that belong to no cluster.
pub const NOISE: i32 = -1;

/// Compute the inclusive radius neighborhood of every point.
///
/// Builds a KD-tree over the planar coordinates and queries it in parallel.
/// Each returned list contains the index of the point itself and is sorted
/// by point index, so the result is reproducible bit-for-bit for a given
/// input order.
fn neighborhoods(coords: &[[f32; 2]], radius: f32) -> Vec<Vec<usize>> {
    let tree: ImmutableKdTree<f32, 2> = ImmutableKdTree::new_from_slice(coords);
    let radius_sq = radius * radius;

    // Query with a slightly inflated bound; the inclusive `<=` test below
    // is what defines the boundary convention, not the tree's.
    let query_sq = radius_sq * (1.0 + 4.0 * f32::EPSILON);

    coords
        .par_iter()
        .map(|coord| {
            let mut indices: Vec<usize> = tree
                .within::<SquaredEuclidean>(coord, query_sq)
                .iter()
                .filter(|nn| nn.distance <= radius_sq)
                .map(|nn| nn.item as usize)
                .collect();
            indices.sort_unstable();
            indices
        })
        .collect()
}

/// DBSCAN clustering over planar coordinates.
///
/// A point is a *core point* if at least `min_neighbours` points (itself
/// included) lie within `radius` of it. Clusters are grown from each
/// unvisited core point in input order by frontier expansion: every point
/// within `radius` of a core point in the cluster joins it, and core
/// members keep propagating the expansion. A non-core point adjacent to a
/// core point joins as a *border point* but does not propagate.
///
/// Border points reachable from more than one cluster are assigned to the
/// cluster that visits them first. Because seeds are taken in input order
/// and expansion is sequential, this "first discovery wins" rule is the
/// defined tie-break, not an accident of traversal.
///
/// # Arguments
///
/// * `coords` - Planar [x, y] coordinates, one per point
/// * `radius` - Neighborhood radius (inclusive)
/// * `min_neighbours` - Minimum neighborhood size for a core point
///
/// # Returns
///
/// One label per point: cluster ids numbered from 0 in discovery order, or
/// [`NOISE`] for points that are density-unreachable. Clustering is total:
/// any finite input yields a label vector, never an error.
pub fn dbscan_labels(coords: &[[f32; 2]], radius: f32, min_neighbours: usize) -> Vec<i32> {
    let n = coords.len();
    if n == 0 {
        return Vec::new();
    }

    // Phase 1: parallel neighbor queries (deterministic, order-independent).
    let neighbors = neighborhoods(coords, radius);

    // Phase 2: sequential seed-order expansion. This phase must stay
    // single-threaded: the first cluster to reach a border point owns it.
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_cluster: i32 = 0;
    let mut frontier: VecDeque<usize> = VecDeque::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        // Non-core seeds stay noise for now; a later cluster may still
        // claim them as border points.
        if neighbors[seed].len() < min_neighbours {
            continue;
        }

        let cluster_id = next_cluster;
        next_cluster += 1;
        labels[seed] = cluster_id;

        frontier.clear();
        frontier.extend(neighbors[seed].iter().copied().filter(|&j| j != seed));

        while let Some(point) = frontier.pop_front() {
            // First visit from any cluster claims unlabeled points,
            // including previously examined non-core (noise) ones.
            if labels[point] == NOISE {
                labels[point] = cluster_id;
            }

            if visited[point] {
                continue;
            }
            visited[point] = true;

            // Only core points extend the frontier.
            if neighbors[point].len() >= min_neighbours {
                frontier.extend(neighbors[point].iter().copied().filter(|&j| j != point));
            }
        }
    }

    labels
}

/// Partition a point cloud into density-connected clusters.
///
/// Runs [`dbscan_labels`] on the planar projection of `cloud` and groups
/// the labeled points into per-cluster clouds. Clusters are returned in
/// discovery order; within each cluster, points keep their relative input
/// order, so every cluster is an order-preserving subsequence of `cloud`.
/// Noise points appear in no cluster.
///
/// The empty cloud, and clouds with no core points, yield an empty
/// cluster list.
pub fn cluster_cloud(cloud: &PointCloud, radius: f32, min_neighbours: usize) -> Vec<PointCloud> {
    let coords = cloud.to_planar_coords();
    let labels = dbscan_labels(&coords, radius, min_neighbours);

    let num_clusters = labels.iter().copied().max().map_or(0, |m| (m + 1).max(0)) as usize;
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); num_clusters];

    for (i, &label) in labels.iter().enumerate() {
        if label >= 0 {
            members[label as usize].push(i);
        }
    }

    members
        .iter()
        .map(|indices| cloud.select(indices))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud_from_planar(points: &[[f32; 2]]) -> PointCloud {
        let mut cloud = PointCloud::new();
        for p in points {
            cloud.push(p[0], p[1], 0.0);
        }
        cloud
    }

    #[test]
    fn test_empty_input() {
        let labels = dbscan_labels(&[], 1.0, 2);
        assert!(labels.is_empty());

        let clusters = cluster_cloud(&PointCloud::new(), 1.0, 2);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_single_point_is_noise() {
        let labels = dbscan_labels(&[[0.0, 0.0]], 1.0, 2);
        assert_eq!(labels, vec![NOISE]);
    }

    #[test]
    fn test_single_point_cluster_with_min_neighbours_one() {
        // With min_neighbours = 1 every point is a core point.
        let labels = dbscan_labels(&[[0.0, 0.0], [10.0, 0.0]], 1.0, 1);
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn test_two_separated_segments() {
        let coords = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [0.0, 5.0],
            [1.0, 5.0],
            [2.0, 5.0],
        ];
        let labels = dbscan_labels(&coords, 1.5, 2);

        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], 0);
        assert_eq!(labels[3], 1);
        assert_eq!(labels[4], 1);
        assert_eq!(labels[5], 1);
    }

    #[test]
    fn test_noise_excluded_from_clusters() {
        let coords = vec![
            [0.0, 0.0],
            [0.5, 0.0],
            [1.0, 0.0],
            // Isolated point, fewer than min_neighbours within radius.
            [50.0, 50.0],
        ];
        let cloud = cloud_from_planar(&coords);
        let clusters = cluster_cloud(&cloud, 1.0, 2);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);

        let labels = dbscan_labels(&coords, 1.0, 2);
        assert_eq!(labels[3], NOISE);
    }

    #[test]
    fn test_partition_property() {
        // Every point lands in at most one cluster and no cluster is empty.
        let coords = vec![
            [0.0, 0.0],
            [0.3, 0.1],
            [0.6, 0.0],
            [5.0, 5.0],
            [5.2, 5.1],
            [5.4, 5.0],
            [20.0, -3.0],
        ];
        let cloud = cloud_from_planar(&coords);
        let clusters = cluster_cloud(&cloud, 0.5, 2);

        let total: usize = clusters.iter().map(|c| c.len()).sum();
        assert!(total <= coords.len());
        assert!(clusters.iter().all(|c| !c.is_empty()));

        let labels = dbscan_labels(&coords, 0.5, 2);
        for &label in &labels {
            assert!(label == NOISE || (label as usize) < clusters.len());
        }
    }

    #[test]
    fn test_determinism_across_reruns() {
        let coords = vec![
            [0.0, 0.0],
            [0.4, 0.2],
            [0.8, 0.1],
            [1.2, 0.0],
            [6.0, 1.0],
            [6.3, 1.2],
            [6.6, 1.1],
            [3.0, 0.5],
        ];
        let first = dbscan_labels(&coords, 0.6, 2);
        for _ in 0..10 {
            assert_eq!(dbscan_labels(&coords, 0.6, 2), first);
        }
    }

    #[test]
    fn test_clusters_preserve_input_order() {
        // Interleave members of two clusters in the input.
        let coords = vec![
            [0.0, 0.0],  // cluster A
            [10.0, 0.0], // cluster B
            [0.5, 0.0],  // A
            [10.5, 0.0], // B
            [1.0, 0.0],  // A
            [11.0, 0.0], // B
        ];
        let cloud = cloud_from_planar(&coords);
        let clusters = cluster_cloud(&cloud, 1.0, 2);

        assert_eq!(clusters.len(), 2);
        // Discovery order: A seeded at index 0, B at index 1.
        assert_eq!(clusters[0].x, vec![0.0, 0.5, 1.0]);
        assert_eq!(clusters[1].x, vec![10.0, 10.5, 11.0]);
    }

    /// Two tight 4-point clusters with a lone point halfway between them,
    /// within `radius` of exactly one core point on each side. The middle
    /// point has a 3-point neighborhood (itself plus one core per side),
    /// below `min_neighbours = 4`, so it is a border point of both.
    fn border_tiebreak_coords(a_first: bool) -> Vec<[f32; 2]> {
        let a = [[0.0, 0.0], [0.5, 0.0], [0.0, 0.5], [0.0, -0.5]];
        let b = [[3.0, 0.0], [2.5, 0.0], [3.0, 0.5], [3.0, -0.5]];
        let mut coords: Vec<[f32; 2]> = Vec::new();
        if a_first {
            coords.extend_from_slice(&a);
            coords.extend_from_slice(&b);
        } else {
            coords.extend_from_slice(&b);
            coords.extend_from_slice(&a);
        }
        coords.push([1.5, 0.0]);
        coords
    }

    #[test]
    fn test_border_point_goes_to_first_discovered_cluster() {
        let labels = dbscan_labels(&border_tiebreak_coords(true), 1.0, 4);
        // Two clusters, not merged through the border point.
        assert_eq!(labels.iter().copied().max(), Some(1));
        // The shared border point joins cluster 0, seeded earlier in input
        // order, regardless of which side it sits closer to.
        assert_eq!(labels[8], 0);
        assert_eq!(labels[0], 0);
        assert_eq!(labels[4], 1);
    }

    #[test]
    fn test_border_tiebreak_follows_input_order() {
        // Same geometry with the clusters swapped in the input: the border
        // point must now follow the other cluster.
        let labels = dbscan_labels(&border_tiebreak_coords(false), 1.0, 4);
        assert_eq!(labels[8], 0);
        assert_eq!(labels[0], 0); // b-side seeds cluster 0 now
        assert_eq!(labels[4], 1);
    }

    #[test]
    fn test_border_point_does_not_propagate() {
        // A dense chain on the left, one border point, then a point beyond
        // it that is only reachable through the border point: it must stay
        // noise because borders do not extend the frontier.
        let coords = vec![
            [0.0, 0.0],
            [0.3, 0.0],
            [0.6, 0.0],
            [0.9, 0.0],
            [1.8, 0.0], // border: 3-point neighborhood, below min of 4
            [2.7, 0.0], // reachable only via the border point
        ];
        let labels = dbscan_labels(&coords, 1.0, 4);
        assert_eq!(&labels[0..5], &[0, 0, 0, 0, 0]);
        assert_eq!(labels[5], NOISE);
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        // Exactly radius apart: still neighbors.
        let labels = dbscan_labels(&[[0.0, 0.0], [1.0, 0.0]], 1.0, 2);
        assert_eq!(labels, vec![0, 0]);
    }

    #[test]
    fn test_planar_distance_ignores_z() {
        let mut cloud = PointCloud::new();
        cloud.push(0.0, 0.0, 0.0);
        cloud.push(0.5, 0.0, 100.0);
        cloud.push(1.0, 0.0, -40.0);

        let clusters = cluster_cloud(&cloud, 1.0, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
        // z values ride along untouched
        assert_eq!(clusters[0].z, vec![0.0, 100.0, -40.0]);
    }
}
