//! Matching utilities for centroid association.

use ndarray::Array2;

use crate::tracker::centroid::Centroid;

/// Compute the pairwise Euclidean distance matrix between existing and new centroids.
pub fn centroid_distance(existing: &[Centroid], incoming: &[Centroid]) -> Array2<f64> {
    let mut dists = Array2::zeros((existing.len(), incoming.len()));
    for (i, e) in existing.iter().enumerate() {
        for (j, n) in incoming.iter().enumerate() {
            dists[[i, j]] = e.distance(n);
        }
    }
    dists
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Greedy nearest-neighbour assignment.
///
/// Rows are visited in ascending order of their minimum distance. Each row
/// takes its closest column not yet consumed, and the pair is accepted only
/// when that distance is at most `max_distance`. Ties resolve to the lower
/// index. This is not a globally optimal matching.
pub fn greedy_assignment(cost_matrix: &Array2<f64>, max_distance: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: vec![],
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    if num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: vec![],
        };
    }

    let row_min: Vec<f64> = cost_matrix
        .rows()
        .into_iter()
        .map(|row| row.iter().copied().fold(f64::INFINITY, f64::min))
        .collect();

    let mut order: Vec<usize> = (0..num_rows).collect();
    order.sort_by(|&a, &b| row_min[a].total_cmp(&row_min[b]));

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut used_cols = vec![false; num_cols];

    for row in order {
        let best = (0..num_cols)
            .filter(|&col| !used_cols[col])
            .min_by(|&a, &b| cost_matrix[[row, a]].total_cmp(&cost_matrix[[row, b]]));

        match best {
            Some(col) if cost_matrix[[row, col]] <= max_distance => {
                used_cols[col] = true;
                matches.push((row, col));
            }
            _ => unmatched_tracks.push(row),
        }
    }

    unmatched_tracks.sort_unstable();

    let unmatched_detections: Vec<usize> = used_cols
        .iter()
        .enumerate()
        .filter_map(|(i, &used)| if used { None } else { Some(i) })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
