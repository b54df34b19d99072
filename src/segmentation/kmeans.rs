//! K-means clustering of colour samples
//!
//! Seeds the mixture components of each colour model. Initialisation is
//! deterministic (farthest-point), so identical inputs always produce the
//! same segmentation.

use crate::error::{CutoutError, Result};

/// Lloyd iterations run after seeding
pub(crate) const KMEANS_ITERATIONS: usize = 10;

/// Upper bound on samples inspected while picking seeds
const SEED_SAMPLE_BUDGET: usize = 2_000;

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

fn nearest(centroids: &[[f64; 3]], sample: &[f64; 3]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(centroid, sample);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

/// Cluster `samples` into at most `k` groups, returning one cluster index per sample
pub(crate) fn cluster(samples: &[[f64; 3]], k: usize, iterations: usize) -> Result<Vec<usize>> {
    let Some(first) = samples.first() else {
        return Err(CutoutError::segmentation_failure(
            "cannot cluster an empty colour sample set",
        ));
    };
    if k == 0 {
        return Err(CutoutError::segmentation_failure("cluster count must be positive"));
    }

    // Farthest-point seeding over a strided subset
    let stride = samples.len() / SEED_SAMPLE_BUDGET + 1;
    let mut centroids: Vec<[f64; 3]> = Vec::with_capacity(k);
    centroids.push(*first);
    while centroids.len() < k {
        let mut farthest = *first;
        let mut farthest_distance = 0.0;
        for sample in samples.iter().step_by(stride) {
            let distance = centroids
                .iter()
                .map(|c| squared_distance(c, sample))
                .fold(f64::INFINITY, f64::min);
            if distance > farthest_distance {
                farthest_distance = distance;
                farthest = *sample;
            }
        }
        centroids.push(farthest);
    }

    let mut labels = vec![0usize; samples.len()];
    for _ in 0..iterations {
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        let mut changed = false;

        for (label, sample) in labels.iter_mut().zip(samples) {
            let assigned = nearest(&centroids, sample);
            if assigned != *label {
                *label = assigned;
                changed = true;
            }
            for (sum, value) in sums[assigned].iter_mut().zip(sample) {
                *sum += value;
            }
            counts[assigned] += 1;
        }

        for ((centroid, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if count > 0 {
                let n = count as f64;
                *centroid = [sum[0] / n, sum[1] / n, sum[2] / n];
            }
        }

        if !changed {
            break;
        }
    }

    // Labels must reflect the final centroids
    for (label, sample) in labels.iter_mut().zip(samples) {
        *label = nearest(&centroids, sample);
    }

    Ok(labels)
}
