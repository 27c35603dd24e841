//! Initial center selection (private module).
//!
//! Three strategies produce the first `k` center rows: uniform random
//! vectors inside the data bounding box, uniformly sampled distinct lines, and
//! K-means++ seeding over distinct lines weighted by the squared dissimilarity
//! to the nearest chosen center.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, instrument};

use flowclust_metric::{DataMatrix, Dissimilarity};

use crate::config::InitStrategy;
use crate::error::ClusterError;

/// Produce `k` initial centers as a flat `k x cols` row-major vector.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::InsufficientData`] | A sample-based strategy needs more distinct lines than exist |
#[instrument(skip(dissim, rng), fields(n = dissim.data().rows()))]
pub(crate) fn initial_centers(
    dissim: &Dissimilarity<'_>,
    k: usize,
    strategy: InitStrategy,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>, ClusterError> {
    let data = dissim.data();

    let indices: Vec<usize> = match strategy {
        InitStrategy::RandomPositions => return Ok(random_positions(data, k, rng)),
        InitStrategy::FromSamples | InitStrategy::FarthestSampling => {
            let distinct = distinct_rows(data);
            if distinct.len() < k {
                return Err(ClusterError::InsufficientData { n_distinct: distinct.len(), k });
            }
            if strategy == InitStrategy::FromSamples {
                sample(rng, distinct.len(), k)
                    .into_iter()
                    .map(|pos| distinct[pos])
                    .collect()
            } else {
                kmeans_plus_plus(&distinct, k, dissim, rng)
            }
        }
    };

    debug!(?indices, "initial centers chosen");
    Ok(indices.iter().flat_map(|&i| data.row(i).iter().copied()).collect())
}

/// Indices of the first occurrence of every distinct row, ascending.
pub(crate) fn distinct_rows(data: &DataMatrix) -> Vec<usize> {
    let mut seen: HashSet<Vec<u64>> = HashSet::with_capacity(data.rows());
    data.iter_rows()
        .enumerate()
        .filter(|(_, row)| seen.insert(row.iter().map(|v| (v + 0.0).to_bits()).collect()))
        .map(|(i, _)| i)
        .collect()
}

/// `k` vectors drawn uniformly inside the per-column bounding box of the data.
fn random_positions(data: &DataMatrix, k: usize, rng: &mut ChaCha8Rng) -> Vec<f64> {
    let cols = data.cols();
    let mut lo = vec![f64::INFINITY; cols];
    let mut hi = vec![f64::NEG_INFINITY; cols];
    for row in data.iter_rows() {
        for (c, &v) in row.iter().enumerate() {
            lo[c] = lo[c].min(v);
            hi[c] = hi[c].max(v);
        }
    }

    let mut centers = Vec::with_capacity(k * cols);
    for _ in 0..k {
        for c in 0..cols {
            let value = if hi[c] > lo[c] { rng.gen_range(lo[c]..=hi[c]) } else { lo[c] };
            centers.push(value);
        }
    }
    centers
}

/// Select `k` line indices among `candidates` with K-means++ seeding.
///
/// The first center is uniform over `candidates`; each subsequent one is drawn
/// with probability proportional to the squared dissimilarity to the nearest
/// already-chosen center. Distances are computed in parallel; the weighted
/// draw is sequential because it needs `rng`.
fn kmeans_plus_plus(
    candidates: &[usize],
    k: usize,
    dissim: &Dissimilarity<'_>,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let n = candidates.len();
    debug_assert!(k <= n, "k must not exceed the number of candidates");

    // Positions into `candidates`.
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));

    // Running minimum distance of each candidate to the chosen set.
    let mut nearest = vec![f64::INFINITY; n];

    for _ in 1..k {
        let last = candidates[chosen[chosen.len() - 1]];
        nearest
            .par_iter_mut()
            .enumerate()
            .for_each(|(pos, best)| *best = best.min(dissim.between(candidates[pos], last)));

        let weights: Vec<f64> = nearest
            .iter()
            .enumerate()
            .map(|(pos, d)| if chosen.contains(&pos) { 0.0 } else { d * d })
            .collect();
        let total_weight: f64 = weights.iter().sum();

        if total_weight <= 0.0 || !total_weight.is_finite() {
            // Remaining candidates are indistinguishable under this metric.
            if let Some(fallback) = (0..n).find(|pos| !chosen.contains(pos)) {
                chosen.push(fallback);
            }
            continue;
        }

        let threshold: f64 = rng.gen_range(0.0..total_weight);
        let mut cumsum = 0.0;
        let mut selected = None;
        for (pos, &w) in weights.iter().enumerate() {
            cumsum += w;
            if w > 0.0 && cumsum > threshold {
                selected = Some(pos);
                break;
            }
        }
        // rounding can leave the threshold past the final sum
        let selected = selected
            .or_else(|| weights.iter().rposition(|&w| w > 0.0))
            .unwrap_or(0);
        chosen.push(selected);
    }

    chosen.into_iter().map(|pos| candidates[pos]).collect()
}
