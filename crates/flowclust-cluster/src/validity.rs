//! Scalar cluster validity measures: compactness/separation ratio, Gamma
//! statistic and Davies–Bouldin index.

use rayon::prelude::*;
use tracing::instrument;

use flowclust_metric::{Center, Dissimilarity, PairwiseDistance};

use crate::error::ClusterError;
use crate::label::{ClusterLabel, members_by_label};

fn non_empty_groups(members: &[Vec<usize>]) -> Result<usize, ClusterError> {
    let n_groups = members.iter().filter(|m| !m.is_empty()).count();
    if n_groups < 2 {
        return Err(ClusterError::DegenerateClustering { n_groups });
    }
    Ok(n_groups)
}

fn mean_between<D: PairwiseDistance + ?Sized>(distances: &D, a: &[usize], b: &[usize]) -> f64 {
    let sum: f64 = a.iter().flat_map(|&i| b.iter().map(move |&j| distances.distance(i, j))).sum();
    sum / (a.len() * b.len()) as f64
}

/// Mean over clusters of `compactness / separation`; lower is better.
///
/// Compactness is the mean pairwise dissimilarity inside a cluster (0 for a
/// singleton); separation is the smallest mean dissimilarity between the
/// cluster and another non-empty cluster. Clusters with zero separation are
/// skipped; if every cluster is skipped the index is 0.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::DegenerateClustering`] | Fewer than 2 non-empty clusters |
#[instrument(skip_all, fields(n = labels.len()))]
pub fn validity_index<D: PairwiseDistance + ?Sized>(
    distances: &D,
    labels: &[ClusterLabel],
) -> Result<f64, ClusterError> {
    let members = members_by_label(labels);
    non_empty_groups(&members)?;

    let ratios: Vec<f64> = (0..members.len())
        .into_par_iter()
        .filter(|&c| !members[c].is_empty())
        .filter_map(|c| {
            let own = &members[c];
            let pairs = own.len() * (own.len() - 1) / 2;
            let compactness = if pairs == 0 {
                0.0
            } else {
                let sum: f64 = (0..own.len())
                    .flat_map(|a| (a + 1..own.len()).map(move |b| (a, b)))
                    .map(|(a, b)| distances.distance(own[a], own[b]))
                    .sum();
                sum / pairs as f64
            };
            let separation = (0..members.len())
                .filter(|&o| o != c && !members[o].is_empty())
                .map(|o| mean_between(distances, own, &members[o]))
                .fold(f64::INFINITY, f64::min);
            (separation > 0.0).then(|| compactness / separation)
        })
        .collect();

    if ratios.is_empty() {
        return Ok(0.0);
    }
    Ok(ratios.iter().sum::<f64>() / ratios.len() as f64)
}

/// Pearson correlation between pairwise dissimilarity and the indicator
/// "the two lines are in different clusters", over all pairs.
///
/// Close to 1 when dissimilarity predicts cluster boundaries well. Returns 0
/// when either variable is constant.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::DegenerateClustering`] | Fewer than 2 non-empty clusters |
#[instrument(skip_all, fields(n = labels.len()))]
pub fn gamma_statistic<D: PairwiseDistance + ?Sized>(
    distances: &D,
    labels: &[ClusterLabel],
) -> Result<f64, ClusterError> {
    let members = members_by_label(labels);
    non_empty_groups(&members)?;

    let n = labels.len();
    // per row: (Σd, Σd², Σx, Σxd) with x the different-cluster indicator
    let (sum_d, sum_d2, sum_x, sum_xd) = (1..n)
        .into_par_iter()
        .map(|i| {
            let mut acc = (0.0, 0.0, 0.0, 0.0);
            for j in 0..i {
                let d = distances.distance(i, j);
                let x = if labels[i] == labels[j] { 0.0 } else { 1.0 };
                acc.0 += d;
                acc.1 += d * d;
                acc.2 += x;
                acc.3 += x * d;
            }
            acc
        })
        .reduce(
            || (0.0, 0.0, 0.0, 0.0),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
        );

    let pairs = (n * (n - 1) / 2) as f64;
    let mean_d = sum_d / pairs;
    let mean_x = sum_x / pairs;
    let cov = sum_xd / pairs - mean_d * mean_x;
    // x is binary, so E[x²] = E[x]
    let var_d = sum_d2 / pairs - mean_d * mean_d;
    let var_x = mean_x - mean_x * mean_x;
    if var_d <= 0.0 || var_x <= 0.0 {
        return Ok(0.0);
    }
    Ok(cov / (var_d.sqrt() * var_x.sqrt()))
}

/// Davies–Bouldin index; lower is better.
///
/// `centers` holds one prepared center per label. Scatter `S_i` is the mean
/// member-to-center dissimilarity; the index is the mean over clusters of
/// `max_{j≠i} (S_i + S_j) / d(c_i, c_j)`. Pairs of coincident centers are
/// skipped.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::DegenerateClustering`] | Fewer than 2 non-empty clusters |
///
/// # Panics
///
/// Panics if there are fewer centers than labels in use.
#[instrument(skip_all, fields(n = labels.len(), n_centers = centers.len()))]
pub fn davies_bouldin(
    dissim: &Dissimilarity<'_>,
    centers: &[Center],
    labels: &[ClusterLabel],
) -> Result<f64, ClusterError> {
    let members = members_by_label(labels);
    let n_groups = non_empty_groups(&members)?;
    assert!(centers.len() >= members.len(), "one center per label required");

    let scatter: Vec<f64> = members
        .par_iter()
        .zip(centers.par_iter())
        .map(|(m, center)| {
            if m.is_empty() {
                0.0
            } else {
                m.iter().map(|&i| dissim.to_center(center, i)).sum::<f64>() / m.len() as f64
            }
        })
        .collect();

    let total: f64 = (0..members.len())
        .filter(|&i| !members[i].is_empty())
        .map(|i| {
            (0..members.len())
                .filter(|&j| j != i && !members[j].is_empty())
                .filter_map(|j| {
                    let d = dissim.between_centers(&centers[i], &centers[j]);
                    (d > 0.0).then(|| (scatter[i] + scatter[j]) / d)
                })
                .fold(0.0, f64::max)
        })
        .sum();

    Ok(total / n_groups as f64)
}
