//! Silhouette score for evaluating clustering quality.
//!
//! The silhouette score measures how similar a line is to its own cluster
//! compared to the nearest other cluster. Values range from -1 (poor) to +1
//! (perfect).

use rayon::prelude::*;
use tracing::instrument;

use flowclust_metric::PairwiseDistance;

use crate::error::ClusterError;
use crate::label::{ClusterLabel, members_by_label};

/// Silhouette score for a single line.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSilhouette {
    /// Mean intra-cluster dissimilarity (a(i)).
    pub a: f64,
    /// Mean dissimilarity to the nearest other cluster (b(i)).
    pub b: f64,
    /// Silhouette coefficient: (b - a) / max(a, b). In [-1, 1].
    pub score: f64,
    /// Cluster of this line.
    pub cluster: ClusterLabel,
}

/// Result of silhouette score computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SilhouetteScore {
    /// Per-line silhouette scores.
    pub per_sample: Vec<SampleSilhouette>,
    /// Mean silhouette score across all lines.
    pub mean_score: f64,
    /// Mean silhouette score per cluster.
    pub per_cluster: Vec<f64>,
}

/// Compute silhouette scores for a labeled partition.
///
/// For each line `i`:
/// - `a(i)` = mean dissimilarity from `i` to the other members of its cluster
/// - `b(i)` = min over other non-empty clusters of the mean dissimilarity from `i` to their members
/// - `s(i)` = `(b(i) - a(i)) / max(a(i), b(i))`, and 0 for a singleton cluster
///
/// Per-line computation is parallelized with rayon. Results are
/// deterministic: each line's sums are accumulated in member order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::DegenerateClustering`] | Fewer than 2 non-empty clusters |
///
/// # Panics
///
/// Panics if `labels.len()` differs from `distances.n_lines()`.
#[instrument(skip_all, fields(n = labels.len()))]
pub fn compute_silhouette<D: PairwiseDistance + ?Sized>(
    distances: &D,
    labels: &[ClusterLabel],
) -> Result<SilhouetteScore, ClusterError> {
    assert_eq!(labels.len(), distances.n_lines(), "one label per line required");

    let members = members_by_label(labels);
    let n_groups = members.iter().filter(|m| !m.is_empty()).count();
    if n_groups < 2 {
        return Err(ClusterError::DegenerateClustering { n_groups });
    }

    let per_sample: Vec<SampleSilhouette> = (0..labels.len())
        .into_par_iter()
        .map(|i| {
            let own = labels[i].index();
            let mean_to = |c: usize| -> f64 {
                let sum: f64 = members[c]
                    .iter()
                    .filter(|&&j| j != i)
                    .map(|&j| distances.distance(i, j))
                    .sum();
                let count = members[c].iter().filter(|&&j| j != i).count();
                sum / count as f64
            };

            if members[own].len() <= 1 {
                return SampleSilhouette { a: 0.0, b: 0.0, score: 0.0, cluster: labels[i] };
            }

            let a = mean_to(own);
            let b = (0..members.len())
                .filter(|&c| c != own && !members[c].is_empty())
                .map(mean_to)
                .fold(f64::INFINITY, f64::min);

            let score = if a.max(b) == 0.0 { 0.0 } else { (b - a) / a.max(b) };
            SampleSilhouette { a, b, score, cluster: labels[i] }
        })
        .collect();

    let mean_score = per_sample.iter().map(|s| s.score).sum::<f64>() / per_sample.len() as f64;

    let per_cluster: Vec<f64> = members
        .iter()
        .map(|m| {
            if m.is_empty() {
                0.0
            } else {
                m.iter().map(|&i| per_sample[i].score).sum::<f64>() / m.len() as f64
            }
        })
        .collect();

    Ok(SilhouetteScore { per_sample, mean_score, per_cluster })
}

#[cfg(test)]
mod tests {
    use flowclust_metric::{DataMatrix, Dissimilarity, Metric, MetricContext};

    use super::compute_silhouette;
    use crate::error::ClusterError;
    use crate::label::ClusterLabel;

    fn labels(ids: &[usize]) -> Vec<ClusterLabel> {
        ids.iter().map(|&i| ClusterLabel::new(i)).collect()
    }

    fn points(values: &[f64]) -> DataMatrix {
        DataMatrix::from_rows(values.iter().map(|&v| vec![v]).collect(), 1).unwrap()
    }

    #[test]
    fn perfect_clusters() {
        let data = points(&[0.0, 0.0, 10.0, 10.0]);
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();

        let result = compute_silhouette(&d, &labels(&[0, 0, 1, 1])).unwrap();
        for s in &result.per_sample {
            assert!((s.score - 1.0).abs() < 1e-12, "score {}", s.score);
        }
        assert!((result.mean_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hand_computed_scores() {
        // cluster 0: {0, 1}, cluster 1: {4}
        let data = points(&[0.0, 1.0, 4.0]);
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();

        let result = compute_silhouette(&d, &labels(&[0, 0, 1])).unwrap();
        // line 0: a = 1, b = 4, s = 0.75; line 1: a = 1, b = 3, s = 2/3
        assert!((result.per_sample[0].score - 0.75).abs() < 1e-12);
        assert!((result.per_sample[1].score - 2.0 / 3.0).abs() < 1e-12);
        // singleton scores zero
        assert_eq!(result.per_sample[2].score, 0.0);
        assert!((result.per_cluster[0] - (0.75 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert_eq!(result.per_cluster[1], 0.0);
    }

    #[test]
    fn single_cluster_is_degenerate() {
        let data = points(&[0.0, 1.0, 2.0]);
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!(matches!(
            compute_silhouette(&d, &labels(&[0, 0, 0])),
            Err(ClusterError::DegenerateClustering { n_groups: 1 })
        ));
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let data = points(&[0.0, 0.3, 0.7, 5.0, 5.2, 9.0, 9.9, 10.4]);
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let l = labels(&[0, 0, 0, 1, 1, 2, 2, 2]);

        let first = compute_silhouette(&d, &l).unwrap();
        let second = compute_silhouette(&d, &l).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn matrix_and_direct_evaluation_agree() {
        let data = points(&[0.0, 0.5, 3.0, 3.5, 8.0]);
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let matrix = d.pairwise();
        let l = labels(&[0, 0, 1, 1, 1]);

        let direct = compute_silhouette(&d, &l).unwrap();
        let cached = compute_silhouette(&matrix, &l).unwrap();
        assert_eq!(direct, cached);
    }
}
