//! Dissimilarity evaluation between lines and arbitrary center vectors.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::context::{LineFeature, MetricContext};
use crate::data::DataMatrix;
use crate::error::MetricError;
use crate::geometry::{Histogram, dot, entropy_bits, euclidean, mean_point, symmetric_eigenvalues};
use crate::matrix::DistanceMatrix;
use crate::metric::Metric;

/// Exponent of the fractional distance metric.
const FRACTIONAL_EXPONENT: f64 = 0.5;

/// Anything that can report the dissimilarity between two lines by index.
///
/// Implemented by [`Dissimilarity`] (computed on demand) and by
/// [`DistanceMatrix`] (looked up).
pub trait PairwiseDistance: Sync {
    /// Return the number of lines.
    fn n_lines(&self) -> usize;

    /// Return the dissimilarity between lines `i` and `j`.
    fn distance(&self, i: usize, j: usize) -> f64;
}

/// A center vector prepared for repeated comparison against data rows.
///
/// Centers are arbitrary row-width vectors (means, medoids, random
/// positions); their metric features are extracted once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Center {
    values: Vec<f64>,
    feature: LineFeature,
}

impl Center {
    /// Return the center coordinates.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn as_line(&self) -> LineRef<'_> {
        LineRef {
            padded: &self.values,
            unpadded: &self.values,
            feature: &self.feature,
        }
    }
}

/// Borrowed view of one side of a comparison.
#[derive(Clone, Copy)]
struct LineRef<'a> {
    padded: &'a [f64],
    unpadded: &'a [f64],
    feature: &'a LineFeature,
}

/// Dissimilarity evaluator bound to a data matrix and its metric context.
///
/// Cheap to copy and safe to share across threads.
#[derive(Debug, Clone, Copy)]
pub struct Dissimilarity<'a> {
    data: &'a DataMatrix,
    context: &'a MetricContext,
}

impl<'a> Dissimilarity<'a> {
    /// Bind an evaluator to `data` and the context prepared from it.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::ContextMismatch`] if the context covers a
    /// different number of lines than `data`.
    pub fn new(data: &'a DataMatrix, context: &'a MetricContext) -> Result<Self, MetricError> {
        if context.len() != data.rows() {
            return Err(MetricError::ContextMismatch {
                context_rows: context.len(),
                data_rows: data.rows(),
            });
        }
        Ok(Self { data, context })
    }

    /// Return the active metric.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.context.metric()
    }

    /// Return the bound data matrix.
    #[must_use]
    pub fn data(&self) -> &'a DataMatrix {
        self.data
    }

    /// Dissimilarity between lines `i` and `j`.
    #[must_use]
    pub fn between(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        compare(self.metric(), self.data.dimension(), self.line(i), self.line(j))
    }

    /// Prepare a center vector for comparison against data rows.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidDimension`] if `values` is not exactly
    /// one data row wide.
    pub fn center(&self, values: Vec<f64>) -> Result<Center, MetricError> {
        if values.len() != self.data.cols() {
            return Err(MetricError::InvalidDimension {
                expected: self.data.cols(),
                got: values.len(),
            });
        }
        let feature = LineFeature::extract(
            self.metric().family(),
            &values,
            &values,
            self.data.dimension(),
        );
        Ok(Center { values, feature })
    }

    /// Dissimilarity between a prepared center and line `i`.
    #[must_use]
    pub fn to_center(&self, center: &Center, i: usize) -> f64 {
        compare(self.metric(), self.data.dimension(), center.as_line(), self.line(i))
    }

    /// Dissimilarity between two prepared centers.
    #[must_use]
    pub fn between_centers(&self, a: &Center, b: &Center) -> f64 {
        compare(self.metric(), self.data.dimension(), a.as_line(), b.as_line())
    }

    /// Compute the full pairwise dissimilarity matrix.
    ///
    /// Each cell is independent; the lower triangle is computed in parallel.
    #[must_use]
    #[instrument(skip_all, fields(n = self.data.rows(), metric = %self.metric()))]
    pub fn pairwise(&self) -> DistanceMatrix {
        let n = self.data.rows();
        let total_pairs = n * n.saturating_sub(1) / 2;

        let distances: Vec<f64> = (0..total_pairs)
            .into_par_iter()
            .map(|flat_idx| {
                let (i, j) = DistanceMatrix::unflatten(flat_idx);
                self.between(i, j)
            })
            .collect();

        debug!(total_pairs, "pairwise matrix computed");
        DistanceMatrix::from_raw(n, distances)
    }

    fn line(&self, i: usize) -> LineRef<'a> {
        LineRef {
            padded: self.data.row(i),
            unpadded: self.data.unpadded_row(i),
            feature: self.context.feature(i),
        }
    }
}

impl PairwiseDistance for Dissimilarity<'_> {
    fn n_lines(&self) -> usize {
        self.data.rows()
    }

    fn distance(&self, i: usize, j: usize) -> f64 {
        self.between(i, j)
    }
}

// ── metric kernels ───────────────────────────────────────────────────────────

fn compare(metric: Metric, dim: usize, a: LineRef<'_>, b: LineRef<'_>) -> f64 {
    use LineFeature as F;

    match (metric, a.feature, b.feature) {
        (Metric::Euclidean, _, _) => euclidean(a.padded, b.padded),
        (Metric::Fractional, _, _) => {
            let sum: f64 = a
                .padded
                .iter()
                .zip(b.padded)
                .map(|(x, y)| (x - y).abs().powf(FRACTIONAL_EXPONENT))
                .sum();
            sum.powf(1.0 / FRACTIONAL_EXPONENT)
        }
        (Metric::InnerProduct, _, _) => inner_product(a.padded, b.padded),
        (Metric::MeanClosestPoint, _, _) => {
            let (ab, ba) = closest_point_profiles(a.unpadded, b.unpadded, dim);
            0.5 * (mean(&ab) + mean(&ba))
        }
        (Metric::Hausdorff, _, _) => {
            let (ab, ba) = closest_point_profiles(a.unpadded, b.unpadded, dim);
            ab.iter().chain(&ba).copied().fold(0.0, f64::max)
        }
        (Metric::Procrustes, _, _) => procrustes(a.padded, b.padded, dim),

        (Metric::PiecewiseAngle, F::Directions(x), F::Directions(y)) => {
            mean(&segment_angles(x, y, dim))
        }
        (Metric::AngleDeviation, F::Directions(x), F::Directions(y)) => {
            let angles = segment_angles(x, y, dim);
            let mu = mean(&angles);
            let variance = if angles.is_empty() {
                0.0
            } else {
                angles.iter().map(|t| (t - mu) * (t - mu)).sum::<f64>() / angles.len() as f64
            };
            mu * variance.sqrt()
        }
        (Metric::CosineSimilarity, F::Directions(x), F::Directions(y)) => {
            let gaps: Vec<f64> = x
                .chunks_exact(dim)
                .zip(y.chunks_exact(dim))
                .map(|(u, v)| if is_unit(u) && is_unit(v) { 1.0 - dot(u, v) } else { 0.0 })
                .collect();
            mean(&gaps).max(0.0)
        }

        (
            Metric::RotationBhattacharyya,
            F::Turning { histogram: x, .. },
            F::Turning { histogram: y, .. },
        ) => x.bhattacharyya(y),
        (Metric::AverageRotation, F::Turning { mean: x, .. }, F::Turning { mean: y, .. }) => {
            (x - y).abs()
        }

        (Metric::SignedAngleIntersection, F::Histogram(x), F::Histogram(y)) => {
            x.intersection_distance(y)
        }
        (Metric::FixedDirectionBhattacharyya, F::Histogram(x), F::Histogram(y)) => {
            x.bhattacharyya(y)
        }
        (Metric::Signature, F::Histogram(x), F::Histogram(y)) => x.chi_square(y),
        (Metric::Entropy, F::Histogram(x), F::Histogram(y)) => entropy_gain(x, y),

        (
            Metric::DirectionDistribution | Metric::UnnormalizedDistribution,
            F::Gaussian(x),
            F::Gaussian(y),
        ) => x.bhattacharyya(y),

        _ => unreachable!("line features are always extracted for the active metric family"),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[inline]
fn is_unit(v: &[f64]) -> bool {
    dot(v, v) > 0.5
}

/// Angle between corresponding unit directions; zero where either side is padding.
fn segment_angles(x: &[f64], y: &[f64], dim: usize) -> Vec<f64> {
    x.chunks_exact(dim)
        .zip(y.chunks_exact(dim))
        .map(|(u, v)| {
            if is_unit(u) && is_unit(v) {
                dot(u, v).clamp(-1.0, 1.0).acos()
            } else {
                0.0
            }
        })
        .collect()
}

fn inner_product(a: &[f64], b: &[f64]) -> f64 {
    let na = dot(a, a).sqrt();
    let nb = dot(b, b).sqrt();
    match (na > 0.0, nb > 0.0) {
        (false, false) => 0.0,
        (true, true) => (1.0 - dot(a, b) / (na * nb)).clamp(0.0, 2.0),
        _ => 1.0,
    }
}

/// For every point of `a` the distance to the closest point of `b`, and vice versa.
fn closest_point_profiles(a: &[f64], b: &[f64], dim: usize) -> (Vec<f64>, Vec<f64>) {
    let nearest = |from: &[f64], to: &[f64]| -> Vec<f64> {
        from.chunks_exact(dim)
            .map(|p| {
                to.chunks_exact(dim)
                    .map(|q| euclidean(p, q))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    };
    (nearest(a, b), nearest(b, a))
}

/// Normalized Procrustes distance between two equally sized point sets.
///
/// Both sets are centered and scaled to unit Frobenius norm; the residual of
/// the best orthogonal alignment is `1 - ‖AᵀB‖²_*`.
fn procrustes(a: &[f64], b: &[f64], dim: usize) -> f64 {
    const DEGENERATE: f64 = 1e-12;

    let centered = |points: &[f64]| -> Vec<f64> {
        let mu = mean_point(points, dim);
        points
            .chunks_exact(dim)
            .flat_map(|p| p.iter().zip(&mu).map(|(v, m)| v - m).collect::<Vec<_>>())
            .collect()
    };
    let ca = centered(a);
    let cb = centered(b);
    let na = dot(&ca, &ca).sqrt();
    let nb = dot(&cb, &cb).sqrt();
    match (na > DEGENERATE, nb > DEGENERATE) {
        (false, false) => return 0.0,
        (true, true) => {}
        _ => return 1.0,
    }

    // cross-covariance M = AᵀB / (‖A‖‖B‖), dim x dim
    let mut m = vec![0.0; dim * dim];
    for (p, q) in ca.chunks_exact(dim).zip(cb.chunks_exact(dim)) {
        for r in 0..dim {
            for c in 0..dim {
                m[r * dim + c] += p[r] * q[c];
            }
        }
    }
    let scale = na * nb;
    for v in &mut m {
        *v /= scale;
    }

    // MᵀM is symmetric PSD; its eigenvalues are the squared singular values of M.
    let mut mtm = vec![0.0; dim * dim];
    for r in 0..dim {
        for c in 0..dim {
            mtm[r * dim + c] = (0..dim).map(|k| m[k * dim + r] * m[k * dim + c]).sum();
        }
    }
    // rank-deficient shapes leave rounding noise in the null eigenvalues
    let floor = 1e-12 * (0..dim).map(|i| mtm[i * dim + i]).sum::<f64>();
    let nuclear: f64 = symmetric_eigenvalues(&mtm, dim)
        .into_iter()
        .filter(|&l| l > floor)
        .map(f64::sqrt)
        .sum();
    (1.0 - nuclear * nuclear).max(0.0).sqrt()
}

/// Entropy of the merged direction histogram minus the weighted entropies of the parts.
fn entropy_gain(a: &Histogram, b: &Histogram) -> f64 {
    let na = a.total();
    let nb = b.total();
    if na + nb <= 0.0 {
        return 0.0;
    }
    let merged: Vec<f64> = a.counts().iter().zip(b.counts()).map(|(x, y)| x + y).collect();
    let joint = entropy_bits(&merged);
    let parts = (na * entropy_bits(a.counts()) + nb * entropy_bits(b.counts())) / (na + nb);
    (joint - parts).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Five 2-D lines of four points: two horizontal, two diagonal, one bent.
    fn lines() -> DataMatrix {
        DataMatrix::from_rows(
            vec![
                vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0],
                vec![0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0],
                vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0],
                vec![1.0, 0.0, 2.0, 1.0, 3.0, 2.0, 4.0, 3.0],
                vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn every_metric_is_zero_on_identical_lines_and_non_negative() {
        let data = lines();
        for metric in Metric::ALL {
            let ctx = MetricContext::prepare(&data, metric);
            let d = Dissimilarity::new(&data, &ctx).unwrap();
            for i in 0..data.rows() {
                let center = d.center(data.row(i).to_vec()).unwrap();
                let self_dist = d.to_center(&center, i);
                assert!(
                    self_dist.abs() < 1e-6,
                    "metric {metric}: line {i} vs itself = {self_dist}"
                );
                for j in 0..data.rows() {
                    let v = d.between(i, j);
                    assert!(v >= 0.0 && v.is_finite(), "metric {metric}: d({i},{j}) = {v}");
                }
            }
        }
    }

    #[test]
    fn every_metric_is_symmetric() {
        let data = lines();
        for metric in Metric::ALL {
            let ctx = MetricContext::prepare(&data, metric);
            let d = Dissimilarity::new(&data, &ctx).unwrap();
            for i in 0..data.rows() {
                for j in 0..data.rows() {
                    assert!(
                        (d.between(i, j) - d.between(j, i)).abs() < 1e-6,
                        "metric {metric} asymmetric on ({i},{j})"
                    );
                }
            }
        }
    }

    #[test]
    fn euclidean_between_parallel_lines() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!((d.between(0, 1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn fractional_distance() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::Fractional);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        // four unit gaps in y: (4 * 1^0.5)^2
        assert!((d.between(0, 1) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn angle_metrics_ignore_translation() {
        let data = lines();
        for metric in [
            Metric::PiecewiseAngle,
            Metric::CosineSimilarity,
            Metric::AverageRotation,
            Metric::RotationBhattacharyya,
            Metric::FixedDirectionBhattacharyya,
            Metric::Procrustes,
        ] {
            let ctx = MetricContext::prepare(&data, metric);
            let d = Dissimilarity::new(&data, &ctx).unwrap();
            assert!(d.between(0, 1) < 1e-6, "{metric}: horizontal lines");
            assert!(d.between(2, 3) < 1e-6, "{metric}: diagonal lines");
        }
    }

    #[test]
    fn piecewise_angle_between_horizontal_and_diagonal() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::PiecewiseAngle);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!((d.between(0, 2) - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
    }

    #[test]
    fn hausdorff_and_closest_point() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::Hausdorff);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!((d.between(0, 1) - 1.0).abs() < 1e-12);

        let ctx = MetricContext::prepare(&data, Metric::MeanClosestPoint);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!((d.between(0, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn closest_point_metrics_ignore_padding() {
        // line 1 is line 0 truncated to two real points then padded
        let data = DataMatrix::from_rows(
            vec![vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 1.0, 1.0]],
            1,
        )
        .unwrap()
        .with_original_lengths(vec![4, 2])
        .unwrap();
        let ctx = MetricContext::prepare(&data, Metric::Hausdorff);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!((d.between(0, 1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn procrustes_ignores_rotation_and_scale() {
        // an L shape and the same shape rotated by 90 degrees and doubled
        let data = DataMatrix::from_rows(
            vec![
                vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 2.0, 1.0],
                vec![0.0, 0.0, 0.0, 2.0, 0.0, 4.0, -2.0, 4.0],
            ],
            2,
        )
        .unwrap();
        let ctx = MetricContext::prepare(&data, Metric::Procrustes);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!(d.between(0, 1) < 1e-6, "got {}", d.between(0, 1));
    }

    #[test]
    fn entropy_gain_of_identical_directions_is_zero() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::Entropy);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!(d.between(0, 1).abs() < 1e-12);
        // horizontal vs diagonal: two disjoint bins of equal weight -> one bit
        assert!((d.between(0, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn center_width_mismatch_is_invalid_dimension() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        assert!(matches!(
            d.center(vec![0.0; 3]),
            Err(MetricError::InvalidDimension { expected: 8, got: 3 })
        ));
    }

    #[test]
    fn context_mismatch_rejected() {
        let data = lines();
        let other = DataMatrix::from_rows(vec![vec![0.0; 8]], 2).unwrap();
        let ctx = MetricContext::prepare(&other, Metric::Euclidean);
        assert!(matches!(
            Dissimilarity::new(&data, &ctx),
            Err(MetricError::ContextMismatch { context_rows: 1, data_rows: 5 })
        ));
    }

    #[test]
    fn pairwise_matches_direct_evaluation() {
        let data = lines();
        let ctx = MetricContext::prepare(&data, Metric::Signature);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let m = d.pairwise();
        for i in 0..data.rows() {
            for j in 0..data.rows() {
                assert_eq!(m.get(i, j), d.between(i, j));
            }
        }
    }
}
