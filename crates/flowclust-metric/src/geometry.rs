//! Point, segment and small dense linear-algebra helpers.

use std::f64::consts::PI;

/// Segments shorter than this are treated as padding and carry no direction.
pub(crate) const DEGENERATE_SEGMENT: f64 = 1e-12;

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Angle in `[0, π]` between two non-zero vectors.
#[inline]
pub(crate) fn angle(a: &[f64], b: &[f64]) -> f64 {
    let denom = norm(a) * norm(b);
    if denom <= 0.0 {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0).acos()
}

/// Consecutive point differences of a flat `dim`-dimensional point sequence.
pub(crate) fn segments(points: &[f64], dim: usize) -> Vec<Vec<f64>> {
    points
        .chunks_exact(dim)
        .collect::<Vec<_>>()
        .windows(2)
        .map(|w| w[1].iter().zip(w[0]).map(|(b, a)| b - a).collect())
        .collect()
}

/// Segments with a usable direction.
pub(crate) fn proper_segments(points: &[f64], dim: usize) -> Vec<Vec<f64>> {
    segments(points, dim)
        .into_iter()
        .filter(|s| norm(s) > DEGENERATE_SEGMENT)
        .collect()
}

/// Turning angle between a segment and the next one, signed by the
/// orientation of the first two coordinates.
pub(crate) fn signed_turn(a: &[f64], b: &[f64]) -> f64 {
    let theta = angle(a, b);
    if a.len() < 2 {
        return theta;
    }
    let cross = a[0] * b[1] - a[1] * b[0];
    if cross < 0.0 { -theta } else { theta }
}

/// Mean point of a flat point sequence.
pub(crate) fn mean_point(points: &[f64], dim: usize) -> Vec<f64> {
    let n = points.len() / dim;
    let mut mean = vec![0.0; dim];
    for p in points.chunks_exact(dim) {
        for (m, v) in mean.iter_mut().zip(p) {
            *m += v;
        }
    }
    if n > 0 {
        for m in &mut mean {
            *m /= n as f64;
        }
    }
    mean
}

/// Map a direction to one of [`DIRECTION_BINS`] bins: azimuth sectors in the
/// first two coordinates, split by hemisphere of the third.
pub(crate) fn direction_bin(segment: &[f64]) -> usize {
    match segment.len() {
        1 => {
            if segment[0] >= 0.0 { 0 } else { DIRECTION_BINS / 2 }
        }
        2 => bin_index(segment[1].atan2(segment[0]), -PI, PI, DIRECTION_BINS),
        _ => {
            let half = DIRECTION_BINS / 2;
            let sector = bin_index(segment[1].atan2(segment[0]), -PI, PI, half);
            if segment[2] >= 0.0 { sector } else { sector + half }
        }
    }
}

pub(crate) const DIRECTION_BINS: usize = 16;

#[inline]
fn bin_index(value: f64, lo: f64, hi: f64, bins: usize) -> usize {
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    ((t * bins as f64) as usize).min(bins - 1)
}

// ── Histogram ────────────────────────────────────────────────────────────────

/// Fixed-range count histogram.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Histogram {
    counts: Vec<f64>,
    lo: f64,
    hi: f64,
}

impl Histogram {
    pub(crate) fn new(bins: usize, lo: f64, hi: f64) -> Self {
        debug_assert!(bins > 0 && hi > lo);
        Self { counts: vec![0.0; bins], lo, hi }
    }

    pub(crate) fn add(&mut self, value: f64) {
        let bin = bin_index(value, self.lo, self.hi, self.counts.len());
        self.counts[bin] += 1.0;
    }

    pub(crate) fn add_to_bin(&mut self, bin: usize) {
        self.counts[bin] += 1.0;
    }

    pub(crate) fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    pub(crate) fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub(crate) fn probabilities(&self) -> Vec<f64> {
        let total = self.total();
        if total <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|c| c / total).collect()
    }

    /// `sqrt(1 - BC)` where `BC` is the Bhattacharyya coefficient.
    pub(crate) fn bhattacharyya(&self, other: &Self) -> f64 {
        match (self.total() > 0.0, other.total() > 0.0) {
            (false, false) => 0.0,
            (true, true) => {
                let bc: f64 = self
                    .probabilities()
                    .iter()
                    .zip(other.probabilities())
                    .map(|(p, q)| (p * q).sqrt())
                    .sum();
                (1.0 - bc).max(0.0).sqrt()
            }
            _ => 1.0,
        }
    }

    /// `1 - Σ min(p, q)`.
    pub(crate) fn intersection_distance(&self, other: &Self) -> f64 {
        match (self.total() > 0.0, other.total() > 0.0) {
            (false, false) => 0.0,
            (true, true) => {
                let overlap: f64 = self
                    .probabilities()
                    .iter()
                    .zip(other.probabilities())
                    .map(|(p, q)| p.min(q))
                    .sum();
                (1.0 - overlap).max(0.0)
            }
            _ => 1.0,
        }
    }

    /// `½ Σ (p - q)² / (p + q)`, in `[0, 1]`.
    pub(crate) fn chi_square(&self, other: &Self) -> f64 {
        match (self.total() > 0.0, other.total() > 0.0) {
            (false, false) => 0.0,
            (true, true) => {
                0.5 * self
                    .probabilities()
                    .iter()
                    .zip(other.probabilities())
                    .filter(|(p, q)| *p + *q > 0.0)
                    .map(|(p, q)| (p - q) * (p - q) / (p + q))
                    .sum::<f64>()
            }
            _ => 1.0,
        }
    }
}

/// Shannon entropy in bits of a count vector.
pub(crate) fn entropy_bits(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            p * p.log2()
        })
        .sum::<f64>()
}

// ── Gaussian ─────────────────────────────────────────────────────────────────

/// Ridge added to covariance diagonals so they stay positive definite.
const COVARIANCE_RIDGE: f64 = 1e-3;

/// Mean and regularized covariance of a set of vectors.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Gaussian {
    mean: Vec<f64>,
    covariance: Vec<f64>,
}

impl Gaussian {
    pub(crate) fn fit(vectors: &[Vec<f64>], dim: usize) -> Self {
        let n = vectors.len();
        let mut mean = vec![0.0; dim];
        for v in vectors {
            for (m, x) in mean.iter_mut().zip(v) {
                *m += x;
            }
        }
        if n > 0 {
            for m in &mut mean {
                *m /= n as f64;
            }
        }

        let mut covariance = vec![0.0; dim * dim];
        for v in vectors {
            for r in 0..dim {
                for c in 0..dim {
                    covariance[r * dim + c] += (v[r] - mean[r]) * (v[c] - mean[c]);
                }
            }
        }
        for (idx, value) in covariance.iter_mut().enumerate() {
            if n > 0 {
                *value /= n as f64;
            }
            if idx % (dim + 1) == 0 {
                *value += COVARIANCE_RIDGE;
            }
        }
        Self { mean, covariance }
    }

    /// Bhattacharyya distance between two Gaussians.
    ///
    /// Falls back to the Euclidean distance of the means if the pooled
    /// covariance is numerically singular.
    pub(crate) fn bhattacharyya(&self, other: &Self) -> f64 {
        let dim = self.mean.len();
        let pooled: Vec<f64> = self
            .covariance
            .iter()
            .zip(&other.covariance)
            .map(|(a, b)| 0.5 * (a + b))
            .collect();
        let delta: Vec<f64> = self.mean.iter().zip(&other.mean).map(|(a, b)| a - b).collect();

        let (Some(l_pooled), Some(l_a), Some(l_b)) = (
            cholesky(&pooled, dim),
            cholesky(&self.covariance, dim),
            cholesky(&other.covariance, dim),
        ) else {
            return euclidean(&self.mean, &other.mean);
        };

        let solved = cholesky_solve(&l_pooled, &delta, dim);
        let mahalanobis = dot(&delta, &solved);
        let log_ratio =
            log_det(&l_pooled, dim) - 0.5 * (log_det(&l_a, dim) + log_det(&l_b, dim));
        (0.125 * mahalanobis + 0.5 * log_ratio).max(0.0)
    }
}

/// Lower Cholesky factor of a symmetric positive-definite `dim x dim` matrix.
pub(crate) fn cholesky(m: &[f64], dim: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i * dim + k] * l[j * dim + k]).sum();
            if i == j {
                let diag = m[i * dim + i] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[i * dim + j] = diag.sqrt();
            } else {
                l[i * dim + j] = (m[i * dim + j] - sum) / l[j * dim + j];
            }
        }
    }
    Some(l)
}

/// Solve `L Lᵀ x = b` for `x`.
pub(crate) fn cholesky_solve(l: &[f64], b: &[f64], dim: usize) -> Vec<f64> {
    let mut y = vec![0.0; dim];
    for i in 0..dim {
        let sum: f64 = (0..i).map(|k| l[i * dim + k] * y[k]).sum();
        y[i] = (b[i] - sum) / l[i * dim + i];
    }
    let mut x = vec![0.0; dim];
    for i in (0..dim).rev() {
        let sum: f64 = (i + 1..dim).map(|k| l[k * dim + i] * x[k]).sum();
        x[i] = (y[i] - sum) / l[i * dim + i];
    }
    x
}

fn log_det(l: &[f64], dim: usize) -> f64 {
    2.0 * (0..dim).map(|i| l[i * dim + i].ln()).sum::<f64>()
}

/// Eigenvalues of a symmetric `dim x dim` matrix.
pub(crate) fn symmetric_eigenvalues(m: &[f64], dim: usize) -> Vec<f64> {
    symmetric_eigen(m, dim).0
}

/// Eigenvalues and eigenvectors of a symmetric `dim x dim` matrix by cyclic
/// Jacobi rotations.
///
/// Eigenvector `i` is column `i` of the returned row-major matrix. Neither
/// output is sorted.
pub(crate) fn symmetric_eigen(m: &[f64], dim: usize) -> (Vec<f64>, Vec<f64>) {
    let mut a = m.to_vec();
    let mut v = vec![0.0; dim * dim];
    for i in 0..dim {
        v[i * dim + i] = 1.0;
    }
    for _sweep in 0..64 {
        let off: f64 = (0..dim)
            .flat_map(|p| (p + 1..dim).map(move |q| (p, q)))
            .map(|(p, q)| a[p * dim + q] * a[p * dim + q])
            .sum();
        if off < 1e-22 {
            break;
        }
        for p in 0..dim {
            for q in p + 1..dim {
                let apq = a[p * dim + q];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a[q * dim + q] - a[p * dim + p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..dim {
                    let akp = a[k * dim + p];
                    let akq = a[k * dim + q];
                    a[k * dim + p] = c * akp - s * akq;
                    a[k * dim + q] = s * akp + c * akq;
                }
                for k in 0..dim {
                    let apk = a[p * dim + k];
                    let aqk = a[q * dim + k];
                    a[p * dim + k] = c * apk - s * aqk;
                    a[q * dim + k] = s * apk + c * aqk;
                }
                for k in 0..dim {
                    let vkp = v[k * dim + p];
                    let vkq = v[k * dim + q];
                    v[k * dim + p] = c * vkp - s * vkq;
                    v[k * dim + q] = s * vkp + c * vkq;
                }
            }
        }
    }
    ((0..dim).map(|i| a[i * dim + i]).collect(), v)
}

/// Mean angle between consecutive proper segments; 0 with fewer than two.
pub(crate) fn mean_turning_angle(points: &[f64], dim: usize) -> f64 {
    let segs = proper_segments(points, dim);
    let turns = segs.len().saturating_sub(1);
    if turns == 0 {
        return 0.0;
    }
    segs.windows(2).map(|pair| angle(&pair[0], &pair[1])).sum::<f64>() / turns as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_of_polyline() {
        let segs = segments(&[0.0, 0.0, 1.0, 0.0, 1.0, 2.0], 2);
        assert_eq!(segs, vec![vec![1.0, 0.0], vec![0.0, 2.0]]);
    }

    #[test]
    fn proper_segments_skip_padding() {
        let segs = proper_segments(&[0.0, 1.0, 1.0, 1.0], 1);
        assert_eq!(segs, vec![vec![1.0]]);
    }

    #[test]
    fn signed_turn_orientation() {
        let left = signed_turn(&[1.0, 0.0], &[0.0, 1.0]);
        let right = signed_turn(&[1.0, 0.0], &[0.0, -1.0]);
        assert!((left - PI / 2.0).abs() < 1e-12);
        assert!((right + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn histogram_distances_identical_are_zero() {
        let mut h = Histogram::new(4, 0.0, 1.0);
        h.add(0.1);
        h.add(0.6);
        assert!(h.bhattacharyya(&h) < 1e-7);
        assert!(h.intersection_distance(&h) < 1e-12);
        assert!(h.chi_square(&h) < 1e-12);
    }

    #[test]
    fn histogram_distances_disjoint_are_one() {
        let mut a = Histogram::new(4, 0.0, 1.0);
        let mut b = Histogram::new(4, 0.0, 1.0);
        a.add(0.1);
        b.add(0.9);
        assert!((a.bhattacharyya(&b) - 1.0).abs() < 1e-12);
        assert!((a.intersection_distance(&b) - 1.0).abs() < 1e-12);
        assert!((a.chi_square(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_uniform_counts() {
        assert!((entropy_bits(&[2.0, 2.0, 2.0, 2.0]) - 2.0).abs() < 1e-12);
        assert_eq!(entropy_bits(&[5.0, 0.0]), 0.0);
    }

    #[test]
    fn cholesky_solves_spd_system() {
        let m = [4.0, 2.0, 2.0, 3.0];
        let l = cholesky(&m, 2).unwrap();
        let x = cholesky_solve(&l, &[2.0, 1.0], 2);
        assert!((4.0 * x[0] + 2.0 * x[1] - 2.0).abs() < 1e-12);
        assert!((2.0 * x[0] + 3.0 * x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gaussian_self_distance_zero() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        let g = Gaussian::fit(&vectors, 2);
        assert!(g.bhattacharyya(&g).abs() < 1e-9);
    }

    #[test]
    fn jacobi_eigenvalues_of_symmetric_matrix() {
        let mut eig = symmetric_eigenvalues(&[2.0, 1.0, 1.0, 2.0], 2);
        eig.sort_by(f64::total_cmp);
        assert!((eig[0] - 1.0).abs() < 1e-10);
        assert!((eig[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn jacobi_eigenvectors_diagonalize() {
        let m = [4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        let (values, vectors) = symmetric_eigen(&m, 3);
        for (i, &lambda) in values.iter().enumerate() {
            let v: Vec<f64> = (0..3).map(|k| vectors[k * 3 + i]).collect();
            assert!((norm(&v) - 1.0).abs() < 1e-10);
            for r in 0..3 {
                let mv = dot(&m[r * 3..r * 3 + 3], &v);
                assert!((mv - lambda * v[r]).abs() < 1e-9, "column {i} row {r}");
            }
        }
    }

    #[test]
    fn turning_angle_of_square_corner_path() {
        // right, up, left: two quarter turns
        let points = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        assert!((mean_turning_angle(&points, 2) - PI / 2.0).abs() < 1e-12);
        assert_eq!(mean_turning_angle(&[0.0, 0.0, 2.0, 0.0], 2), 0.0);
        // padding repeats contribute nothing
        let padded = [0.0, 0.0, 1.0, 0.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0];
        assert!((mean_turning_angle(&padded, 2) - PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn direction_bins_in_range() {
        for seg in [vec![1.0], vec![-1.0], vec![0.0, -1.0], vec![-1.0, 0.0, -0.5]] {
            assert!(direction_bin(&seg) < DIRECTION_BINS);
        }
    }
}
