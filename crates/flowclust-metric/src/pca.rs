//! Principal component projection of a data matrix.
//!
//! Rows are centered on the column means and projected onto the leading
//! eigenvectors of their covariance, keeping as many components as it takes
//! to reach a retained-variance fraction. When rows are fewer than columns the
//! eigenproblem is solved on the `rows x rows` Gram matrix instead.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::data::DataMatrix;
use crate::error::MetricError;
use crate::geometry::symmetric_eigen;

/// Eigenvalues at or below this fraction of the total variance are discarded.
const EIGEN_FLOOR: f64 = 1e-12;

/// Leading principal axes of a data matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    mean: Vec<f64>,
    /// `n_components x cols`, one unit axis per row, by decreasing variance.
    components: Vec<f64>,
    explained: f64,
}

impl PrincipalComponents {
    /// Fit the smallest set of axes that retains at least `variance` of the
    /// total variance of `data`.
    ///
    /// Data without any spread yields a single axis along the first column.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidVariance`] if `variance` is not in `(0, 1]`.
    #[instrument(skip(data), fields(rows = data.rows(), cols = data.cols()))]
    pub fn fit(data: &DataMatrix, variance: f64) -> Result<Self, MetricError> {
        if !(variance > 0.0 && variance <= 1.0) {
            return Err(MetricError::InvalidVariance { value: variance });
        }

        let n = data.rows();
        let cols = data.cols();
        let mean = column_means(data);
        let centered: Vec<Vec<f64>> = data
            .iter_rows()
            .map(|row| row.iter().zip(&mean).map(|(v, m)| v - m).collect())
            .collect();

        // (eigenvalue, unit axis) pairs of the covariance
        let axes: Vec<(f64, Vec<f64>)> = if cols <= n {
            let cov = gram(cols, n, |s, j| centered[s][j]);
            let (values, vectors) = symmetric_eigen(&cov, cols);
            values
                .into_iter()
                .enumerate()
                .map(|(i, lambda)| (lambda, (0..cols).map(|k| vectors[k * cols + i]).collect()))
                .collect()
        } else {
            let outer = gram(n, cols, |s, j| centered[j][s]);
            let (values, vectors) = symmetric_eigen(&outer, n);
            values
                .into_iter()
                .enumerate()
                .filter(|&(_, lambda)| lambda > 0.0)
                .map(|(i, lambda)| {
                    let scale = (n as f64 * lambda).sqrt();
                    let axis = (0..cols)
                        .map(|c| {
                            (0..n).map(|r| centered[r][c] * vectors[r * n + i]).sum::<f64>()
                                / scale
                        })
                        .collect();
                    (lambda, axis)
                })
                .collect()
        };

        let mut axes: Vec<(f64, Vec<f64>)> =
            axes.into_iter().map(|(lambda, axis)| (lambda.max(0.0), axis)).collect();
        axes.sort_by(|a, b| b.0.total_cmp(&a.0));
        let total: f64 = axes.iter().map(|(lambda, _)| lambda).sum();

        if total <= 0.0 {
            let mut axis = vec![0.0; cols];
            axis[0] = 1.0;
            debug!("data has no spread, projecting on the first column");
            return Ok(Self { mean, components: axis, explained: 1.0 });
        }

        let mut components = Vec::new();
        let mut retained = 0.0;
        for (lambda, axis) in axes {
            if lambda <= EIGEN_FLOOR * total {
                break;
            }
            components.extend(axis);
            retained += lambda;
            if retained >= variance * total {
                break;
            }
        }

        let explained = retained / total;
        debug!(n_components = components.len() / cols, explained, "principal components fitted");
        Ok(Self { mean, components, explained })
    }

    /// Return the number of retained axes.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.components.len() / self.mean.len()
    }

    /// Return the fraction of the total variance the retained axes explain.
    #[must_use]
    pub fn explained_variance(&self) -> f64 {
        self.explained
    }

    /// Project every row of `data` onto the retained axes.
    ///
    /// The result has one row per line and one column per component, with
    /// point dimension 1.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidDimension`] if `data` rows are not as
    /// wide as the fitted rows.
    pub fn project(&self, data: &DataMatrix) -> Result<DataMatrix, MetricError> {
        let cols = self.mean.len();
        if data.cols() != cols {
            return Err(MetricError::InvalidDimension { expected: cols, got: data.cols() });
        }
        let rows: Vec<Vec<f64>> = (0..data.rows())
            .into_par_iter()
            .map(|i| {
                let row = data.row(i);
                self.components
                    .chunks_exact(cols)
                    .map(|axis| {
                        row.iter()
                            .zip(&self.mean)
                            .zip(axis)
                            .map(|((v, m), a)| (v - m) * a)
                            .sum()
                    })
                    .collect()
            })
            .collect();
        DataMatrix::from_rows(rows, 1)
    }
}

fn column_means(data: &DataMatrix) -> Vec<f64> {
    let mut mean = vec![0.0; data.cols()];
    for row in data.iter_rows() {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= data.rows() as f64;
    }
    mean
}

/// Symmetric `dim x dim` matrix of `Σ_s value(s, r) value(s, c) / samples`,
/// filled row by row in parallel.
fn gram<F>(dim: usize, samples: usize, value: F) -> Vec<f64>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let mut m = vec![0.0; dim * dim];
    m.par_chunks_mut(dim).enumerate().for_each(|(r, row)| {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = (0..samples).map(|s| value(s, r) * value(s, c)).sum::<f64>() / samples as f64;
        }
    });
    m
}
