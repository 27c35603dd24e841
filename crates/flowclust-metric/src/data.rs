//! Dense line matrix with validation guarantees.

use crate::error::MetricError;
use crate::geometry::mean_turning_angle;

/// Dense `rows x cols` matrix holding one padded line per row.
///
/// Each row stores `n_points` points of `dimension` coordinates laid out as
/// `x0 y0 z0 x1 y1 z1 ...`. Alongside the padded values the matrix remembers
/// how many points of each line are real (its original length), which some
/// metrics use to ignore padding.
///
/// Guaranteed non-empty, rectangular and finite.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
    dimension: usize,
    lengths: Vec<usize>,
}

impl DataMatrix {
    /// Build a matrix from equal-width rows of `dimension`-dimensional points.
    ///
    /// Every line's original length defaults to the full element budget.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MetricError::EmptyData`] | `rows` is empty or rows have zero width |
    /// | [`MetricError::InvalidPointDimension`] | `dimension` is zero or does not divide the row width |
    /// | [`MetricError::RaggedRow`] | A row differs in width from the first row |
    /// | [`MetricError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn from_rows(rows: Vec<Vec<f64>>, dimension: usize) -> Result<Self, MetricError> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || cols == 0 {
            return Err(MetricError::EmptyData);
        }
        if dimension == 0 || cols % dimension != 0 {
            return Err(MetricError::InvalidPointDimension { width: cols, dimension });
        }

        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * cols);
        for (row, line) in rows.into_iter().enumerate() {
            if line.len() != cols {
                return Err(MetricError::RaggedRow { row, expected: cols, got: line.len() });
            }
            if let Some(column) = line.iter().position(|v| !v.is_finite()) {
                return Err(MetricError::NonFiniteValue { row, column });
            }
            values.extend(line);
        }

        let n_points = cols / dimension;
        Ok(Self {
            values,
            rows: n_rows,
            cols,
            dimension,
            lengths: vec![n_points; n_rows],
        })
    }

    /// Attach the number of real (unpadded) points of each line.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MetricError::LengthCount`] | `lengths.len()` differs from the row count |
    /// | [`MetricError::InvalidLength`] | A length is zero or exceeds [`n_points`](Self::n_points) |
    pub fn with_original_lengths(mut self, lengths: Vec<usize>) -> Result<Self, MetricError> {
        if lengths.len() != self.rows {
            return Err(MetricError::LengthCount { rows: self.rows, got: lengths.len() });
        }
        let budget = self.n_points();
        if let Some((row, &length)) = lengths
            .iter()
            .enumerate()
            .find(|&(_, &l)| l == 0 || l > budget)
        {
            return Err(MetricError::InvalidLength { row, length, budget });
        }
        self.lengths = lengths;
        Ok(self)
    }

    /// Return the number of lines.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Return the row width (element budget times dimension).
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Return the point dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the element budget, i.e. the number of points per padded row.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.cols / self.dimension
    }

    /// Return row `i` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rows`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over all rows in order.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.cols)
    }

    /// Return the number of real points of line `i`.
    #[must_use]
    pub fn original_length(&self, i: usize) -> usize {
        self.lengths[i]
    }

    /// Return the original lengths of all lines.
    #[must_use]
    pub fn original_lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Return row `i` truncated to its real points.
    #[must_use]
    pub fn unpadded_row(&self, i: usize) -> &[f64] {
        &self.row(i)[..self.original_length(i) * self.dimension]
    }

    /// Return the mean turning angle of line `i` in radians.
    ///
    /// Averages the angle between consecutive segments over the real points,
    /// skipping zero-length segments; 0 for a line with fewer than two
    /// proper segments.
    #[must_use]
    pub fn mean_turning_angle(&self, i: usize) -> f64 {
        mean_turning_angle(self.unpadded_row(i), self.dimension)
    }
}
