//! Lower-triangular pairwise dissimilarity matrix and its plain-text form.

use std::io::{BufRead, Write};

use crate::dissimilarity::PairwiseDistance;
use crate::error::MatrixReadError;

/// Symmetric dissimilarity matrix stored as a lower-triangular flat vector.
///
/// For `n` lines, stores `n*(n-1)/2` values. Access is symmetric:
/// `get(i, j) == get(j, i)`. Diagonal is always zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Create a matrix from pre-computed lower-triangular data.
    ///
    /// `data` must contain exactly `n*(n-1)/2` elements, stored as
    /// `data[row*(row-1)/2 + col]` where `row > col`.
    pub(crate) fn from_raw(n: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n * n.saturating_sub(1) / 2);
        Self { n, data }
    }

    /// Map a flat lower-triangular index back to `(row, col)` with `row > col`.
    pub(crate) fn unflatten(flat_idx: usize) -> (usize, usize) {
        // flat_idx = i*(i-1)/2 + j, solve for i and correct float rounding
        let mut i = ((1.0 + (1.0 + 8.0 * flat_idx as f64).sqrt()) / 2.0).floor() as usize;
        while i * (i - 1) / 2 > flat_idx {
            i -= 1;
        }
        while (i + 1) * i / 2 <= flat_idx {
            i += 1;
        }
        (i, flat_idx - i * (i - 1) / 2)
    }

    /// Return the number of lines in the matrix.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if the matrix is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the dissimilarity between lines `i` and `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n` or `j >= n`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n, "row index {i} out of bounds for matrix of size {}", self.n);
        assert!(j < self.n, "column index {j} out of bounds for matrix of size {}", self.n);
        if i == j {
            return 0.0;
        }
        let (row, col) = if i > j { (i, j) } else { (j, i) };
        self.data[row * (row - 1) / 2 + col]
    }

    /// Iterate over all unique pairs `(i, j, value)` where `i > j`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (1..self.n).flat_map(move |i| (0..i).map(move |j| (i, j, self.data[i * (i - 1) / 2 + j])))
    }

    /// Return all values from line `i` to every line, diagonal included.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.n).map(|j| self.get(i, j)).collect()
    }

    /// Write the full square matrix, one space-separated row per line.
    ///
    /// # Errors
    ///
    /// Propagates any error from `writer`.
    pub fn write_text<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for i in 0..self.n {
            let mut first = true;
            for value in self.row(i) {
                if !first {
                    writer.write_all(b" ")?;
                }
                write!(writer, "{value}")?;
                first = false;
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }

    /// Read a full square matrix of `expected_n` rows written by
    /// [`write_text`](Self::write_text).
    ///
    /// Cells may be separated by any whitespace and blank lines are skipped.
    /// The diagonal is forced to zero and only the lower triangle is kept.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MatrixReadError::Io`] | The reader fails |
    /// | [`MatrixReadError::InvalidCell`] | A cell is not a finite number |
    /// | [`MatrixReadError::ShapeMismatch`] | A row has the wrong cell count, or the row count differs from `expected_n` |
    pub fn read_text<R: BufRead>(reader: R, expected_n: usize) -> Result<Self, MatrixReadError> {
        let mut data = Vec::with_capacity(expected_n * expected_n.saturating_sub(1) / 2);
        let mut row = 0;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if row >= expected_n {
                return Err(MatrixReadError::ShapeMismatch {
                    expected: expected_n,
                    row: expected_n,
                    got: row + 1,
                });
            }

            let mut cells = 0;
            for (column, raw) in line.split_whitespace().enumerate() {
                let value: f64 = raw
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite())
                    .ok_or_else(|| MatrixReadError::InvalidCell {
                        row,
                        column,
                        raw: raw.to_string(),
                    })?;
                if column < row {
                    data.push(value);
                }
                cells += 1;
            }
            if cells != expected_n {
                return Err(MatrixReadError::ShapeMismatch { expected: expected_n, row, got: cells });
            }
            row += 1;
        }

        if row != expected_n {
            return Err(MatrixReadError::ShapeMismatch { expected: expected_n, row: expected_n, got: row });
        }
        Ok(Self::from_raw(expected_n, data))
    }
}

impl PairwiseDistance for DistanceMatrix {
    fn n_lines(&self) -> usize {
        self.n
    }

    fn distance(&self, i: usize, j: usize) -> f64 {
        self.get(i, j)
    }
}
