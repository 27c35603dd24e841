//! Error types for data validation and dissimilarity evaluation.

/// Errors from building a [`DataMatrix`](crate::DataMatrix) or evaluating a metric.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    /// Returned when a data matrix is built without any line.
    #[error("data matrix must contain at least one line")]
    EmptyData,

    /// Returned when the point dimension is zero or does not divide the row width.
    #[error("row width {width} is not a positive multiple of point dimension {dimension}")]
    InvalidPointDimension {
        /// Number of columns per row.
        width: usize,
        /// Requested point dimension.
        dimension: usize,
    },

    /// Returned when a row has a different width than the first row.
    #[error("row {row} has {got} columns, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
    },

    /// Returned when a value is NaN or infinite.
    #[error("non-finite value at row {row}, column {column}")]
    NonFiniteValue {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
    },

    /// Returned when an original line length is zero or exceeds the element budget.
    #[error("line {row} has original length {length}, expected 1..={budget}")]
    InvalidLength {
        /// Zero-based row index.
        row: usize,
        /// The rejected length.
        length: usize,
        /// Number of points per padded row.
        budget: usize,
    },

    /// Returned when the number of original lengths does not match the row count.
    #[error("got {got} original lengths for {rows} lines")]
    LengthCount {
        /// Number of rows in the matrix.
        rows: usize,
        /// Number of lengths supplied.
        got: usize,
    },

    /// Returned when a center vector and a data row have different widths.
    #[error("center has {got} columns, data rows have {expected}")]
    InvalidDimension {
        /// Data row width.
        expected: usize,
        /// Center width.
        got: usize,
    },

    /// Returned when a metric index is outside `0..=16`.
    #[error("unknown metric index {index} (expected 0..=16)")]
    InvalidMetric {
        /// The rejected index.
        index: usize,
    },

    /// Returned when a retained-variance fraction is outside `(0, 1]`.
    #[error("retained variance fraction {value} is outside (0, 1]")]
    InvalidVariance {
        /// The rejected fraction.
        value: f64,
    },

    /// Returned when a metric context was prepared for a different data matrix.
    #[error("metric context covers {context_rows} lines, data matrix has {data_rows}")]
    ContextMismatch {
        /// Lines covered by the context.
        context_rows: usize,
        /// Lines in the data matrix.
        data_rows: usize,
    },
}

/// Errors from reading a persisted distance matrix.
#[derive(Debug, thiserror::Error)]
pub enum MatrixReadError {
    /// Returned when the underlying reader fails.
    #[error("failed to read distance matrix")]
    Io(#[from] std::io::Error),

    /// Returned when a cell cannot be parsed as a finite number.
    #[error("invalid cell \"{raw}\" at row {row}, column {column}")]
    InvalidCell {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
        /// The raw token.
        raw: String,
    },

    /// Returned when the persisted matrix does not have the expected shape.
    #[error("distance matrix shape mismatch: expected {expected}x{expected}, row {row} has {got} cells")]
    ShapeMismatch {
        /// Expected row and column count.
        expected: usize,
        /// Row at which the mismatch was detected (equals `expected` when rows are missing or extra).
        row: usize,
        /// Cells found in that row (or rows found in total).
        got: usize,
    },
}
