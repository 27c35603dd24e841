//! I/O error types for flowclust-io.

use std::path::PathBuf;

use flowclust_metric::MetricError;

/// Errors from line file parsing, padding, result serialization and the matrix cache.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the record parser encounters a malformed record.
    #[error("parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the line file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file holds no line at all.
    #[error("empty dataset (no lines) in {path}")]
    EmptyDataset {
        /// Path to the line file.
        path: PathBuf,
    },

    /// Returned when a record's coordinate count is not a multiple of the point dimension.
    #[error("line {row_index} in {path} has {count} coordinates, not a multiple of dimension {dimension}")]
    CoordinateCount {
        /// Path to the line file.
        path: PathBuf,
        /// Zero-based line index (blank records excluded).
        row_index: usize,
        /// Number of coordinates on the line.
        count: usize,
        /// Point dimension.
        dimension: usize,
    },

    /// Returned when a coordinate is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: line {row_index}, coordinate {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the line file.
        path: PathBuf,
        /// Zero-based line index (blank records excluded).
        row_index: usize,
        /// Zero-based coordinate index within the line.
        col_index: usize,
        /// The raw token that failed to parse.
        raw: String,
    },

    /// Returned when the point dimension or the element budget is zero.
    #[error("invalid {name}: must be at least 1")]
    InvalidParameter {
        /// Name of the rejected parameter.
        name: &'static str,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output or cache directory cannot be created.
    #[error("cannot create directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result artifact cannot be serialized.
    #[error("cannot serialize {path}")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying serializer error.
        source: serde_json::Error,
    },

    /// Returned when padded lines do not form a valid data matrix.
    #[error(transparent)]
    Metric(#[from] MetricError),
}
