use flowclust_metric::MetricError;

/// Errors from partition clustering and its evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Returned when fewer than two clusters are requested.
    #[error("k must be at least 2, got {k}")]
    InvalidK {
        /// The invalid k value provided.
        k: usize,
    },

    /// Returned when a sample-based initializer needs more distinct lines than exist.
    #[error("need at least {k} distinct lines to seed {k} clusters, got {n_distinct}")]
    InsufficientData {
        /// Number of distinct lines in the data.
        n_distinct: usize,
        /// Requested number of clusters.
        k: usize,
    },

    /// Returned when an evaluation needs at least two non-empty clusters.
    #[error("evaluation needs at least 2 non-empty clusters, got {n_groups}")]
    DegenerateClustering {
        /// Number of non-empty clusters found.
        n_groups: usize,
    },

    /// Returned when a metric sweep is configured without any metric.
    #[error("metric sweep needs at least one metric")]
    EmptySweep,

    /// Wraps a data or metric error.
    #[error(transparent)]
    Metric(#[from] MetricError),
}
