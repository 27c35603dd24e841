//! Result types for a clustering run and a metric sweep.

use flowclust_metric::Metric;

use crate::evaluate::Evaluation;
use crate::label::{ClusterLabel, Representative, RepresentativeRotation};

/// Result of one clustering run.
#[derive(Debug, Clone)]
pub struct ClusteringResult {
    /// Metric the run used.
    pub metric: Metric,
    /// Canonical cluster of every input line.
    pub labels: Vec<ClusterLabel>,
    /// Size of every canonical cluster, non-decreasing.
    pub sizes: Vec<usize>,
    /// Closest/furthest members and center of every canonical cluster.
    pub representatives: Vec<Representative>,
    /// Average turning of the closest and furthest members.
    pub rotation: RepresentativeRotation,
    /// Normalized entropy of the cluster sizes; `None` with fewer than two clusters.
    pub entropy: Option<f64>,
    /// Quality measures; `None` when the partition is degenerate.
    pub evaluation: Option<Evaluation>,
    /// Number of assignment–update iterations performed.
    pub iterations: usize,
    /// Whether the loop converged before the iteration cap.
    pub converged: bool,
    /// Number of principal components the lines were clustered on; `None`
    /// when the run clustered the full lines under `metric`.
    pub principal_components: Option<usize>,
}

impl ClusteringResult {
    /// Return the number of non-empty clusters.
    #[must_use]
    pub fn n_groups(&self) -> usize {
        self.sizes.len()
    }

    /// Return, for every line, the size of the cluster it belongs to.
    #[must_use]
    pub fn line_cluster_sizes(&self) -> Vec<usize> {
        self.labels.iter().map(|l| self.sizes[l.index()]).collect()
    }

    /// Return the indices of all lines labeled `label`, ascending.
    #[must_use]
    pub fn members(&self, label: ClusterLabel) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| if l == label { Some(i) } else { None })
            .collect()
    }
}

/// One run's row in a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    /// The metric.
    pub metric: Metric,
    /// Principal components of the baseline row; `None` for metric rows.
    pub principal_components: Option<usize>,
    /// Number of non-empty clusters.
    pub n_groups: usize,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the loop converged.
    pub converged: bool,
    /// Normalized entropy.
    pub entropy: Option<f64>,
    /// Mean silhouette.
    pub mean_silhouette: Option<f64>,
    /// Validity index.
    pub validity: Option<f64>,
    /// Gamma statistic.
    pub gamma: Option<f64>,
    /// Davies–Bouldin index.
    pub davies_bouldin: Option<f64>,
    /// Average turning of the closest members.
    pub closest_rotation: Option<f64>,
    /// Average turning of the furthest members.
    pub furthest_rotation: f64,
}

impl From<&ClusteringResult> for MetricSummary {
    fn from(result: &ClusteringResult) -> Self {
        let eval = result.evaluation.as_ref();
        Self {
            metric: result.metric,
            principal_components: result.principal_components,
            n_groups: result.n_groups(),
            iterations: result.iterations,
            converged: result.converged,
            entropy: result.entropy,
            mean_silhouette: eval.map(|e| e.silhouette.mean_score),
            validity: eval.map(|e| e.validity),
            gamma: eval.map(|e| e.gamma),
            davies_bouldin: eval.map(|e| e.davies_bouldin),
            closest_rotation: result.rotation.closest,
            furthest_rotation: result.rotation.furthest,
        }
    }
}

/// Result of a metric sweep, one run per metric in configured order.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Principal component baseline; `None` when disabled.
    pub baseline: Option<ClusteringResult>,
    /// Full result of every metric's run.
    pub results: Vec<ClusteringResult>,
}

impl SweepResult {
    /// Return one summary row per metric.
    #[must_use]
    pub fn summaries(&self) -> Vec<MetricSummary> {
        self.results.iter().map(MetricSummary::from).collect()
    }

    /// Return the baseline's summary row.
    #[must_use]
    pub fn baseline_summary(&self) -> Option<MetricSummary> {
        self.baseline.as_ref().map(MetricSummary::from)
    }

    /// Return the number of clustered lines.
    #[must_use]
    pub fn n_lines(&self) -> usize {
        self.baseline
            .iter()
            .chain(&self.results)
            .next()
            .map_or(0, |r| r.labels.len())
    }
}
