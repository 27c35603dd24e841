//! JSON result writer for clustering runs and metric sweeps.

use std::fs;
use std::path::{Path, PathBuf};

use flowclust_cluster::{ClusteringResult, MetricSummary, SweepResult};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::IoError;

/// Writes clustering and sweep results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_metric{m}_cluster.json` (one per
/// metric index `m`), `{experiment}_pca_cluster.json` for the principal
/// component baseline and `{experiment}_sweep.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write one clustering result to `{experiment}_metric{m}_cluster.json`,
    /// or `{experiment}_pca_cluster.json` for a baseline, and return the path
    /// written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The artifact cannot be serialized |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(metric = %result.metric))]
    pub fn write_cluster(&self, result: &ClusteringResult) -> Result<PathBuf, IoError> {
        let name = match result.principal_components {
            Some(_) => format!("{}_pca_cluster.json", self.experiment.as_str()),
            None => format!(
                "{}_metric{}_cluster.json",
                self.experiment.as_str(),
                result.metric.index()
            ),
        };
        let path = self.output_dir.join(name);

        let representatives = result
            .representatives
            .iter()
            .map(|r| RepresentativeEntry {
                label: r.label.index(),
                size: result.sizes[r.label.index()],
                closest: r.closest,
                furthest: r.furthest,
                center: &r.center,
            })
            .collect();

        let evaluation = result.evaluation.as_ref().map(|e| EvaluationEntry {
            mean_silhouette: e.silhouette.mean_score,
            cluster_silhouette: &e.silhouette.per_cluster,
            line_silhouette: e.silhouette.per_sample.iter().map(|s| s.score).collect(),
            validity: e.validity,
            gamma: e.gamma,
            davies_bouldin: e.davies_bouldin,
        });

        let artifact = ClusterArtifact {
            experiment: self.experiment.as_str(),
            metric: result.metric.index(),
            metric_name: result.metric.name(),
            principal_components: result.principal_components,
            n_lines: result.labels.len(),
            n_groups: result.n_groups(),
            iterations: result.iterations,
            converged: result.converged,
            entropy: result.entropy,
            labels: result.labels.iter().map(|l| l.index()).collect(),
            line_cluster_sizes: result.line_cluster_sizes(),
            cluster_sizes: &result.sizes,
            representatives,
            closest_rotation: result.rotation.closest,
            furthest_rotation: result.rotation.furthest,
            evaluation,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "cluster result written");
        Ok(path)
    }

    /// Write a sweep summary to `{experiment}_sweep.json` and return the path written.
    ///
    /// Only the baseline and per-metric summary rows are written; call
    /// [`write_cluster`](Self::write_cluster) for each run's full result.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The artifact cannot be serialized |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_metrics = result.results.len()))]
    pub fn write_sweep(&self, k: usize, result: &SweepResult) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_sweep.json", self.experiment.as_str()));

        let artifact = SweepArtifact {
            experiment: self.experiment.as_str(),
            k,
            n_lines: result.n_lines(),
            baseline: result.baseline_summary().map(SummaryEntry::from),
            metrics: result.summaries().into_iter().map(SummaryEntry::from).collect(),
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "sweep result written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ClusterArtifact<'a> {
    experiment: &'a str,
    metric: usize,
    metric_name: &'static str,
    principal_components: Option<usize>,
    n_lines: usize,
    n_groups: usize,
    iterations: usize,
    converged: bool,
    entropy: Option<f64>,
    labels: Vec<usize>,
    line_cluster_sizes: Vec<usize>,
    cluster_sizes: &'a [usize],
    representatives: Vec<RepresentativeEntry<'a>>,
    closest_rotation: Option<f64>,
    furthest_rotation: f64,
    evaluation: Option<EvaluationEntry<'a>>,
}

#[derive(Serialize)]
struct RepresentativeEntry<'a> {
    label: usize,
    size: usize,
    closest: Option<usize>,
    furthest: usize,
    center: &'a [f64],
}

#[derive(Serialize)]
struct EvaluationEntry<'a> {
    mean_silhouette: f64,
    cluster_silhouette: &'a [f64],
    line_silhouette: Vec<f64>,
    validity: f64,
    gamma: f64,
    davies_bouldin: f64,
}

#[derive(Serialize)]
struct SweepArtifact<'a> {
    experiment: &'a str,
    k: usize,
    n_lines: usize,
    baseline: Option<SummaryEntry>,
    metrics: Vec<SummaryEntry>,
}

#[derive(Serialize)]
struct SummaryEntry {
    metric: usize,
    metric_name: &'static str,
    principal_components: Option<usize>,
    n_groups: usize,
    iterations: usize,
    converged: bool,
    entropy: Option<f64>,
    mean_silhouette: Option<f64>,
    validity: Option<f64>,
    gamma: Option<f64>,
    davies_bouldin: Option<f64>,
    closest_rotation: Option<f64>,
    furthest_rotation: f64,
}

impl From<MetricSummary> for SummaryEntry {
    fn from(s: MetricSummary) -> Self {
        Self {
            metric: s.metric.index(),
            metric_name: s.metric.name(),
            principal_components: s.principal_components,
            n_groups: s.n_groups,
            iterations: s.iterations,
            converged: s.converged,
            entropy: s.entropy,
            mean_silhouette: s.mean_silhouette,
            validity: s.validity,
            gamma: s.gamma,
            davies_bouldin: s.davies_bouldin,
            closest_rotation: s.closest_rotation,
            furthest_rotation: s.furthest_rotation,
        }
    }
}
