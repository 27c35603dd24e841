//! Run orchestration: preparation, initialization, the partition loop,
//! labeling and evaluation, plus the sequential metric sweep.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, warn};

use flowclust_metric::{
    Center, DataMatrix, Dissimilarity, Metric, MetricContext, PrincipalComponents,
};

use crate::config::{ClusterConfig, MedoidUpdate, Mode, SweepConfig};
use crate::error::ClusterError;
use crate::evaluate::{MatrixCache, evaluate, resolve_matrix};
use crate::init::initial_centers;
use crate::label::{Labeling, normalized_entropy, representative_rotation, representatives};
use crate::partition::{Partition, PartitionIterator, member_mean};
use crate::result::{ClusteringResult, SweepResult};

// ── run ───────────────────────────────────────────────────────────────────────

/// Cluster `data` once under `config`.
///
/// A partition with fewer than two non-empty clusters is returned with
/// `entropy` and `evaluation` left empty.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::InsufficientData`] | A sample-based initializer needs more distinct lines than exist |
/// | [`ClusterError::Metric`] | The metric context does not match the data |
#[instrument(skip(data, config, cache), fields(n = data.rows(), k = config.k, metric = %config.metric))]
pub(crate) fn run(
    data: &DataMatrix,
    config: &ClusterConfig,
    cache: Option<&dyn MatrixCache>,
) -> Result<ClusteringResult, ClusterError> {
    let context = MetricContext::prepare(data, config.metric);
    let dissim = Dissimilarity::new(data, &context)?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let initial = initial_centers(&dissim, config.k, config.init, &mut rng)?;
    let partition = PartitionIterator::new(dissim, config, initial)?.run()?;

    // a sample medoid is its own closest member
    let with_closest = config.mode != Mode::KMedoids(MedoidUpdate::Sample);
    finish(&dissim, partition, with_closest, config.distance_cache, cache, None)
}

/// Cluster the principal component projection of `data` with K-means.
///
/// Only the partition comes from the reduced space: centers are member means
/// of the full lines, and representatives and evaluation use the Euclidean
/// metric on the full lines. `config.mode` and `config.metric` are ignored.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::Metric`] | `variance` is outside `(0, 1]` |
/// | [`ClusterError::InsufficientData`] | A sample-based initializer needs more distinct projected lines than exist |
#[instrument(skip(data, config, cache), fields(n = data.rows(), k = config.k))]
pub(crate) fn pca_baseline(
    data: &DataMatrix,
    config: &ClusterConfig,
    variance: f64,
    cache: Option<&dyn MatrixCache>,
) -> Result<ClusteringResult, ClusterError> {
    let pca = PrincipalComponents::fit(data, variance)?;
    let projected = pca.project(data)?;
    info!(
        n_components = pca.n_components(),
        explained = pca.explained_variance(),
        "lines projected on principal components"
    );

    let reduced_context = MetricContext::prepare(&projected, Metric::Euclidean);
    let reduced = Dissimilarity::new(&projected, &reduced_context)?;
    let kmeans = config.clone().with_mode(Mode::KMeans);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let initial = initial_centers(&reduced, config.k, config.init, &mut rng)?;
    let mut partition = PartitionIterator::new(reduced, &kmeans, initial)?.run()?;

    let context = MetricContext::prepare(data, Metric::Euclidean);
    let dissim = Dissimilarity::new(data, &context)?;
    let cols = data.cols();
    let mut centers = vec![0.0; partition.neighbors.len() * cols];
    for (members, center) in partition.neighbors.iter().zip(centers.chunks_exact_mut(cols)) {
        if !members.is_empty() {
            member_mean(&dissim, members, center);
        }
    }
    partition.centers = centers;

    finish(
        &dissim,
        partition,
        true,
        config.distance_cache,
        cache,
        Some(pca.n_components()),
    )
}

/// Label, describe and evaluate a finished partition of `dissim`'s data.
///
/// `partition.centers` must be rows of that data's width.
fn finish(
    dissim: &Dissimilarity<'_>,
    partition: Partition,
    with_closest: bool,
    distance_cache: bool,
    cache: Option<&dyn MatrixCache>,
    principal_components: Option<usize>,
) -> Result<ClusteringResult, ClusterError> {
    let data = dissim.data();
    let labeling = Labeling::canonical(&partition.neighbors, data.rows());
    let cols = data.cols();
    let centers: Vec<Center> = labeling
        .raw
        .iter()
        .map(|&c| dissim.center(partition.centers[c * cols..(c + 1) * cols].to_vec()))
        .collect::<Result<_, _>>()?;
    let members = labeling.members();

    let representatives = representatives(dissim, &centers, &members, with_closest);
    let rotation = representative_rotation(data, &representatives);

    let n_groups = labeling.n_groups();
    let (entropy, evaluation) = if n_groups < 2 {
        warn!(n_groups, "degenerate clustering, evaluation skipped");
        (None, None)
    } else {
        let evaluation = if distance_cache {
            let matrix = resolve_matrix(dissim, cache);
            evaluate(&matrix, dissim, &centers, &labeling.labels)?
        } else {
            evaluate(dissim, dissim, &centers, &labeling.labels)?
        };
        (normalized_entropy(&labeling.sizes), Some(evaluation))
    };

    info!(
        n_groups,
        iterations = partition.iterations,
        converged = partition.converged,
        entropy = ?entropy,
        closest_rotation = ?rotation.closest,
        furthest_rotation = rotation.furthest,
        "clustering complete"
    );

    Ok(ClusteringResult {
        metric: dissim.metric(),
        labels: labeling.labels,
        sizes: labeling.sizes,
        representatives,
        rotation,
        entropy,
        evaluation,
        iterations: partition.iterations,
        converged: partition.converged,
        principal_components,
    })
}

// ── sweep ─────────────────────────────────────────────────────────────────────

/// Run the principal component baseline, then every configured metric in
/// order with otherwise identical settings.
///
/// # Errors
///
/// Propagates the first [`ClusterError`] from the baseline or any metric.
#[instrument(skip(data, config, cache), fields(k = config.k, n_metrics = config.metrics.len()))]
pub(crate) fn sweep(
    data: &DataMatrix,
    config: &SweepConfig,
    cache: Option<&dyn MatrixCache>,
) -> Result<SweepResult, ClusterError> {
    let baseline = if config.pca_baseline {
        let result = pca_baseline(
            data,
            &config.run_config(Metric::Euclidean),
            config.pca_variance,
            cache,
        )?;
        debug!(
            n_components = ?result.principal_components,
            n_groups = result.n_groups(),
            "baseline complete"
        );
        Some(result)
    } else {
        None
    };

    let mut results = Vec::with_capacity(config.metrics.len());
    for &metric in &config.metrics {
        let result = run(data, &config.run_config(metric), cache)?;
        debug!(%metric, n_groups = result.n_groups(), "metric complete");
        results.push(result);
    }

    info!(n_metrics = results.len(), baseline = baseline.is_some(), "sweep complete");
    Ok(SweepResult { baseline, results })
}

// ── tests ─────────────────────────────────────────────────────────────────────
