//! Configuration builders for a single clustering run and for a metric sweep.

use flowclust_metric::{DataMatrix, Metric};

use crate::error::ClusterError;
use crate::evaluate::MatrixCache;
use crate::result::{ClusteringResult, SweepResult};

/// How a medoid is recomputed in K-medoids mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedoidUpdate {
    /// The member with the smallest summed dissimilarity to all other members.
    Sample,
    /// Weiszfeld approximation of the geometric median of the members.
    GeometricMedian,
}

/// Center update rule of the assignment–update loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Centers are member means (default).
    KMeans,
    /// Centers are medoids computed with the given update.
    KMedoids(MedoidUpdate),
}

/// Initialization strategy for the first K centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// Uniform random vectors inside the per-column bounding box of the data.
    RandomPositions,
    /// K distinct lines chosen uniformly without replacement (default).
    FromSamples,
    /// K-means++ seeding weighted by squared dissimilarity.
    FarthestSampling,
}

impl InitStrategy {
    /// Whether the strategy picks existing lines as centers.
    #[must_use]
    pub fn is_sample_based(self) -> bool {
        !matches!(self, InitStrategy::RandomPositions)
    }
}

/// Configuration for one clustering run.
///
/// Construct via [`ClusterConfig::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter        | Default                      |
/// |------------------|------------------------------|
/// | `mode`           | `Mode::KMeans`               |
/// | `init`           | `InitStrategy::FromSamples`  |
/// | `seed`           | 42                           |
/// | `max_iter`       | 20                           |
/// | `tol`            | 0.01                         |
/// | `distance_cache` | true                         |
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub(crate) k: usize,
    pub(crate) metric: Metric,
    pub(crate) mode: Mode,
    pub(crate) init: InitStrategy,
    pub(crate) seed: u64,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) distance_cache: bool,
}

impl ClusterConfig {
    /// Create a configuration for `k` clusters under `metric`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidK`] | `k < 2` |
    pub fn new(k: usize, metric: Metric) -> Result<Self, ClusterError> {
        if k < 2 {
            return Err(ClusterError::InvalidK { k });
        }
        Ok(Self {
            k,
            metric,
            mode: Mode::KMeans,
            init: InitStrategy::FromSamples,
            seed: 42,
            max_iter: 20,
            tol: 0.01,
            distance_cache: true,
        })
    }

    /// Set the center update rule.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initialization strategy.
    #[must_use]
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Set the random seed used by the initializer.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the iteration cap of the assignment–update loop.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the relative displacement change below which the loop stops.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Enable or disable the pairwise distance matrix used during evaluation.
    ///
    /// When disabled, evaluation computes every dissimilarity on demand and
    /// no [`MatrixCache`] is consulted.
    #[must_use]
    pub fn with_distance_cache(mut self, distance_cache: bool) -> Self {
        self.distance_cache = distance_cache;
        self
    }

    /// Return the number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the dissimilarity metric.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Return the center update rule.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Return the initialization strategy.
    #[must_use]
    pub fn init(&self) -> InitStrategy {
        self.init
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the iteration cap.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the convergence tolerance.
    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Return whether the evaluation distance matrix is enabled.
    #[must_use]
    pub fn distance_cache(&self) -> bool {
        self.distance_cache
    }

    /// Cluster `data` using this configuration, building any distance matrix in memory.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InsufficientData`] | A sample-based initializer needs more distinct lines than exist |
    pub fn fit(&self, data: &DataMatrix) -> Result<ClusteringResult, ClusterError> {
        crate::engine::run(data, self, None)
    }

    /// Cluster `data`, loading and storing the evaluation distance matrix through `cache`.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit). Cache failures are logged, never returned.
    pub fn fit_with_cache(
        &self,
        data: &DataMatrix,
        cache: &dyn MatrixCache,
    ) -> Result<ClusteringResult, ClusterError> {
        crate::engine::run(data, self, Some(cache))
    }
}

// ── SweepConfig ───────────────────────────────────────────────────────────────

/// Configuration for running the same clustering under several metrics.
///
/// Every metric runs with the same cluster count, mode, initializer and seed.
/// The sweep reports all metrics side by side and ranks none of them. Before
/// the metrics, a baseline clusters the principal component projection of the
/// lines with K-means.
///
/// # Defaults
///
/// Same as [`ClusterConfig`], plus:
///
/// | Parameter      | Default |
/// |----------------|---------|
/// | `pca_baseline` | true    |
/// | `pca_variance` | 0.9     |
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub(crate) k: usize,
    pub(crate) metrics: Vec<Metric>,
    pub(crate) mode: Mode,
    pub(crate) init: InitStrategy,
    pub(crate) seed: u64,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) distance_cache: bool,
    pub(crate) pca_baseline: bool,
    pub(crate) pca_variance: f64,
}

impl SweepConfig {
    /// Metric indices swept when none are given explicitly.
    pub const DEFAULT_METRICS: [usize; 8] = [0, 1, 2, 4, 12, 14, 15, 16];

    /// Create a sweep of `k` clusters over `metrics`, in the given order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidK`] | `k < 2` |
    /// | [`ClusterError::EmptySweep`] | `metrics` is empty |
    pub fn new(k: usize, metrics: Vec<Metric>) -> Result<Self, ClusterError> {
        if k < 2 {
            return Err(ClusterError::InvalidK { k });
        }
        if metrics.is_empty() {
            return Err(ClusterError::EmptySweep);
        }
        Ok(Self {
            k,
            metrics,
            mode: Mode::KMeans,
            init: InitStrategy::FromSamples,
            seed: 42,
            max_iter: 20,
            tol: 0.01,
            distance_cache: true,
            pca_baseline: true,
            pca_variance: 0.9,
        })
    }

    /// Return [`DEFAULT_METRICS`](Self::DEFAULT_METRICS) as metrics.
    #[must_use]
    pub fn default_metrics() -> Vec<Metric> {
        Self::DEFAULT_METRICS
            .iter()
            .filter_map(|&i| Metric::from_index(i).ok())
            .collect()
    }

    /// Set the center update rule.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initialization strategy.
    #[must_use]
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the iteration cap per metric.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Enable or disable the evaluation distance matrix.
    #[must_use]
    pub fn with_distance_cache(mut self, distance_cache: bool) -> Self {
        self.distance_cache = distance_cache;
        self
    }

    /// Enable or disable the principal component baseline.
    #[must_use]
    pub fn with_pca_baseline(mut self, pca_baseline: bool) -> Self {
        self.pca_baseline = pca_baseline;
        self
    }

    /// Set the fraction of the total variance the baseline projection retains.
    ///
    /// Checked when the sweep runs; values outside `(0, 1]` fail there.
    #[must_use]
    pub fn with_pca_variance(mut self, pca_variance: f64) -> Self {
        self.pca_variance = pca_variance;
        self
    }

    /// Return the number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the swept metrics in run order.
    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Return whether the principal component baseline runs.
    #[must_use]
    pub fn pca_baseline(&self) -> bool {
        self.pca_baseline
    }

    /// Return the variance fraction retained by the baseline projection.
    #[must_use]
    pub fn pca_variance(&self) -> f64 {
        self.pca_variance
    }

    /// Return the single-run configuration used for `metric`.
    #[must_use]
    pub fn run_config(&self, metric: Metric) -> ClusterConfig {
        ClusterConfig {
            k: self.k,
            metric,
            mode: self.mode,
            init: self.init,
            seed: self.seed,
            max_iter: self.max_iter,
            tol: self.tol,
            distance_cache: self.distance_cache,
        }
    }

    /// Run the baseline and every metric on `data`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::Metric`] | `pca_variance` is outside `(0, 1]` |
    ///
    /// Otherwise propagates the first [`ClusterError`] from the baseline or any metric.
    pub fn fit(
        &self,
        data: &DataMatrix,
        cache: Option<&dyn MatrixCache>,
    ) -> Result<SweepResult, ClusterError> {
        crate::engine::sweep(data, self, cache)
    }
}

#[cfg(test)]
mod tests {
    use flowclust_metric::Metric;

    use super::{ClusterConfig, InitStrategy, Mode, SweepConfig};
    use crate::error::ClusterError;

    #[test]
    fn new_valid_k() {
        let cfg = ClusterConfig::new(3, Metric::Euclidean).unwrap();
        assert_eq!(cfg.k(), 3);
        assert_eq!(cfg.metric(), Metric::Euclidean);
    }

    #[test]
    fn k_below_two_rejected() {
        for k in [0, 1] {
            let result = ClusterConfig::new(k, Metric::Euclidean);
            assert!(matches!(result, Err(ClusterError::InvalidK { k: got }) if got == k));
        }
    }

    #[test]
    fn defaults_are_correct() {
        let cfg = ClusterConfig::new(2, Metric::Hausdorff).unwrap();
        assert_eq!(cfg.mode(), Mode::KMeans);
        assert_eq!(cfg.init(), InitStrategy::FromSamples);
        assert_eq!(cfg.seed(), 42);
        assert_eq!(cfg.max_iter(), 20);
        assert!((cfg.tol() - 0.01).abs() < f64::EPSILON);
        assert!(cfg.distance_cache());
    }

    #[test]
    fn builder_chaining() {
        let cfg = ClusterConfig::new(4, Metric::Procrustes)
            .unwrap()
            .with_mode(Mode::KMedoids(super::MedoidUpdate::Sample))
            .with_init(InitStrategy::FarthestSampling)
            .with_seed(7)
            .with_distance_cache(false);
        assert_eq!(cfg.mode(), Mode::KMedoids(super::MedoidUpdate::Sample));
        assert_eq!(cfg.init(), InitStrategy::FarthestSampling);
        assert_eq!(cfg.seed(), 7);
        assert!(!cfg.distance_cache());
    }

    #[test]
    fn sweep_rejects_empty_metric_list() {
        assert!(matches!(SweepConfig::new(3, vec![]), Err(ClusterError::EmptySweep)));
        assert!(matches!(
            SweepConfig::new(1, vec![Metric::Euclidean]),
            Err(ClusterError::InvalidK { k: 1 })
        ));
    }

    #[test]
    fn sweep_default_metrics() {
        let metrics = SweepConfig::default_metrics();
        let indices: Vec<usize> = metrics.iter().map(|m| m.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 4, 12, 14, 15, 16]);
    }

    #[test]
    fn sweep_run_config_inherits_settings() {
        let sweep = SweepConfig::new(3, SweepConfig::default_metrics())
            .unwrap()
            .with_seed(9)
            .with_max_iter(5);
        let cfg = sweep.run_config(Metric::Entropy);
        assert_eq!(cfg.k(), 3);
        assert_eq!(cfg.metric(), Metric::Entropy);
        assert_eq!(cfg.seed(), 9);
        assert_eq!(cfg.max_iter(), 5);
        assert!(sweep.pca_baseline());
        assert!((sweep.pca_variance() - 0.9).abs() < f64::EPSILON);

        let sweep = sweep.with_pca_baseline(false).with_pca_variance(0.75);
        assert!(!sweep.pca_baseline());
        assert!((sweep.pca_variance() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn sample_based_strategies() {
        assert!(!InitStrategy::RandomPositions.is_sample_based());
        assert!(InitStrategy::FromSamples.is_sample_based());
        assert!(InitStrategy::FarthestSampling.is_sample_based());
    }
}
