//! Evaluation of a finished partition and the distance-matrix cache seam.

use std::io::{BufRead, Write};

use tracing::{debug, info, instrument, warn};

use flowclust_metric::{Center, Dissimilarity, DistanceMatrix, Metric, PairwiseDistance};

use crate::error::ClusterError;
use crate::label::ClusterLabel;
use crate::silhouette::{SilhouetteScore, compute_silhouette};
use crate::validity::{davies_bouldin, gamma_statistic, validity_index};

/// Persistent store for full pairwise distance matrices, keyed by metric.
///
/// The engine never sees paths; an implementation decides where matrices
/// live. Matrices travel in the plain-text form of
/// [`DistanceMatrix::write_text`].
pub trait MatrixCache {
    /// Open the stored matrix for `metric`, or `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Any I/O failure; the engine treats it as a cache miss.
    fn reader(&self, metric: Metric) -> std::io::Result<Option<Box<dyn BufRead + '_>>>;

    /// Open a sink that replaces the stored matrix for `metric`.
    ///
    /// # Errors
    ///
    /// Any I/O failure; the engine logs it and carries on.
    fn writer(&self, metric: Metric) -> std::io::Result<Box<dyn Write + '_>>;
}

/// Quality measures of a partition with at least two non-empty clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Per-line, per-cluster and overall silhouette.
    pub silhouette: SilhouetteScore,
    /// Mean compactness/separation ratio; lower is better.
    pub validity: f64,
    /// Correlation of dissimilarity with cluster boundaries.
    pub gamma: f64,
    /// Davies–Bouldin index; lower is better.
    pub davies_bouldin: f64,
}

/// Load the pairwise matrix for the active metric from `cache`, or build and store it.
///
/// A missing, unreadable or mis-shaped cached matrix is a cache miss; a failed
/// store is logged. Without a cache the matrix is built in memory only.
#[instrument(skip_all, fields(metric = %dissim.metric(), n = dissim.data().rows()))]
pub(crate) fn resolve_matrix(
    dissim: &Dissimilarity<'_>,
    cache: Option<&dyn MatrixCache>,
) -> DistanceMatrix {
    let metric = dissim.metric();
    let n = dissim.data().rows();

    if let Some(cache) = cache {
        match cache.reader(metric) {
            Ok(Some(reader)) => match DistanceMatrix::read_text(reader, n) {
                Ok(matrix) => {
                    info!("distance matrix loaded from cache");
                    return matrix;
                }
                Err(e) => warn!(error = %e, "cached distance matrix rejected, rebuilding"),
            },
            Ok(None) => debug!("no cached distance matrix"),
            Err(e) => warn!(error = %e, "distance matrix cache unreadable, rebuilding"),
        }
    }

    let matrix = dissim.pairwise();

    if let Some(cache) = cache {
        let stored = cache.writer(metric).and_then(|w| matrix.write_text(w));
        match stored {
            Ok(()) => info!("distance matrix stored in cache"),
            Err(e) => warn!(error = %e, "failed to store distance matrix"),
        }
    }
    matrix
}

/// Compute every quality measure of a labeled partition.
///
/// `distances` serves the pairwise measures; `centers` holds one prepared
/// center per canonical label for Davies–Bouldin.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::DegenerateClustering`] | Fewer than 2 non-empty clusters |
#[instrument(skip_all, fields(n = labels.len()))]
pub fn evaluate<D: PairwiseDistance + ?Sized>(
    distances: &D,
    dissim: &Dissimilarity<'_>,
    centers: &[Center],
    labels: &[ClusterLabel],
) -> Result<Evaluation, ClusterError> {
    let silhouette = compute_silhouette(distances, labels)?;
    let validity = validity_index(distances, labels)?;
    let gamma = gamma_statistic(distances, labels)?;
    let davies_bouldin = davies_bouldin(dissim, centers, labels)?;

    info!(
        mean_silhouette = silhouette.mean_score,
        validity, gamma, davies_bouldin, "evaluation complete"
    );
    Ok(Evaluation { silhouette, validity, gamma, davies_bouldin })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{BufRead, Cursor, Write};

    use flowclust_metric::{DataMatrix, Dissimilarity, Metric, MetricContext};

    use super::{MatrixCache, resolve_matrix};

    /// In-memory cache recording how often each side was used.
    #[derive(Default)]
    struct MemoryCache {
        stored: RefCell<Option<Vec<u8>>>,
        writes: RefCell<usize>,
    }

    /// Appends to the cache buffer as it is written.
    struct Sink<'a>(&'a MemoryCache);

    impl Write for Sink<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.stored.borrow_mut().get_or_insert_with(Vec::new).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl MatrixCache for MemoryCache {
        fn reader(&self, _metric: Metric) -> std::io::Result<Option<Box<dyn BufRead + '_>>> {
            Ok(self
                .stored
                .borrow()
                .clone()
                .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn BufRead>))
        }

        fn writer(&self, _metric: Metric) -> std::io::Result<Box<dyn Write + '_>> {
            *self.writes.borrow_mut() += 1;
            *self.stored.borrow_mut() = Some(Vec::new());
            Ok(Box::new(Sink(self)))
        }
    }

    fn data() -> DataMatrix {
        DataMatrix::from_rows(vec![vec![0.0, 0.0], vec![1.0, 0.5], vec![4.0, 4.0]], 1).unwrap()
    }

    #[test]
    fn builds_then_reuses_cached_matrix() {
        let data = data();
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let cache = MemoryCache::default();

        let first = resolve_matrix(&d, Some(&cache));
        assert_eq!(*cache.writes.borrow(), 1);
        let second = resolve_matrix(&d, Some(&cache));
        assert_eq!(*cache.writes.borrow(), 1, "second run must hit the cache");

        for i in 0..3 {
            for j in 0..3 {
                assert!((first.get(i, j) - second.get(i, j)).abs() < 1e-12);
                assert!((first.get(i, j) - d.between(i, j)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn mis_shaped_cache_is_a_miss() {
        let data = data();
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let cache = MemoryCache::default();
        *cache.stored.borrow_mut() = Some(b"0 1\n1 0\n".to_vec());

        let matrix = resolve_matrix(&d, Some(&cache));
        assert_eq!(matrix.len(), 3);
        assert_eq!(*cache.writes.borrow(), 1, "rebuilt matrix must be stored");
    }

    #[test]
    fn without_cache_builds_in_memory() {
        let data = data();
        let ctx = MetricContext::prepare(&data, Metric::Hausdorff);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let matrix = resolve_matrix(&d, None);
        assert_eq!(matrix.get(2, 0), d.between(2, 0));
    }
}
