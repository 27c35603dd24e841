//! The assignment–update loop shared by K-means and K-medoids.
//!
//! [`PartitionIterator`] is an explicit state machine: it starts in
//! [`Phase::Assign`] with the initial centers, alternates assign and update
//! passes, and ends in [`Phase::Done`] once the relative change of the center
//! displacement falls below the tolerance or the iteration cap is reached.

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use flowclust_metric::{Center, Dissimilarity, MetricError, PairwiseDistance};

use crate::config::{ClusterConfig, MedoidUpdate, Mode};
use crate::error::ClusterError;

/// Inner steps of one Weiszfeld geometric-median update.
const WEISZFELD_MAX_STEPS: usize = 10;
/// Relative shift below which the Weiszfeld iteration stops early.
const WEISZFELD_TOL: f64 = 0.02;
/// Distances at or below this get [`WEISZFELD_MAX_WEIGHT`].
const WEISZFELD_MIN_DISTANCE: f64 = 1e-8;
const WEISZFELD_MAX_WEIGHT: f64 = 1e8;

/// Position of the iterator in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Next step assigns every line to its nearest center.
    Assign,
    /// Next step recomputes centers from the current membership.
    Update,
    /// The loop has ended; `converged` is false when the iteration cap stopped it.
    Done { converged: bool },
}

/// Outcome of the convergence test after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Continue,
    Converged,
    Exhausted,
}

/// Decide whether to run another iteration.
///
/// `moving` is the largest center displacement of the iteration that just
/// finished, `previous` the one before it (`None` after the first iteration).
pub(crate) fn progress(
    iterations: usize,
    moving: f64,
    previous: Option<f64>,
    tol: f64,
    max_iter: usize,
) -> Progress {
    let settled = match previous {
        None => moving == 0.0,
        Some(prev) if prev == 0.0 => true,
        Some(prev) => (moving - prev).abs() / prev < tol,
    };
    if settled {
        Progress::Converged
    } else if iterations >= max_iter {
        Progress::Exhausted
    } else {
        Progress::Continue
    }
}

/// Final state of a finished loop.
#[derive(Debug, Clone)]
pub(crate) struct Partition {
    /// `k x cols` center rows after the last update.
    pub(crate) centers: Vec<f64>,
    /// Member lines of every raw cluster, ascending.
    pub(crate) neighbors: Vec<Vec<usize>>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

/// Assignment–update loop over one data matrix and one metric.
pub(crate) struct PartitionIterator<'a> {
    dissim: Dissimilarity<'a>,
    mode: Mode,
    k: usize,
    max_iter: usize,
    tol: f64,
    centers: Vec<f64>,
    prepared: Vec<Center>,
    assignments: Vec<usize>,
    neighbors: Vec<Vec<usize>>,
    previous: Option<f64>,
    iterations: usize,
    phase: Phase,
}

impl<'a> PartitionIterator<'a> {
    /// Start a loop from `centers`, a flat `k x cols` vector.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Metric`] if `centers` is not `k` data rows wide.
    pub(crate) fn new(
        dissim: Dissimilarity<'a>,
        config: &ClusterConfig,
        centers: Vec<f64>,
    ) -> Result<Self, ClusterError> {
        let cols = dissim.data().cols();
        if centers.len() != config.k * cols {
            return Err(MetricError::InvalidDimension {
                expected: config.k * cols,
                got: centers.len(),
            }
            .into());
        }
        let prepared = prepare_centers(&dissim, &centers)?;
        Ok(Self {
            dissim,
            mode: config.mode,
            k: config.k,
            max_iter: config.max_iter,
            tol: config.tol,
            centers,
            prepared,
            assignments: vec![0; dissim.data().rows()],
            neighbors: vec![Vec::new(); config.k],
            previous: None,
            iterations: 0,
            phase: Phase::Assign,
        })
    }

    /// Advance the state machine by one phase and return the new phase.
    ///
    /// # Errors
    ///
    /// Propagates [`ClusterError::Metric`] from preparing updated centers.
    pub(crate) fn step(&mut self) -> Result<Phase, ClusterError> {
        match self.phase {
            Phase::Assign => {
                self.assign();
                self.phase = Phase::Update;
            }
            Phase::Update => {
                let moving = self.update()?;
                self.iterations += 1;
                let outcome =
                    progress(self.iterations, moving, self.previous, self.tol, self.max_iter);
                debug!(iteration = self.iterations, moving, ?outcome, "iteration complete");
                self.previous = Some(moving);
                self.phase = match outcome {
                    Progress::Continue => Phase::Assign,
                    Progress::Converged => Phase::Done { converged: true },
                    Progress::Exhausted => Phase::Done { converged: false },
                };
            }
            Phase::Done { .. } => {}
        }
        Ok(self.phase)
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`step`](Self::step).
    #[instrument(skip(self), fields(k = self.k, mode = ?self.mode))]
    pub(crate) fn run(mut self) -> Result<Partition, ClusterError> {
        loop {
            if let Phase::Done { converged } = self.step()? {
                info!(iterations = self.iterations, converged, "partition loop finished");
                return Ok(Partition {
                    centers: self.centers,
                    neighbors: self.neighbors,
                    iterations: self.iterations,
                    converged,
                });
            }
        }
    }

    /// Assign every line to its nearest center (ties to the lowest index)
    /// and rebuild the neighbor lists.
    #[instrument(skip(self), fields(iteration = self.iterations))]
    fn assign(&mut self) {
        let dissim = self.dissim;
        let prepared = &self.prepared;
        let n = dissim.data().rows();

        self.assignments = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut best_label = 0usize;
                let mut best_dist = f64::INFINITY;
                for (c, center) in prepared.iter().enumerate() {
                    let d = dissim.to_center(center, i);
                    if d < best_dist {
                        best_dist = d;
                        best_label = c;
                    }
                }
                best_label
            })
            .collect();
        self.neighbors = neighbor_lists(&self.assignments, self.k);
    }

    /// Recompute every non-empty center in parallel and return the largest
    /// displacement. Empty clusters keep their center.
    #[instrument(skip(self), fields(iteration = self.iterations))]
    fn update(&mut self) -> Result<f64, ClusterError> {
        let dissim = self.dissim;
        let cols = dissim.data().cols();
        let mode = self.mode;
        let neighbors = &self.neighbors;
        let previous = self.centers.clone();

        self.centers
            .par_chunks_mut(cols)
            .enumerate()
            .try_for_each(|(c, center)| -> Result<(), MetricError> {
                let members = &neighbors[c];
                if members.is_empty() {
                    return Ok(());
                }
                match mode {
                    Mode::KMeans => member_mean(&dissim, members, center),
                    Mode::KMedoids(MedoidUpdate::Sample) => {
                        let medoid = sample_medoid(&dissim, members);
                        center.copy_from_slice(dissim.data().row(medoid));
                    }
                    Mode::KMedoids(MedoidUpdate::GeometricMedian) => {
                        geometric_median(&dissim, members, center)?;
                    }
                }
                Ok(())
            })?;

        let moving = previous
            .par_chunks(cols)
            .zip(self.centers.par_chunks(cols))
            .zip(self.neighbors.par_iter())
            .filter(|(_, members)| !members.is_empty())
            .map(|((old, new), _)| displacement(old, new))
            .reduce(|| 0.0, f64::max);

        self.prepared = prepare_centers(&dissim, &self.centers)?;
        Ok(moving)
    }
}

/// Per-cluster member lists in ascending line order.
///
/// Each rayon worker accumulates its own lists; the reduction concatenates
/// them left to right, so no lock is taken and the order is preserved.
pub(crate) fn neighbor_lists(assignments: &[usize], k: usize) -> Vec<Vec<usize>> {
    assignments
        .par_iter()
        .enumerate()
        .fold(
            || vec![Vec::new(); k],
            |mut acc, (i, &c)| {
                acc[c].push(i);
                acc
            },
        )
        .reduce(
            || vec![Vec::new(); k],
            |mut left, right| {
                for (l, r) in left.iter_mut().zip(right) {
                    l.extend(r);
                }
                left
            },
        )
}

fn prepare_centers(dissim: &Dissimilarity<'_>, centers: &[f64]) -> Result<Vec<Center>, MetricError> {
    centers
        .par_chunks(dissim.data().cols())
        .map(|row| dissim.center(row.to_vec()))
        .collect()
}

/// Overwrite `center` with the mean of the member rows.
pub(crate) fn member_mean(dissim: &Dissimilarity<'_>, members: &[usize], center: &mut [f64]) {
    center.fill(0.0);
    for &i in members {
        for (acc, v) in center.iter_mut().zip(dissim.data().row(i)) {
            *acc += v;
        }
    }
    let count = members.len() as f64;
    for acc in center.iter_mut() {
        *acc /= count;
    }
}

/// The member with the smallest summed dissimilarity to all other members.
///
/// Ties go to the first member.
pub(crate) fn sample_medoid<D: PairwiseDistance + ?Sized>(distances: &D, members: &[usize]) -> usize {
    let m = members.len();
    let mut row_sums = vec![0.0; m];
    for a in 0..m {
        for b in a + 1..m {
            let d = distances.distance(members[a], members[b]);
            row_sums[a] += d;
            row_sums[b] += d;
        }
    }

    let mut best = 0;
    let mut best_sum = f64::INFINITY;
    for (pos, &sum) in row_sums.iter().enumerate() {
        if sum < best_sum {
            best_sum = sum;
            best = pos;
        }
    }
    members[best]
}

/// Move `center` toward the geometric median of `members` with Weiszfeld steps.
///
/// Each step re-weights members by the inverse of their dissimilarity to the
/// current estimate.
pub(crate) fn geometric_median(
    dissim: &Dissimilarity<'_>,
    members: &[usize],
    center: &mut [f64],
) -> Result<(), MetricError> {
    let data = dissim.data();
    for _ in 0..WEISZFELD_MAX_STEPS {
        let current = dissim.center(center.to_vec())?;

        let mut numerator = vec![0.0; center.len()];
        let mut denominator = 0.0;
        for &i in members {
            let d = dissim.to_center(&current, i);
            let weight = if d > WEISZFELD_MIN_DISTANCE { 1.0 / d } else { WEISZFELD_MAX_WEIGHT };
            for (acc, v) in numerator.iter_mut().zip(data.row(i)) {
                *acc += v * weight;
            }
            denominator += weight;
        }
        for (c, acc) in center.iter_mut().zip(&numerator) {
            *c = acc / denominator;
        }

        let shift = displacement(current.values(), center);
        let scale = current.values().iter().map(|v| v * v).sum::<f64>().sqrt();
        let relative = if scale > 0.0 { shift / scale } else { shift };
        if relative < WEISZFELD_TOL {
            break;
        }
    }
    Ok(())
}

#[inline]
fn displacement(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
