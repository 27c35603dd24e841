//! Per-line precomputation shared by every dissimilarity evaluation of a run.

use std::f64::consts::PI;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::data::DataMatrix;
use crate::geometry::{
    DEGENERATE_SEGMENT, DIRECTION_BINS, Gaussian, Histogram, angle, direction_bin, norm,
    proper_segments, segments, signed_turn,
};
use crate::metric::{Family, Metric};

/// Bins used by the angle, curvature and signature histograms.
pub(crate) const ANGLE_BINS: usize = 16;

/// Precomputed representation of one line for one metric family.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineFeature {
    /// The metric works on coordinates directly.
    Raw,
    /// Unit direction of every padded segment, flattened; zero for degenerate segments.
    Directions(Vec<f64>),
    /// Mean turning angle and turning-angle histogram.
    Turning { mean: f64, histogram: Histogram },
    /// A single normalized-on-demand histogram.
    Histogram(Histogram),
    /// Gaussian fitted to segment vectors.
    Gaussian(Gaussian),
}

impl LineFeature {
    /// Extract the feature a metric family needs.
    ///
    /// `padded` is the full row, `unpadded` only the real points; per-segment
    /// families use the former so every line has the same segment count.
    pub(crate) fn extract(family: Family, padded: &[f64], unpadded: &[f64], dim: usize) -> Self {
        match family {
            Family::Raw => LineFeature::Raw,
            Family::Directions => {
                let mut directions = Vec::with_capacity(padded.len().saturating_sub(dim));
                for segment in segments(padded, dim) {
                    let length = norm(&segment);
                    if length > DEGENERATE_SEGMENT {
                        directions.extend(segment.iter().map(|v| v / length));
                    } else {
                        directions.extend(std::iter::repeat_n(0.0, dim));
                    }
                }
                LineFeature::Directions(directions)
            }
            Family::Turning => {
                let segs = proper_segments(unpadded, dim);
                let mut histogram = Histogram::new(ANGLE_BINS, 0.0, PI);
                let mut sum = 0.0;
                for pair in segs.windows(2) {
                    let theta = angle(&pair[0], &pair[1]);
                    histogram.add(theta);
                    sum += theta;
                }
                let turns = segs.len().saturating_sub(1);
                let mean = if turns > 0 { sum / turns as f64 } else { 0.0 };
                LineFeature::Turning { mean, histogram }
            }
            Family::SignedTurning => {
                let mut histogram = Histogram::new(ANGLE_BINS, -PI, PI);
                for pair in proper_segments(unpadded, dim).windows(2) {
                    histogram.add(signed_turn(&pair[0], &pair[1]));
                }
                LineFeature::Histogram(histogram)
            }
            Family::AxisAngle => {
                let mut histogram = Histogram::new(ANGLE_BINS, 0.0, PI);
                for segment in proper_segments(unpadded, dim) {
                    histogram.add((segment[0] / norm(&segment)).clamp(-1.0, 1.0).acos());
                }
                LineFeature::Histogram(histogram)
            }
            Family::Curvature => {
                let mut histogram = Histogram::new(ANGLE_BINS, 0.0, 1.0);
                for pair in proper_segments(unpadded, dim).windows(2) {
                    let arc = 0.5 * (norm(&pair[0]) + norm(&pair[1]));
                    let kappa = angle(&pair[0], &pair[1]) / arc;
                    histogram.add(kappa / (1.0 + kappa));
                }
                LineFeature::Histogram(histogram)
            }
            Family::DirectionCounts => {
                let mut histogram = Histogram::new(DIRECTION_BINS, 0.0, 1.0);
                for segment in proper_segments(unpadded, dim) {
                    histogram.add_to_bin(direction_bin(&segment));
                }
                LineFeature::Histogram(histogram)
            }
            Family::UnitGaussian => {
                let units: Vec<Vec<f64>> = proper_segments(unpadded, dim)
                    .into_iter()
                    .map(|s| {
                        let length = norm(&s);
                        s.into_iter().map(|v| v / length).collect()
                    })
                    .collect();
                LineFeature::Gaussian(Gaussian::fit(&units, dim))
            }
            Family::RawGaussian => {
                LineFeature::Gaussian(Gaussian::fit(&proper_segments(unpadded, dim), dim))
            }
        }
    }
}

static RAW: LineFeature = LineFeature::Raw;

/// Read-only per-run context for one metric over one data matrix.
///
/// Built once by [`MetricContext::prepare`]; afterwards it is immutable and
/// shared across worker threads.
#[derive(Debug, Clone)]
pub struct MetricContext {
    metric: Metric,
    rows: usize,
    features: Vec<LineFeature>,
}

impl MetricContext {
    /// Precompute the per-line features `metric` needs.
    ///
    /// Metrics working on raw coordinates store nothing. Extraction is
    /// parallelized over lines with rayon.
    #[must_use]
    #[instrument(skip_all, fields(rows = data.rows(), metric = %metric))]
    pub fn prepare(data: &DataMatrix, metric: Metric) -> Self {
        let family = metric.family();
        let dim = data.dimension();
        let features = if family == Family::Raw {
            Vec::new()
        } else {
            (0..data.rows())
                .into_par_iter()
                .map(|i| LineFeature::extract(family, data.row(i), data.unpadded_row(i), dim))
                .collect()
        };
        debug!(n_features = features.len(), "metric context prepared");
        Self { metric, rows: data.rows(), features }
    }

    /// Return the metric this context was prepared for.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Return the number of lines covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Return true if the context covers no line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub(crate) fn feature(&self, i: usize) -> &LineFeature {
        self.features.get(i).unwrap_or(&RAW)
    }
}
