//! The seventeen dissimilarity metrics.

use std::fmt;

use crate::error::MetricError;

/// A dissimilarity metric, selected at runtime by its index `0..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// 0: Euclidean norm of the row difference.
    Euclidean,
    /// 1: Fractional distance metric with exponent 0.5.
    Fractional,
    /// 2: Mean angle between corresponding segments.
    PiecewiseAngle,
    /// 3: Bhattacharyya metric over turning-angle histograms.
    RotationBhattacharyya,
    /// 4: Difference of mean turning angles.
    AverageRotation,
    /// 5: Intersection of signed turning-angle histograms.
    SignedAngleIntersection,
    /// 6: Bhattacharyya distance of unit segment-direction Gaussians.
    DirectionDistribution,
    /// 7: Bhattacharyya metric over angles to a fixed axis.
    FixedDirectionBhattacharyya,
    /// 8: Mean segment angle times its standard deviation.
    AngleDeviation,
    /// 9: Bhattacharyya distance of raw segment-vector Gaussians.
    UnnormalizedDistribution,
    /// 10: One minus the normalized inner product of the rows.
    InnerProduct,
    /// 11: Mean of one minus the per-segment cosine similarity.
    CosineSimilarity,
    /// 12: Mean of closest point distances.
    MeanClosestPoint,
    /// 13: Hausdorff distance.
    Hausdorff,
    /// 14: Chi-square distance of curvature signatures.
    Signature,
    /// 15: Procrustes distance after optimal alignment.
    Procrustes,
    /// 16: Entropy gain of merged direction histograms.
    Entropy,
}

/// Which per-line precomputation a metric needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    Raw,
    Directions,
    Turning,
    SignedTurning,
    AxisAngle,
    Curvature,
    DirectionCounts,
    UnitGaussian,
    RawGaussian,
}

impl Metric {
    /// Every metric in index order.
    pub const ALL: [Metric; 17] = [
        Metric::Euclidean,
        Metric::Fractional,
        Metric::PiecewiseAngle,
        Metric::RotationBhattacharyya,
        Metric::AverageRotation,
        Metric::SignedAngleIntersection,
        Metric::DirectionDistribution,
        Metric::FixedDirectionBhattacharyya,
        Metric::AngleDeviation,
        Metric::UnnormalizedDistribution,
        Metric::InnerProduct,
        Metric::CosineSimilarity,
        Metric::MeanClosestPoint,
        Metric::Hausdorff,
        Metric::Signature,
        Metric::Procrustes,
        Metric::Entropy,
    ];

    /// Look up a metric by index.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidMetric`] if `index > 16`.
    pub fn from_index(index: usize) -> Result<Self, MetricError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(MetricError::InvalidMetric { index })
    }

    /// Return the metric index.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Return a short kebab-case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Fractional => "fractional",
            Metric::PiecewiseAngle => "piecewise-angle",
            Metric::RotationBhattacharyya => "rotation-bhattacharyya",
            Metric::AverageRotation => "average-rotation",
            Metric::SignedAngleIntersection => "signed-angle-intersection",
            Metric::DirectionDistribution => "direction-distribution",
            Metric::FixedDirectionBhattacharyya => "fixed-direction-bhattacharyya",
            Metric::AngleDeviation => "angle-deviation",
            Metric::UnnormalizedDistribution => "unnormalized-distribution",
            Metric::InnerProduct => "inner-product",
            Metric::CosineSimilarity => "cosine-similarity",
            Metric::MeanClosestPoint => "mean-closest-point",
            Metric::Hausdorff => "hausdorff",
            Metric::Signature => "signature",
            Metric::Procrustes => "procrustes",
            Metric::Entropy => "entropy",
        }
    }

    pub(crate) fn family(self) -> Family {
        match self {
            Metric::Euclidean
            | Metric::Fractional
            | Metric::InnerProduct
            | Metric::MeanClosestPoint
            | Metric::Hausdorff
            | Metric::Procrustes => Family::Raw,
            Metric::PiecewiseAngle | Metric::AngleDeviation | Metric::CosineSimilarity => {
                Family::Directions
            }
            Metric::RotationBhattacharyya | Metric::AverageRotation => Family::Turning,
            Metric::SignedAngleIntersection => Family::SignedTurning,
            Metric::FixedDirectionBhattacharyya => Family::AxisAngle,
            Metric::Signature => Family::Curvature,
            Metric::Entropy => Family::DirectionCounts,
            Metric::DirectionDistribution => Family::UnitGaussian,
            Metric::UnnormalizedDistribution => Family::RawGaussian,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.name())
    }
}

impl TryFrom<usize> for Metric {
    type Error = MetricError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index)
    }
}
