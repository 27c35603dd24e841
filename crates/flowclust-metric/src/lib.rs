//! Line data matrices and the dissimilarity metrics used to cluster them.
//!
//! Pure math library with no file I/O. A line is a fixed-width row of
//! `dimension`-dimensional points; seventeen metrics compare lines with each
//! other and with arbitrary center vectors, backed by a per-run context of
//! precomputed line features. A principal component projection supports
//! clustering in a reduced space.

mod context;
mod data;
mod dissimilarity;
mod error;
mod geometry;
mod matrix;
mod metric;
mod pca;

pub use context::MetricContext;
pub use data::DataMatrix;
pub use dissimilarity::{Center, Dissimilarity, PairwiseDistance};
pub use error::{MatrixReadError, MetricError};
pub use matrix::DistanceMatrix;
pub use metric::Metric;
pub use pca::PrincipalComponents;
