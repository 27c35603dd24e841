//! Partition-based clustering of lines under a selectable dissimilarity metric.
//!
//! Provides K-means and K-medoids (sample medoid or geometric median) with
//! three initialization strategies, canonical relabeling by cluster size,
//! representative lines, and evaluation by silhouette, validity index, Gamma
//! statistic and Davies–Bouldin index. A metric sweep runs the same
//! configuration under several metrics side by side, next to a baseline that
//! clusters the principal component projection of the lines.

mod config;
mod engine;
mod error;
mod evaluate;
mod init;
mod label;
mod partition;
mod result;
mod silhouette;
mod validity;

pub use config::{ClusterConfig, InitStrategy, MedoidUpdate, Mode, SweepConfig};
pub use error::ClusterError;
pub use evaluate::{Evaluation, MatrixCache, evaluate};
pub use label::{ClusterLabel, Representative, RepresentativeRotation, normalized_entropy};
pub use result::{ClusteringResult, MetricSummary, SweepResult};
pub use silhouette::{SampleSilhouette, SilhouetteScore, compute_silhouette};
pub use validity::{davies_bouldin, gamma_statistic, validity_index};
