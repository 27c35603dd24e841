//! File I/O, padding, result serialization and matrix caching for the flowclust pipeline.

mod cache;
mod domain;
mod error;
mod pad;
mod reader;
mod writer;

pub use cache::DirMatrixCache;
pub use domain::{ExperimentName, LineSet};
pub use error::IoError;
pub use pad::{Padding, pad};
pub use reader::LineReader;
pub use writer::ResultWriter;
