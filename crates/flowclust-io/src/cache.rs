//! Directory-backed distance matrix cache.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use flowclust_cluster::MatrixCache;
use flowclust_metric::Metric;
use tracing::{debug, instrument};

use crate::IoError;

/// Stores one plain-text distance matrix per metric inside a directory.
///
/// The matrix for metric `m` lives at `{dir}/{m}`, where `m` is the metric
/// index. Files are only trusted after the engine checks their shape.
#[derive(Debug, Clone)]
pub struct DirMatrixCache {
    dir: PathBuf,
}

impl DirMatrixCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn new(dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(dir).map_err(|e| IoError::OutputDirCreate {
            path: dir.to_path_buf(),
            source: e,
        })?;
        debug!("matrix cache ready");
        Ok(Self { dir: dir.to_path_buf() })
    }

    /// Return the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the file holding the matrix for `metric`.
    #[must_use]
    pub fn path(&self, metric: Metric) -> PathBuf {
        self.dir.join(metric.index().to_string())
    }
}

impl MatrixCache for DirMatrixCache {
    fn reader(&self, metric: Metric) -> std::io::Result<Option<Box<dyn BufRead + '_>>> {
        match File::open(self.path(metric)) {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn writer(&self, metric: Metric) -> std::io::Result<Box<dyn Write + '_>> {
        let file = File::create(self.path(metric))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn missing_matrix_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = DirMatrixCache::new(dir.path()).unwrap();
        assert!(cache.reader(Metric::Hausdorff).unwrap().is_none());
    }

    #[test]
    fn writer_and_reader_share_the_metric_file() {
        let dir = TempDir::new().unwrap();
        let cache = DirMatrixCache::new(&dir.path().join("cache")).unwrap();

        {
            let mut w = cache.writer(Metric::Procrustes).unwrap();
            w.write_all(b"0 1\n1 0\n").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(cache.path(Metric::Procrustes), dir.path().join("cache").join("15"));

        let mut text = String::new();
        cache
            .reader(Metric::Procrustes)
            .unwrap()
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "0 1\n1 0\n");
        assert!(cache.reader(Metric::Euclidean).unwrap().is_none());
    }
}
