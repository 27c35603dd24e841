//! Line file reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::LineSet;
use crate::IoError;

/// Reads lines (curves) from a text file.
///
/// Expected format:
/// - No header; one line per record
/// - Coordinates `x0 y0 [z0] x1 y1 [z1] ...` separated by commas, whitespace or both
/// - Records may hold different numbers of points
/// - Blank records and records starting with `#` are skipped
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::InvalidParameter`] | `dimension` is zero |
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record |
/// | [`IoError::EmptyDataset`] | No non-blank record |
/// | [`IoError::CoordinateCount`] | Coordinate count is not a multiple of `dimension` |
/// | [`IoError::NonFiniteValue`] | Coordinate is NaN, Inf, or unparseable float |
pub struct LineReader {
    path: PathBuf,
    dimension: usize,
}

impl LineReader {
    /// Create a new reader for the given file of `dimension`-dimensional points.
    pub fn new(path: &Path, dimension: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            dimension,
        }
    }

    /// Read and validate the file, returning a [`LineSet`].
    #[instrument(skip(self), fields(path = %self.path.display(), dimension = self.dimension))]
    pub fn read(&self) -> Result<LineSet, IoError> {
        if self.dimension == 0 {
            return Err(IoError::InvalidParameter { name: "dimension" });
        }

        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // Comma is the record delimiter; whitespace inside a field separates
        // further coordinates, so "1 2, 3" yields three values.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(file);

        let mut lines = Vec::new();
        let mut skipped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            let row_index = lines.len();
            let mut values = Vec::new();
            for raw in record.iter().flat_map(str::split_whitespace) {
                let value = match raw.parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        return Err(IoError::NonFiniteValue {
                            path: self.path.clone(),
                            row_index,
                            col_index: values.len(),
                            raw: raw.to_string(),
                        });
                    }
                };
                values.push(value);
            }

            if values.is_empty() {
                skipped += 1;
                continue;
            }
            if values.len() % self.dimension != 0 {
                return Err(IoError::CoordinateCount {
                    path: self.path.clone(),
                    row_index,
                    count: values.len(),
                    dimension: self.dimension,
                });
            }
            lines.push(values);
        }

        if lines.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        if skipped > 0 {
            debug!(skipped, "blank records skipped");
        }

        let set = LineSet::new(lines, self.dimension);
        info!(
            n_lines = set.n_lines(),
            longest = set.longest(),
            n_points = set.total_points(),
            "lines loaded"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_comma_separated() {
        let f = write_lines("0,0,1,1,2,2\n5,5,6,6\n");
        let set = LineReader::new(f.path(), 2).read().unwrap();
        assert_eq!(set.n_lines(), 2);
        assert_eq!(set.line(0), &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(set.n_points(1), 2);
    }

    #[test]
    fn read_whitespace_and_mixed_separators() {
        let f = write_lines("0 0 0\t1 1 1\n2, 2 2 ,3 3 3\n");
        let set = LineReader::new(f.path(), 3).read().unwrap();
        assert_eq!(set.n_lines(), 2);
        assert_eq!(set.line(1), &[2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn blank_and_comment_records_skipped() {
        let f = write_lines("# header comment\n1 2\n\n   \n3 4 5 6\n");
        let set = LineReader::new(f.path(), 2).read().unwrap();
        assert_eq!(set.n_lines(), 2);
        assert_eq!(set.line(1), &[3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn value_round_trip() {
        let f = write_lines("1.23456789 9.87654321\n");
        let set = LineReader::new(f.path(), 2).read().unwrap();
        assert!((set.line(0)[0] - 1.23456789).abs() < 1e-12);
        assert!((set.line(0)[1] - 9.87654321).abs() < 1e-12);
    }

    #[test]
    fn error_file_not_found() {
        let result = LineReader::new(Path::new("/nonexistent/lines.txt"), 2).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_zero_dimension() {
        let f = write_lines("1 2\n");
        let result = LineReader::new(f.path(), 0).read();
        assert!(matches!(result, Err(IoError::InvalidParameter { name: "dimension" })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_lines("\n\n# nothing\n");
        let result = LineReader::new(f.path(), 2).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_coordinate_count() {
        let f = write_lines("0 0 1 1\n0 0 1\n");
        let result = LineReader::new(f.path(), 2).read();
        assert!(matches!(
            result,
            Err(IoError::CoordinateCount { row_index: 1, count: 3, dimension: 2, .. })
        ));
    }

    #[test]
    fn error_non_finite_nan() {
        let f = write_lines("1.0 NaN\n");
        let result = LineReader::new(f.path(), 2).read();
        assert!(matches!(result, Err(IoError::NonFiniteValue { col_index: 1, .. })));
    }

    #[test]
    fn error_non_finite_inf() {
        let f = write_lines("1.0 2.0\ninf 1.0\n");
        let result = LineReader::new(f.path(), 2).read();
        assert!(matches!(
            result,
            Err(IoError::NonFiniteValue { row_index: 1, col_index: 0, .. })
        ));
    }

    #[test]
    fn error_unparseable_value() {
        let f = write_lines("1.0,abc\n");
        let result = LineReader::new(f.path(), 2).read();
        assert!(matches!(result, Err(IoError::NonFiniteValue { .. })));
    }
}
