//! Domain types for flowclust-io.

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lines as read from disk, before padding.
///
/// Produced by [`LineReader`](crate::LineReader). Each line is a flat list of
/// point coordinates (`x0 y0 x1 y1 ...`); lines may hold different numbers
/// of points.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSet {
    lines: Vec<Vec<f64>>,
    dimension: usize,
}

impl LineSet {
    /// Wrap already validated lines.
    pub(crate) fn new(lines: Vec<Vec<f64>>, dimension: usize) -> Self {
        debug_assert!(dimension > 0);
        debug_assert!(lines.iter().all(|l| !l.is_empty() && l.len() % dimension == 0));
        Self { lines, dimension }
    }

    /// Return the point dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the number of lines.
    #[must_use]
    pub fn n_lines(&self) -> usize {
        self.lines.len()
    }

    /// Return the coordinates of line `i`.
    #[must_use]
    pub fn line(&self, i: usize) -> &[f64] {
        &self.lines[i]
    }

    /// Return the number of points on line `i`.
    #[must_use]
    pub fn n_points(&self, i: usize) -> usize {
        self.lines[i].len() / self.dimension
    }

    /// Return the point count of the longest line.
    #[must_use]
    pub fn longest(&self) -> usize {
        (0..self.n_lines()).map(|i| self.n_points(i)).max().unwrap_or(0)
    }

    /// Return the total number of points over all lines.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.lines.iter().map(Vec::len).sum::<usize>() / self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("tornado-run_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "tornado-run_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_path_separators() {
        let name = ExperimentName::new("../escape".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn line_set_point_counts() {
        let set = LineSet::new(vec![vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0], vec![5.0, 5.0]], 2);
        assert_eq!(set.n_lines(), 2);
        assert_eq!(set.n_points(0), 3);
        assert_eq!(set.n_points(1), 1);
        assert_eq!(set.longest(), 3);
        assert_eq!(set.total_points(), 4);
    }
}
