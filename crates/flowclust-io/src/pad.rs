//! Conversion of ragged lines into a fixed-width data matrix.

use flowclust_metric::DataMatrix;
use tracing::{info, instrument, warn};

use crate::domain::LineSet;
use crate::IoError;

/// How lines of different lengths are brought to a common element budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Repeat each line's last point up to the budget; longer lines are
    /// truncated. Original lengths are recorded so metrics can ignore the fill.
    #[default]
    Fill,
    /// Re-sample every line to the budget at equal arc-length spacing.
    Resample,
}

/// Build a [`DataMatrix`] from ragged lines.
///
/// The element budget is `max_elements` when given, otherwise the point
/// count of the longest line.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::InvalidParameter`] | `max_elements` is `Some(0)` |
/// | [`IoError::Metric`] | The padded rows do not form a valid matrix |
#[instrument(skip(lines), fields(n_lines = lines.n_lines()))]
pub fn pad(
    lines: &LineSet,
    padding: Padding,
    max_elements: Option<usize>,
) -> Result<DataMatrix, IoError> {
    let budget = match max_elements {
        Some(0) => return Err(IoError::InvalidParameter { name: "max_elements" }),
        Some(b) => b,
        None => lines.longest(),
    };
    let dim = lines.dimension();

    let data = match padding {
        Padding::Fill => {
            let mut rows = Vec::with_capacity(lines.n_lines());
            let mut lengths = Vec::with_capacity(lines.n_lines());
            let mut truncated = 0usize;
            for i in 0..lines.n_lines() {
                let keep = lines.n_points(i).min(budget);
                if keep < lines.n_points(i) {
                    truncated += 1;
                }
                rows.push(fill_last(&lines.line(i)[..keep * dim], dim, budget));
                lengths.push(keep);
            }
            if truncated > 0 {
                warn!(truncated, budget, "lines truncated to the element budget");
            }
            DataMatrix::from_rows(rows, dim)?.with_original_lengths(lengths)?
        }
        Padding::Resample => {
            let rows = (0..lines.n_lines())
                .map(|i| resample(lines.line(i), dim, budget))
                .collect();
            DataMatrix::from_rows(rows, dim)?
        }
    };

    info!(budget, ?padding, "lines padded");
    Ok(data)
}

/// Copy `line` and repeat its last point until it holds `budget` points.
fn fill_last(line: &[f64], dim: usize, budget: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(budget * dim);
    row.extend_from_slice(line);
    let last = &line[line.len() - dim..];
    while row.len() < budget * dim {
        row.extend_from_slice(last);
    }
    row
}

/// Re-sample `line` to `budget` points spaced evenly by arc length.
///
/// The first and last points are kept. A line without extent collapses to
/// copies of its first point.
fn resample(line: &[f64], dim: usize, budget: usize) -> Vec<f64> {
    let points: Vec<&[f64]> = line.chunks_exact(dim).collect();

    // cumulative arc length at every point
    let mut arc = Vec::with_capacity(points.len());
    arc.push(0.0);
    for pair in points.windows(2) {
        let step = pair[0]
            .iter()
            .zip(pair[1])
            .map(|(a, b)| (b - a) * (b - a))
            .sum::<f64>()
            .sqrt();
        arc.push(arc[arc.len() - 1] + step);
    }
    let total = arc[arc.len() - 1];

    let mut row = Vec::with_capacity(budget * dim);
    if budget == 1 || total == 0.0 {
        for _ in 0..budget {
            row.extend_from_slice(points[0]);
        }
        return row;
    }

    let mut seg = 0;
    for j in 0..budget {
        let target = total * j as f64 / (budget - 1) as f64;
        while seg + 2 < points.len() && arc[seg + 1] < target {
            seg += 1;
        }
        let span = arc[seg + 1] - arc[seg];
        let t = if span > 0.0 { ((target - arc[seg]) / span).clamp(0.0, 1.0) } else { 0.0 };
        row.extend(
            points[seg]
                .iter()
                .zip(points[seg + 1])
                .map(|(a, b)| a + t * (b - a)),
        );
    }
    row
}
