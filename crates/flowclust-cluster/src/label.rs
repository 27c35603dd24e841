//! Canonical relabeling, normalized entropy and representative lines.

use std::fmt;

use tracing::instrument;

use flowclust_metric::{Center, DataMatrix, Dissimilarity};

/// A canonical cluster id.
///
/// Ids are dense in `[0, G)` over the non-empty clusters, ordered by ascending
/// cluster size (ties by raw cluster index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterLabel(usize);

impl ClusterLabel {
    /// Create a label from a zero-based canonical id.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based canonical id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from raw cluster indices to canonical labels.
#[derive(Debug, Clone)]
pub(crate) struct Labeling {
    /// Canonical label of every line.
    pub(crate) labels: Vec<ClusterLabel>,
    /// Size of every canonical cluster, non-decreasing.
    pub(crate) sizes: Vec<usize>,
    /// Raw cluster index behind every canonical id.
    pub(crate) raw: Vec<usize>,
}

impl Labeling {
    /// Relabel raw neighbor lists by ascending non-empty size, ties by raw index.
    #[instrument(skip_all, fields(k = neighbors.len()))]
    pub(crate) fn canonical(neighbors: &[Vec<usize>], n_lines: usize) -> Self {
        let mut raw: Vec<usize> = (0..neighbors.len())
            .filter(|&c| !neighbors[c].is_empty())
            .collect();
        raw.sort_by_key(|&c| (neighbors[c].len(), c));

        let mut labels = vec![ClusterLabel(0); n_lines];
        for (id, &c) in raw.iter().enumerate() {
            for &i in &neighbors[c] {
                labels[i] = ClusterLabel(id);
            }
        }
        let sizes = raw.iter().map(|&c| neighbors[c].len()).collect();
        Self { labels, sizes, raw }
    }

    /// Number of non-empty clusters.
    pub(crate) fn n_groups(&self) -> usize {
        self.sizes.len()
    }

    /// Member lines of every canonical cluster, ascending.
    pub(crate) fn members(&self) -> Vec<Vec<usize>> {
        members_by_label(&self.labels)
    }
}

/// Member lines grouped by label; the outer length is the largest label plus one.
pub(crate) fn members_by_label(labels: &[ClusterLabel]) -> Vec<Vec<usize>> {
    let g = labels.iter().map(|l| l.index() + 1).max().unwrap_or(0);
    let mut members = vec![Vec::new(); g];
    for (i, label) in labels.iter().enumerate() {
        members[label.index()].push(i);
    }
    members
}

/// Shannon entropy of the cluster size distribution divided by `log2(G)`.
///
/// Returns `None` when fewer than two clusters are non-empty.
#[must_use]
pub fn normalized_entropy(sizes: &[usize]) -> Option<f64> {
    let sizes: Vec<usize> = sizes.iter().copied().filter(|&s| s > 0).collect();
    let g = sizes.len();
    if g <= 1 {
        return None;
    }
    let total: usize = sizes.iter().sum();
    let h: f64 = sizes
        .iter()
        .map(|&s| {
            let p = s as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    Some(h / (g as f64).log2())
}

/// The lines that best and worst represent one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Representative {
    /// Canonical id of the cluster.
    pub label: ClusterLabel,
    /// Member closest to the center; `None` when the center is itself a member.
    pub closest: Option<usize>,
    /// Member furthest from the center.
    pub furthest: usize,
    /// The cluster center vector.
    pub center: Vec<f64>,
}

/// Find the closest and furthest member of every canonical cluster by linear scan.
///
/// `centers` holds one prepared center per canonical id. Ties go to the
/// first member in line order.
#[instrument(skip_all, fields(n_groups = centers.len()))]
pub(crate) fn representatives(
    dissim: &Dissimilarity<'_>,
    centers: &[Center],
    members: &[Vec<usize>],
    with_closest: bool,
) -> Vec<Representative> {
    centers
        .iter()
        .zip(members)
        .enumerate()
        .map(|(id, (center, members))| {
            let mut closest = (members[0], f64::INFINITY);
            let mut furthest = (members[0], f64::NEG_INFINITY);
            for &i in members {
                let d = dissim.to_center(center, i);
                if d < closest.1 {
                    closest = (i, d);
                }
                if d > furthest.1 {
                    furthest = (i, d);
                }
            }
            Representative {
                label: ClusterLabel(id),
                closest: with_closest.then_some(closest.0),
                furthest: furthest.0,
                center: center.values().to_vec(),
            }
        })
        .collect()
}

/// Mean turning angle of the representative lines, averaged over clusters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepresentativeRotation {
    /// Average over the closest members, in radians; `None` when no closest
    /// member is reported.
    pub closest: Option<f64>,
    /// Average over the furthest members, in radians.
    pub furthest: f64,
}

/// Average [`DataMatrix::mean_turning_angle`] of the closest and of the
/// furthest member of every cluster.
pub(crate) fn representative_rotation(
    data: &DataMatrix,
    representatives: &[Representative],
) -> RepresentativeRotation {
    let mean = |lines: &[usize]| {
        if lines.is_empty() {
            return 0.0;
        }
        lines.iter().map(|&i| data.mean_turning_angle(i)).sum::<f64>() / lines.len() as f64
    };

    let furthest: Vec<usize> = representatives.iter().map(|r| r.furthest).collect();
    let closest: Option<Vec<usize>> = representatives.iter().map(|r| r.closest).collect();
    RepresentativeRotation {
        closest: closest.filter(|c| !c.is_empty()).map(|c| mean(&c)),
        furthest: mean(&furthest),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use flowclust_metric::{DataMatrix, Dissimilarity, Metric, MetricContext};

    use super::{
        ClusterLabel, Labeling, Representative, normalized_entropy, representative_rotation,
        representatives,
    };

    #[test]
    fn label_roundtrip_and_display() {
        let label = ClusterLabel::new(3);
        assert_eq!(label.index(), 3);
        assert_eq!(format!("{label}"), "3");
        assert!(ClusterLabel::new(1) < ClusterLabel::new(5));
    }

    #[test]
    fn canonical_ids_by_ascending_size() {
        // raw 0 has 3 members, raw 1 is empty, raw 2 has 1, raw 3 has 3
        let neighbors = vec![vec![0, 2, 4], vec![], vec![1], vec![3, 5, 6]];
        let labeling = Labeling::canonical(&neighbors, 7);

        assert_eq!(labeling.n_groups(), 3);
        assert_eq!(labeling.sizes, vec![1, 3, 3]);
        assert_eq!(labeling.raw, vec![2, 0, 3]);
        let ids: Vec<usize> = labeling.labels.iter().map(|l| l.index()).collect();
        assert_eq!(ids, vec![1, 0, 1, 2, 1, 2, 2]);
        assert_eq!(labeling.members(), vec![vec![1], vec![0, 2, 4], vec![3, 5, 6]]);
    }

    #[test]
    fn entropy_of_balanced_split_is_one() {
        assert!((normalized_entropy(&[50, 50]).unwrap() - 1.0).abs() < 1e-12);
        assert!((normalized_entropy(&[10, 10, 10, 10]).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_skipped_for_single_group() {
        assert_eq!(normalized_entropy(&[7]), None);
        assert_eq!(normalized_entropy(&[0, 7]), None);
    }

    #[test]
    fn entropy_of_skewed_split_in_unit_interval() {
        let e = normalized_entropy(&[1, 99]).unwrap();
        assert!(e > 0.0 && e < 1.0);
    }

    #[test]
    fn closest_and_furthest_members() {
        let data = DataMatrix::from_rows(
            vec![vec![0.0], vec![1.0], vec![3.0], vec![10.0], vec![12.0]],
            1,
        )
        .unwrap();
        let ctx = MetricContext::prepare(&data, Metric::Euclidean);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        let centers = vec![d.center(vec![11.0]).unwrap(), d.center(vec![1.2]).unwrap()];
        let members = vec![vec![3, 4], vec![0, 1, 2]];

        let reps = representatives(&d, &centers, &members, true);
        assert_eq!(reps[0].label, ClusterLabel::new(0));
        // tie at distance 1: first member wins for both scans
        assert_eq!(reps[0].closest, Some(3));
        assert_eq!(reps[0].furthest, 3);
        assert_eq!(reps[1].closest, Some(1));
        assert_eq!(reps[1].furthest, 2);
        assert_eq!(reps[1].center, vec![1.2]);

        let reps = representatives(&d, &centers, &members, false);
        assert!(reps.iter().all(|r| r.closest.is_none()));
    }

    #[test]
    fn rotation_averages_representatives() {
        // straight, one right angle over two turns, full reversal
        let data = DataMatrix::from_rows(
            vec![
                vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0],
                vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            ],
            2,
        )
        .unwrap();
        let rep = |label, closest, furthest| Representative {
            label: ClusterLabel::new(label),
            closest,
            furthest,
            center: vec![0.0; 6],
        };

        let reps = vec![rep(0, Some(0), 1), rep(1, Some(1), 2)];
        let rotation = representative_rotation(&data, &reps);
        assert!((rotation.closest.unwrap() - FRAC_PI_2 / 2.0).abs() < 1e-12);
        assert!((rotation.furthest - (FRAC_PI_2 + PI) / 2.0).abs() < 1e-12);

        let reps = vec![rep(0, None, 0), rep(1, None, 2)];
        let rotation = representative_rotation(&data, &reps);
        assert_eq!(rotation.closest, None);
        assert!((rotation.furthest - PI / 2.0).abs() < 1e-12);
    }
}
