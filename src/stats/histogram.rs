//! Length-binned throughput and the joint quality/length histogram.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::table::Table;

/// Upper bound of the quality axis; the axis covers `[0, MAX_QUALITY)`.
pub const MAX_QUALITY: f64 = 40.0;

/// Total bases per fixed-width length bin, as `(bin_lower_bound, bases)` pairs.
///
/// A read of length `l` lands in bin `(l / width) * width` and contributes `l`
/// bases (not a count of one), so the result shows where the sequenced bases
/// come from. Only non-empty bins are listed, in ascending order.
///
/// # Examples
/// ```
/// let t = lrstats::table::Table::default();
/// assert!(lrstats::stats::histogram::binned_throughput(&t, 100).is_empty());
/// ```
pub fn binned_throughput(table: &Table, width: u64) -> Vec<(u64, u64)> {
    let width = width.max(1);
    let mut bins: BTreeMap<u64, u64> = BTreeMap::new();
    for r in table.iter() {
        *bins.entry(r.length / width * width).or_insert(0) += r.length;
    }
    bins.into_iter().collect()
}

/// 2-D read counts over mean quality (linear bins) and length (log-spaced bins).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JointHistogram {
    /// `quality_bins + 1` edges over `[0, 40]`.
    pub quality_edges: Vec<f64>,
    /// `length_bins + 1` geometric edges from 1 to the longest read.
    pub length_edges: Vec<f64>,
    /// `counts[quality_bin][length_bin]`.
    pub counts: Vec<Vec<u64>>,
}

impl JointHistogram {
    /// Cells with at least one read, as `(quality_bin, length_bin, count)`.
    /// Empty cells are skipped so a log colour scale never sees a zero.
    pub fn nonzero_cells(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.counts.iter().enumerate().flat_map(|(qi, row)| {
            row.iter().enumerate().filter(|(_, &c)| c > 0).map(move |(li, &c)| (qi, li, c))
        })
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Build the joint histogram; `None` for an empty table.
///
/// Mean qualities at or above 40 are counted in the top quality bin. Reads
/// shorter than 2 nt land in the first length bin.
pub fn joint_quality_length(table: &Table, quality_bins: usize, length_bins: usize) -> Option<JointHistogram> {
    let max_len = table.iter().map(|r| r.length).max()?;
    let qn = quality_bins.max(1);
    let ln = length_bins.max(1);

    let quality_edges: Vec<f64> = (0..=qn).map(|i| MAX_QUALITY * i as f64 / qn as f64).collect();
    let upper = max_len.max(2) as f64;
    let mut length_edges: Vec<f64> = (0..=ln).map(|i| upper.powf(i as f64 / ln as f64)).collect();
    length_edges[ln] = upper;

    let mut counts = vec![vec![0u64; ln]; qn];
    for r in table.iter() {
        let qi = bin_index(&quality_edges, r.mean_quality);
        let li = bin_index(&length_edges, r.length as f64);
        counts[qi][li] += 1;
    }
    Some(JointHistogram { quality_edges, length_edges, counts })
}

/// Index of the bin containing `x`, clamped into the first/last bin.
fn bin_index(edges: &[f64], x: f64) -> usize {
    let bins = edges.len() - 1;
    edges.partition_point(|&e| e <= x).saturating_sub(1).min(bins - 1)
}
