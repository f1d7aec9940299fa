//! Histogram-based split finding.
//!
//! Quantile bin edges are computed once per tree from the tree's own
//! training rows. Each candidate feature is then evaluated in O(n) to fill
//! per-bin class counts plus O(B) to scan the bin boundaries, instead of the
//! O(n log n) sort exact CART needs. The chosen boundary is reported as the
//! midpoint between the two sample values it separates.

use rand::Rng;

use crate::node::FeatureIndex;
use crate::split::{SplitCriterion, SplitResult};

/// Pre-computed quantile bin edges for all features.
#[derive(Debug, Clone)]
pub(crate) struct FeatureBins {
    /// `edges[feat_idx]` is strictly increasing and lies strictly inside
    /// the feature's (min, max). Empty for constant features.
    edges: Vec<Vec<f64>>,
}

impl FeatureBins {
    /// Build quantile edges from column-major features.
    ///
    /// `col_features[feat_idx][sample_idx]`. Edges sit at the
    /// `1/n_bins, 2/n_bins, ...` quantiles (linear interpolation), with
    /// duplicates and edges equal to the extremes dropped.
    pub(crate) fn build(col_features: &[Vec<f64>], n_bins: usize) -> Self {
        let edges = col_features
            .iter()
            .map(|col| quantile_edges(col, n_bins))
            .collect();
        Self { edges }
    }

    /// Bin of `value` for a feature: the number of edges strictly below it.
    pub(crate) fn bin_index(&self, feat_idx: usize, value: f64) -> usize {
        self.edges[feat_idx].partition_point(|&e| e < value)
    }

    /// Number of usable bins for a feature (0 when the feature is constant).
    pub(crate) fn n_bins_for_feature(&self, feat_idx: usize) -> usize {
        match self.edges[feat_idx].len() {
            0 => 0,
            n => n + 1,
        }
    }

    /// Upper edge of `bin_idx`: bins `0..=bin_idx` hold values at or below it.
    pub(crate) fn threshold(&self, feat_idx: usize, bin_idx: usize) -> f64 {
        self.edges[feat_idx][bin_idx]
    }
}

fn quantile_edges(col: &[f64], n_bins: usize) -> Vec<f64> {
    if col.is_empty() {
        return Vec::new();
    }
    let mut sorted = col.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let (lo_val, hi_val) = (sorted[0], sorted[n - 1]);
    if lo_val == hi_val {
        return Vec::new();
    }

    let mut edges: Vec<f64> = (1..n_bins)
        .map(|k| {
            let pos = (k as f64 / n_bins as f64) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        })
        .collect();
    edges.dedup_by(|a, b| *a == *b);
    edges.retain(|&e| e > lo_val && e < hi_val);
    edges
}

/// Inputs shared by every split search inside one tree.
pub(crate) struct SplitSearch<'a> {
    pub(crate) col_features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) bins: &'a FeatureBins,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    /// Find the best split of `sample_indices` over a random subset of
    /// `max_features` features.
    ///
    /// Returns `None` when every candidate feature is constant on this node
    /// or no boundary satisfies `min_samples_leaf`.
    pub(crate) fn best_split(
        &self,
        sample_indices: &[usize],
        rng: &mut impl Rng,
    ) -> Option<SplitResult> {
        let n_features = self.col_features.len();
        let n_samples = sample_indices.len();
        if n_samples == 0 || n_features == 0 {
            return None;
        }

        let mut parent_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            parent_counts[self.labels[si]] += 1;
        }
        let parent_impurity = self.criterion.impurity(&parent_counts, n_samples).value();

        // Partial Fisher-Yates over the feature indices.
        let mut feature_order: Vec<usize> = (0..n_features).collect();
        let take = self.max_features.min(n_features);
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }

        let mut best_decrease = f64::NEG_INFINITY;
        let mut best: Option<(FeatureIndex, f64)> = None;

        for &feat_idx in &feature_order[..take] {
            let actual_bins = self.bins.n_bins_for_feature(feat_idx);
            if actual_bins == 0 {
                continue;
            }

            // bin_counts[bin][class]
            let mut bin_counts = vec![vec![0usize; self.n_classes]; actual_bins];
            let column = &self.col_features[feat_idx];
            for &si in sample_indices {
                let bin = self.bins.bin_index(feat_idx, column[si]).min(actual_bins - 1);
                bin_counts[bin][self.labels[si]] += 1;
            }

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.clone();
            let mut n_left = 0usize;

            for (split_bin, counts) in bin_counts.iter().enumerate().take(actual_bins - 1) {
                let moved: usize = counts.iter().sum();
                if moved == 0 {
                    continue;
                }
                n_left += moved;
                for (cls, &cnt) in counts.iter().enumerate() {
                    left_counts[cls] += cnt;
                    right_counts[cls] -= cnt;
                }
                let n_right = n_samples - n_left;
                if n_right == 0 {
                    break;
                }
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let decrease = n_samples as f64 * parent_impurity
                    - n_left as f64 * self.criterion.impurity(&left_counts, n_left).value()
                    - n_right as f64 * self.criterion.impurity(&right_counts, n_right).value();

                if decrease > best_decrease {
                    best_decrease = decrease;
                    best = Some((
                        FeatureIndex::new(feat_idx),
                        self.bins.threshold(feat_idx, split_bin),
                    ));
                }
            }
        }

        let (feature, edge) = best?;
        let column = &self.col_features[feature.index()];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
            .iter()
            .partition(|&&si| column[si] <= edge);
        let threshold = midpoint_threshold(column, &left_indices, &right_indices).unwrap_or(edge);

        Some(SplitResult {
            feature,
            threshold,
            impurity_decrease: best_decrease,
            left_indices,
            right_indices,
        })
    }
}

/// Midpoint between the largest left value and the smallest right value,
/// so the threshold does not hug the left cluster when bins are sparse.
fn midpoint_threshold(column: &[f64], left: &[usize], right: &[usize]) -> Option<f64> {
    let left_max = left.iter().map(|&si| column[si]).reduce(f64::max)?;
    let right_min = right.iter().map(|&si| column[si]).reduce(f64::min)?;
    let mid = left_max + (right_min - left_max) / 2.0;
    // Adjacent floats: keep the partition intact.
    Some(if mid < right_min { mid } else { left_max })
}
