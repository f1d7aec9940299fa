use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, trace};

use crate::{
    RfError,
    histogram::{FeatureBins, SplitSearch},
    node::{Impurity, Node, NodeIndex},
    split::SplitCriterion,
};

/// Configuration for a single histogram-split CART tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter               | Default               |
/// |-------------------------|-----------------------|
/// | `criterion`             | `Gini`                |
/// | `max_depth`             | `None` (unlimited)    |
/// | `max_leaves`            | `None` (unlimited)    |
/// | `min_samples_split`     | 2                     |
/// | `min_samples_leaf`      | 1                     |
/// | `min_impurity_decrease` | 0.0                   |
/// | `max_features`          | `None` (all features) |
/// | `n_bins`                | 128                   |
/// | `seed`                  | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_leaves: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_impurity_decrease: f64,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_bins: usize,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            max_leaves: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_impurity_decrease: 0.0,
            max_features: None,
            n_bins: 128,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum number of leaves. Nodes are expanded depth-first
    /// until the budget is spent.
    #[must_use]
    pub fn with_max_leaves(mut self, max_leaves: Option<usize>) -> Self {
        self.max_leaves = max_leaves;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the minimum weighted impurity decrease a split must achieve.
    #[must_use]
    pub fn with_min_impurity_decrease(mut self, min_impurity_decrease: f64) -> Self {
        self.min_impurity_decrease = min_impurity_decrease;
        self
    }

    /// Set the number of features considered at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the number of quantile bins per feature.
    #[must_use]
    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the leaf limit, if any.
    #[must_use]
    pub fn max_leaves(&self) -> Option<usize> {
        self.max_leaves
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]`: row-major layout.
    /// `labels[sample_idx]`: class codes (zero-based).
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                            |
    /// |-------------------------------------|-------------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                             |
    /// | [`RfError::LabelCountMismatch`]     | `labels.len() != features.len()`                |
    /// | [`RfError::ZeroFeatures`]           | rows have zero feature columns                  |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths                  |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite                    |
    /// | [`RfError::InvalidMaxFeatures`]     | `max_features` resolves outside [1, n_features] |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                        |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                         |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                          |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let n_features = validate_matrix(features, labels)?;

        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let col_features = to_columns(features, n_features);
        let sample_indices: Vec<usize> = (0..features.len()).collect();

        let tree = self.grow(&col_features, labels, n_classes, &sample_indices, max_features);
        debug!(
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            depth = tree.depth(),
            "decision tree built"
        );
        Ok(tree)
    }

    /// Grow a tree on `sample_indices` (which may repeat) of an already
    /// validated column-major matrix. Bin edges come from those rows only.
    pub(crate) fn grow(
        &self,
        col_features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        sample_indices: &[usize],
        max_features: usize,
    ) -> DecisionTree {
        let drawn: Vec<Vec<f64>> = col_features
            .iter()
            .map(|col| sample_indices.iter().map(|&si| col[si]).collect())
            .collect();
        let bins = FeatureBins::build(&drawn, self.n_bins);

        let mut builder = TreeBuilder {
            search: SplitSearch {
                col_features,
                labels,
                n_classes,
                criterion: self.criterion,
                bins: &bins,
                max_features,
                min_samples_leaf: self.min_samples_leaf,
            },
            config: self,
            total_samples: sample_indices.len(),
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            nodes: Vec::new(),
            n_leaves: 1,
        };
        builder.build(sample_indices, 0);

        trace!(
            seed = self.seed,
            n_nodes = builder.nodes.len(),
            n_leaves = builder.n_leaves,
            "tree grown"
        );

        DecisionTree {
            nodes: builder.nodes,
            n_features: col_features.len(),
            n_classes,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a row-major matrix and its labels, returning the feature count.
pub(crate) fn validate_matrix(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Transpose row-major samples into `col[feature_idx][sample_idx]`.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect()
}

/// Lowest class code with the highest count.
fn majority_class(class_counts: &[usize]) -> usize {
    let mut best = 0;
    for (cls, &count) in class_counts.iter().enumerate() {
        if count > class_counts[best] {
            best = cls;
        }
    }
    best
}

/// Depth-first arena builder that tracks the remaining leaf budget.
struct TreeBuilder<'a> {
    search: SplitSearch<'a>,
    config: &'a DecisionTreeConfig,
    total_samples: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
    /// Leaves the finished tree will have if no further splits happen.
    n_leaves: usize,
}

impl TreeBuilder<'_> {
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let mut class_counts = vec![0usize; self.search.n_classes];
        for &si in sample_indices {
            class_counts[self.search.labels[si]] += 1;
        }
        let impurity = self.search.criterion.impurity(&class_counts, n_samples);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let budget_spent = self.config.max_leaves.is_some_and(|max_l| self.n_leaves >= max_l);

        if too_few || impurity.is_pure() || depth_exceeded || budget_spent {
            return self.push_leaf(&class_counts, impurity, n_samples);
        }

        let Some(split) = self.search.best_split(sample_indices, &mut self.rng) else {
            return self.push_leaf(&class_counts, impurity, n_samples);
        };
        if split.weighted_decrease(self.total_samples)
            < self.config.min_impurity_decrease - f64::EPSILON
        {
            return self.push_leaf(&class_counts, impurity, n_samples);
        }

        // One leaf becomes two.
        self.n_leaves += 1;

        // Reserve the slot, build children, then overwrite with the split.
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            prediction: 0,
            distribution: Vec::new(),
            impurity,
            n_samples,
        });
        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            gain: split.impurity_decrease,
        };
        NodeIndex::new(node_idx)
    }

    fn push_leaf(&mut self, class_counts: &[usize], impurity: Impurity, n_samples: usize) -> NodeIndex {
        let total = n_samples.max(1) as f64;
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            prediction: majority_class(class_counts),
            distribution: class_counts.iter().map(|&c| c as f64 / total).collect(),
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references for
/// cache-friendly traversal and trivial serialization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class code for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        self.check_width(sample)?;
        match &self.nodes[self.traverse(sample)] {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// The returned `Vec` has length `n_classes`, summing to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, RfError> {
        self.check_width(sample)?;
        match &self.nodes[self.traverse(sample)] {
            Node::Leaf { distribution, .. } => Ok(distribution.clone()),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the node arena. The root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of classes the tree was trained with.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the maximum depth of the tree. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match self.nodes[idx.index()].children() {
                Some((left, right)) => {
                    stack.push((left, d + 1));
                    stack.push((right, d + 1));
                }
                None => max_depth = max_depth.max(d),
            }
        }
        max_depth
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = NodeIndex::ROOT.index();
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    fn xor() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        (features, vec![0, 1, 1, 0])
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0], vec![2.0]], &[0])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::LabelCountMismatch { n_samples: 2, n_labels: 1 }
        ));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 0, 0]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn linearly_separable_correct_split() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn xor_needs_depth_at_least_2() {
        let (features, labels) = xor();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert!(tree.depth() >= 2);
        for (row, &label) in features.iter().zip(&labels) {
            assert_eq!(tree.predict(row).unwrap(), label);
        }
    }

    #[test]
    fn max_depth_limits_tree() {
        let (features, labels) = xor();
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, &labels)
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn max_leaves_caps_leaf_count() {
        let (features, labels) = xor();
        let tree = DecisionTreeConfig::new()
            .with_max_leaves(Some(2))
            .fit(&features, &labels)
            .unwrap();
        assert!(tree.n_leaves() <= 2, "leaves = {}", tree.n_leaves());
    }

    #[test]
    fn min_impurity_decrease_prunes_weak_splits() {
        let (features, labels) = separable();
        // The perfect root split decreases weighted Gini by 0.5.
        let tree = DecisionTreeConfig::new()
            .with_min_impurity_decrease(0.6)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);

        let tree = DecisionTreeConfig::new()
            .with_min_impurity_decrease(0.5)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn predict_proba_sums_to_one() {
        let features: Vec<Vec<f64>> = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0]
            .iter()
            .map(|&v| vec![v])
            .collect();
        let labels = vec![0, 0, 0, 1, 1, 1];
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let proba = tree.predict_proba(&[5.0]).unwrap();
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let features = vec![
            vec![1.0, 5.0],
            vec![2.0, 6.0],
            vec![3.0, 7.0],
            vec![10.0, 15.0],
            vec![11.0, 16.0],
            vec![12.0, 17.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let config = DecisionTreeConfig::new().with_max_features(Some(1)).with_seed(123);
        let tree1 = config.fit(&features, &labels).unwrap();
        let tree2 = config.fit(&features, &labels).unwrap();
        assert_eq!(tree1.n_nodes(), tree2.n_nodes());
        for sample in &features {
            assert_eq!(tree1.predict(sample).unwrap(), tree2.predict(sample).unwrap());
        }
    }

    #[test]
    fn prediction_feature_mismatch() {
        let tree = DecisionTreeConfig::new()
            .fit(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[0, 1])
            .unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn feature_count_mismatch_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, 2.0], vec![3.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, RfError::FeatureCountMismatch { sample_index: 1, .. }));
    }

    #[test]
    fn non_finite_value_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, f64::NAN], vec![3.0, 4.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::NonFiniteValue { sample_index: 0, feature_index: 1 }
        ));
    }

    #[test]
    fn majority_prefers_lowest_code_on_tie() {
        assert_eq!(majority_class(&[2, 2, 1]), 0);
        assert_eq!(majority_class(&[0, 3, 3]), 1);
    }
}
