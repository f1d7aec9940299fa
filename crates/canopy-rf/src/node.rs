use std::fmt;

/// Zero-based feature (gene) row index in the training matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position of a node inside a tree's `Vec<Node>` arena. The root is always 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Impurity of a node under the forest's split criterion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return `true` when the node holds a single class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

/// A node in a decision tree arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature tested at this node.
        feature: FeatureIndex,
        /// Samples with `value <= threshold` go left.
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        /// Impurity before splitting.
        impurity: Impurity,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Unnormalized impurity decrease achieved by the split.
        gain: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Majority class of the samples in this leaf.
        prediction: usize,
        /// Class frequencies in this leaf, summing to 1.0.
        distribution: Vec<f64>,
        impurity: Impurity,
        n_samples: usize,
    },
}

impl Node {
    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return the node impurity.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return the `(left, right)` children of a split node.
    #[must_use]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match self {
            Node::Split { left, right, .. } => Some((*left, *right)),
            Node::Leaf { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Node {
        Node::Leaf {
            prediction: 1,
            distribution: vec![0.25, 0.75],
            impurity: Impurity::new(0.375),
            n_samples: 4,
        }
    }

    fn split() -> Node {
        Node::Split {
            feature: FeatureIndex::new(2),
            threshold: 1.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.5),
            n_samples: 8,
            gain: 4.0,
        }
    }

    #[test]
    fn root_is_index_zero() {
        assert_eq!(NodeIndex::ROOT.index(), 0);
        assert_eq!(NodeIndex::ROOT.to_string(), "#0");
    }

    #[test]
    fn leaf_has_no_children() {
        assert!(leaf().is_leaf());
        assert!(leaf().children().is_none());
        assert_eq!(leaf().n_samples(), 4);
    }

    #[test]
    fn split_children() {
        let node = split();
        assert!(!node.is_leaf());
        let (l, r) = node.children().unwrap();
        assert_eq!((l.index(), r.index()), (1, 2));
        assert_eq!(node.n_samples(), 8);
        assert!((node.impurity().value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn purity() {
        assert!(Impurity::new(0.0).is_pure());
        assert!(!Impurity::new(0.1).is_pure());
    }
}
