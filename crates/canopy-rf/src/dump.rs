//! Human-readable JSON dump of a fitted forest (`*_json_model.txt`).
//!
//! Each tree renders as nested objects rooted at node 0. Split nodes carry
//! `split_feature`, `split_threshold`, `gain`, `instance_count` and the ids
//! of their `yes` (`<= threshold`) and `no` children; leaves carry
//! `leaf_value`, the class distribution of the training rows that reached
//! them.

use serde::Serialize;

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::node::{Node, NodeIndex};
use crate::tree::DecisionTree;

#[derive(Serialize)]
#[serde(untagged)]
enum DumpNode {
    Split {
        nodeid: usize,
        depth: usize,
        split_feature: usize,
        split_feature_name: Option<String>,
        split_threshold: f64,
        gain: f64,
        instance_count: usize,
        yes: usize,
        no: usize,
        children: [Box<DumpNode>; 2],
    },
    Leaf {
        nodeid: usize,
        depth: usize,
        leaf_value: Vec<f64>,
        instance_count: usize,
    },
}

fn dump_node(tree: &DecisionTree, idx: NodeIndex, depth: usize, names: &[String]) -> DumpNode {
    match &tree.nodes[idx.index()] {
        Node::Split {
            feature,
            threshold,
            left,
            right,
            n_samples,
            gain,
            ..
        } => DumpNode::Split {
            nodeid: idx.index(),
            depth,
            split_feature: feature.index(),
            split_feature_name: names.get(feature.index()).cloned(),
            split_threshold: *threshold,
            gain: *gain,
            instance_count: *n_samples,
            yes: left.index(),
            no: right.index(),
            children: [
                Box::new(dump_node(tree, *left, depth + 1, names)),
                Box::new(dump_node(tree, *right, depth + 1, names)),
            ],
        },
        Node::Leaf {
            distribution,
            n_samples,
            ..
        } => DumpNode::Leaf {
            nodeid: idx.index(),
            depth,
            leaf_value: distribution.clone(),
            instance_count: *n_samples,
        },
    }
}

impl RandomForest {
    /// Render every tree as pretty-printed JSON, one array element per tree.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::DumpModel`] if serde_json fails to render a value.
    pub fn to_json(&self) -> Result<String, RfError> {
        let trees: Vec<DumpNode> = self
            .trees
            .iter()
            .map(|tree| dump_node(tree, NodeIndex::ROOT, 0, &self.feature_names))
            .collect();
        serde_json::to_string_pretty(&trees).map_err(|source| RfError::DumpModel { source })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};

    #[test]
    fn dump_lists_every_tree_with_split_and_leaves() {
        let features = vec![vec![1.0], vec![2.0], vec![9.0], vec![10.0]];
        let labels = vec![0, 0, 1, 1];
        let forest = RandomForestConfig::new(3)
            .unwrap()
            .with_bootstrap(false)
            .with_max_features(MaxFeatures::All)
            .with_seed(8)
            .fit(&features, &labels, &["GENE_A".to_string()])
            .unwrap()
            .into_forest();

        let json = forest.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let trees = parsed.as_array().unwrap();
        assert_eq!(trees.len(), 3);

        let root = &trees[0];
        assert_eq!(root["nodeid"], 0);
        assert_eq!(root["split_feature"], 0);
        assert_eq!(root["split_feature_name"], "GENE_A");
        assert_eq!(root["instance_count"], 4);
        let children = root["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["nodeid"], root["yes"]);
        assert_eq!(children[0]["leaf_value"][0], 1.0);
        assert_eq!(children[1]["leaf_value"][1], 1.0);
    }
}
