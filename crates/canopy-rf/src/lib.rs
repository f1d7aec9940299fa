//! Random Forest classification: train, evaluate, predict, export.
//!
//! A multi-threaded CPU random forest over histogram-binned CART trees,
//! with Gini/Entropy split criteria, bootstrap or subsampled rows per tree,
//! leave-one-out and train/test evaluation, a JSON tree dump and versioned
//! binary checkpoints.

mod config;
mod dump;
mod error;
mod eval;
mod forest;
mod histogram;
mod node;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{ForestParams, MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use eval::{Evaluation, HeldOutPrediction, LeaveOneOut, TrainTest, accuracy, hold_out};
pub use forest::RandomForest;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
