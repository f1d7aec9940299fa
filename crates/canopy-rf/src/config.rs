//! Configuration builder for Random Forest training.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::SplitCriterion;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Classifier default, identical to [`MaxFeatures::Sqrt`].
    Auto,
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl FromStr for MaxFeatures {
    type Err = RfError;

    /// Parse `auto`, `sqrt`, `log2`, `all`, an integer count or a ratio.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "auto" => return Ok(Self::Auto),
            "sqrt" => return Ok(Self::Sqrt),
            "log2" => return Ok(Self::Log2),
            "all" | "none" => return Ok(Self::All),
            _ => {}
        }
        if let Ok(count) = trimmed.parse::<usize>() {
            return Ok(Self::Fixed(count));
        }
        match trimmed.parse::<f64>() {
            Ok(ratio) if ratio > 0.0 && ratio <= 1.0 => Ok(Self::Fraction(ratio)),
            _ => Err(RfError::UnknownMaxFeatures {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Sqrt => f.write_str("sqrt"),
            Self::Log2 => f.write_str("log2"),
            Self::Fraction(ratio) => write!(f, "{ratio}"),
            Self::Fixed(count) => write!(f, "{count}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Snapshot of every classifier hyperparameter, for logging and introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub bootstrap: bool,
    pub max_samples: f64,
    pub max_features: String,
    pub max_depth: Option<usize>,
    pub max_leaves: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub min_impurity_decrease: f64,
    pub split_criterion: SplitCriterion,
    pub n_bins: usize,
    pub random_state: Option<u64>,
    pub max_batch_size: usize,
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter               | Default       |
/// |-------------------------|---------------|
/// | `bootstrap`             | `true`        |
/// | `max_samples`           | 1.0           |
/// | `max_features`          | `Auto`        |
/// | `max_depth`             | `Some(16)`    |
/// | `max_leaves`            | `None`        |
/// | `min_samples_split`     | 2             |
/// | `min_samples_leaf`      | 1             |
/// | `min_impurity_decrease` | 0.0           |
/// | `criterion`             | `Gini`        |
/// | `n_bins`                | 128           |
/// | `seed`                  | `None` (fresh entropy per fit) |
/// | `max_batch_size`        | 4096          |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_estimators: usize,
    pub(crate) bootstrap: bool,
    pub(crate) max_samples: f64,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_leaves: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_impurity_decrease: f64,
    pub(crate) criterion: SplitCriterion,
    pub(crate) n_bins: usize,
    pub(crate) seed: Option<u64>,
    pub(crate) max_batch_size: usize,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn new(n_estimators: usize) -> Result<Self, RfError> {
        if n_estimators == 0 {
            return Err(RfError::InvalidTreeCount { n_estimators });
        }
        Ok(Self {
            n_estimators,
            bootstrap: true,
            max_samples: 1.0,
            max_features: MaxFeatures::Auto,
            max_depth: Some(16),
            max_leaves: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_impurity_decrease: 0.0,
            criterion: SplitCriterion::Gini,
            n_bins: 128,
            seed: None,
            max_batch_size: 4096,
        })
    }

    // --- Setters ---

    /// Enable or disable bootstrap resampling per tree.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the ratio of samples drawn for each tree.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: f64) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum number of leaves per tree. `None` means unlimited.
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

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the number of histogram bins per feature.
    #[must_use]
    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    /// Fix the random seed. Without one, every fit draws a fresh seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set or clear the random seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Set how many samples are predicted per parallel batch.
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return whether bootstrap resampling is enabled.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Return the per-tree sample ratio.
    #[must_use]
    pub fn max_samples(&self) -> f64 {
        self.max_samples
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
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

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the number of histogram bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Return the fixed random seed, if any.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Return the prediction batch size.
    #[must_use]
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Return a serializable snapshot of all hyperparameters.
    #[must_use]
    pub fn params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            bootstrap: self.bootstrap,
            max_samples: self.max_samples,
            max_features: self.max_features.to_string(),
            max_depth: self.max_depth,
            max_leaves: self.max_leaves,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            min_impurity_decrease: self.min_impurity_decrease,
            split_criterion: self.criterion,
            n_bins: self.n_bins,
            random_state: self.seed,
            max_batch_size: self.max_batch_size,
        }
    }

    /// Check every hyperparameter that does not depend on the dataset.
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                   |
    /// |-------------------------------------------|----------------------------------------|
    /// | [`RfError::InvalidMaxDepth`]              | `max_depth` is `Some(0)`               |
    /// | [`RfError::InvalidMaxLeaves`]             | `max_leaves` is `Some(n)` with n < 2   |
    /// | [`RfError::InvalidMinSamplesSplit`]       | `min_samples_split` < 2                |
    /// | [`RfError::InvalidMinSamplesLeaf`]        | `min_samples_leaf` < 1                 |
    /// | [`RfError::InvalidMinImpurityDecrease`]   | negative or non-finite                 |
    /// | [`RfError::InvalidMaxSamples`]            | `max_samples` not in (0.0, 1.0]        |
    /// | [`RfError::InvalidBinCount`]              | `n_bins` < 2                           |
    /// | [`RfError::InvalidBatchSize`]             | `max_batch_size` is zero               |
    pub fn validate(&self) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if let Some(max_leaves) = self.max_leaves
            && max_leaves < 2
        {
            return Err(RfError::InvalidMaxLeaves {
                max_leaves: max_leaves as i64,
            });
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
        if !self.min_impurity_decrease.is_finite() || self.min_impurity_decrease < 0.0 {
            return Err(RfError::InvalidMinImpurityDecrease {
                value: self.min_impurity_decrease,
            });
        }
        if !(self.max_samples > 0.0 && self.max_samples <= 1.0) {
            return Err(RfError::InvalidMaxSamples {
                fraction: self.max_samples,
            });
        }
        if self.n_bins < 2 {
            return Err(RfError::InvalidBinCount { n_bins: self.n_bins });
        }
        if self.max_batch_size == 0 {
            return Err(RfError::InvalidBatchSize {
                max_batch_size: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Train a Random Forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]`: row-major layout.
    /// `labels[sample_idx]`: class codes (zero-based).
    /// `feature_names`: names for each feature column.
    ///
    /// # Errors
    ///
    /// Any error from [`RandomForestConfig::validate`], plus:
    ///
    /// | Variant                            | When                                             |
    /// |------------------------------------|--------------------------------------------------|
    /// | [`RfError::EmptyDataset`]          | `features` is empty                              |
    /// | [`RfError::LabelCountMismatch`]    | `labels.len() != features.len()`                 |
    /// | [`RfError::ZeroFeatures`]          | rows have zero feature columns                   |
    /// | [`RfError::FeatureCountMismatch`]  | rows have inconsistent lengths                   |
    /// | [`RfError::NonFiniteValue`]        | any value is NaN or infinite                     |
    /// | [`RfError::InvalidMaxFeatures`]    | resolved max_features is outside [1, n_features] |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = RandomForestConfig::new(100).unwrap();
        assert!(config.bootstrap());
        assert_eq!(config.max_depth(), Some(16));
        assert_eq!(config.max_leaves(), None);
        assert_eq!(config.n_bins(), 128);
        assert_eq!(config.max_batch_size(), 4096);
        assert_eq!(config.seed(), None);
        assert_eq!(config.criterion(), SplitCriterion::Gini);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_estimators: 0 })
        ));
    }

    #[test]
    fn max_features_parsing() {
        assert_eq!("auto".parse::<MaxFeatures>().unwrap(), MaxFeatures::Auto);
        assert_eq!("SQRT".parse::<MaxFeatures>().unwrap(), MaxFeatures::Sqrt);
        assert_eq!("log2".parse::<MaxFeatures>().unwrap(), MaxFeatures::Log2);
        assert_eq!("7".parse::<MaxFeatures>().unwrap(), MaxFeatures::Fixed(7));
        assert_eq!("0.25".parse::<MaxFeatures>().unwrap(), MaxFeatures::Fraction(0.25));
        assert!(matches!(
            "1.5".parse::<MaxFeatures>(),
            Err(RfError::UnknownMaxFeatures { .. })
        ));
        assert!("many".parse::<MaxFeatures>().is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = RandomForestConfig::new(10).unwrap();
        assert!(matches!(
            base.clone().with_max_depth(Some(0)).validate(),
            Err(RfError::InvalidMaxDepth { .. })
        ));
        assert!(matches!(
            base.clone().with_max_leaves(Some(1)).validate(),
            Err(RfError::InvalidMaxLeaves { max_leaves: 1 })
        ));
        assert!(matches!(
            base.clone().with_min_samples_split(1).validate(),
            Err(RfError::InvalidMinSamplesSplit { .. })
        ));
        assert!(matches!(
            base.clone().with_min_samples_leaf(0).validate(),
            Err(RfError::InvalidMinSamplesLeaf { .. })
        ));
        assert!(matches!(
            base.clone().with_min_impurity_decrease(-0.1).validate(),
            Err(RfError::InvalidMinImpurityDecrease { .. })
        ));
        assert!(matches!(
            base.clone().with_max_samples(0.0).validate(),
            Err(RfError::InvalidMaxSamples { .. })
        ));
        assert!(matches!(
            base.clone().with_n_bins(1).validate(),
            Err(RfError::InvalidBinCount { .. })
        ));
        assert!(matches!(
            base.with_max_batch_size(0).validate(),
            Err(RfError::InvalidBatchSize { .. })
        ));
    }

    #[test]
    fn params_reflect_builder() {
        let params = RandomForestConfig::new(25)
            .unwrap()
            .with_bootstrap(false)
            .with_max_features(MaxFeatures::Log2)
            .with_criterion(SplitCriterion::Entropy)
            .with_seed(7)
            .params();
        assert_eq!(params.n_estimators, 25);
        assert!(!params.bootstrap);
        assert_eq!(params.max_features, "log2");
        assert_eq!(params.split_criterion, SplitCriterion::Entropy);
        assert_eq!(params.random_state, Some(7));
    }
}
