//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig, to_columns, validate_matrix};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
    /// Samples per parallel prediction chunk.
    pub(crate) max_batch_size: usize,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Auto | MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Number of rows each tree is trained on: `ceil(n_samples * max_samples)`, at least 1.
pub(crate) fn draw_count(n_samples: usize, max_samples: f64) -> usize {
    ((n_samples as f64) * max_samples).ceil().max(1.0) as usize
}

/// Pick the rows one tree trains on.
///
/// With `bootstrap`, draws `draw_count` indices with replacement. Without it,
/// takes the first `draw_count` entries of a seeded permutation.
fn sample_rows(n_samples: usize, draw_count: usize, bootstrap: bool, rng: &mut impl Rng) -> Vec<usize> {
    if bootstrap {
        (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
    } else {
        let mut rows: Vec<usize> = (0..n_samples).collect();
        rows.shuffle(rng);
        rows.truncate(draw_count.min(n_samples));
        rows
    }
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_estimators = config.n_estimators, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    config.validate()?;
    let n_features = validate_matrix(features, labels)?;
    let n_samples = features.len();
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;

    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let draw_count = draw_count(n_samples, config.max_samples);
    let seed = config.seed.unwrap_or_else(rand::random);

    info!(
        n_estimators = config.n_estimators,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        draw_count,
        seed,
        "training random forest"
    );

    let col_features = to_columns(features, n_features);

    // Per-tree seeds from the master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(seed);
    let tree_seeds: Vec<u64> = (0..config.n_estimators).map(|_| master_rng.r#gen()).collect();

    let base_tree = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_max_leaves(config.max_leaves)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_min_impurity_decrease(config.min_impurity_decrease)
        .with_max_features(Some(max_features_resolved))
        .with_n_bins(config.n_bins);
    let bootstrap = config.bootstrap;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|tree_seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);
            let rows = sample_rows(n_samples, draw_count, bootstrap, &mut rng);
            base_tree.clone().with_seed(rng.r#gen()).grow(
                &col_features,
                labels,
                n_classes,
                &rows,
                max_features_resolved,
            )
        })
        .collect();

    debug!(
        n_trees_trained = trees.len(),
        mean_leaves = trees.iter().map(DecisionTree::n_leaves).sum::<usize>() as f64
            / trees.len() as f64,
        "tree training complete"
    );

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
        max_batch_size: config.max_batch_size,
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_estimators,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved,
        draw_count,
        seed,
    };

    Ok(RandomForestResult::new(forest, metadata))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    /// Generate a simple 3-class separable dataset.
    fn make_separable_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (class, offset) in [(0usize, 0.0), (1, 10.0), (2, 20.0)] {
            for i in 0..20 {
                features.push(vec![offset + i as f64 * 0.15, 0.5]);
                labels.push(class);
            }
        }
        let names = vec!["x".to_string(), "y".to_string()];
        (features, labels, names)
    }

    fn training_accuracy(config: &RandomForestConfig) -> f64 {
        let (features, labels, names) = make_separable_data();
        let result = config.fit(&features, &labels, &names).unwrap();
        let predictions = result.forest().predict_batch(&features).unwrap();
        let correct = predictions
            .iter()
            .zip(&labels)
            .filter(|&(&p, &l)| p == l)
            .count();
        correct as f64 / labels.len() as f64
    }

    #[test]
    fn three_class_separable_accuracy() {
        let config = RandomForestConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        let accuracy = training_accuracy(&config);
        assert!(accuracy > 0.9, "accuracy = {accuracy}");
    }

    #[test]
    fn without_bootstrap_accuracy() {
        let config = RandomForestConfig::new(20)
            .unwrap()
            .with_bootstrap(false)
            .with_max_samples(0.8)
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        let accuracy = training_accuracy(&config);
        assert!(accuracy > 0.9, "accuracy = {accuracy}");
    }

    #[test]
    fn entropy_criterion_accuracy() {
        let config = RandomForestConfig::new(30)
            .unwrap()
            .with_criterion(crate::SplitCriterion::Entropy)
            .with_n_bins(16)
            .with_seed(5);
        let accuracy = training_accuracy(&config);
        assert!(accuracy > 0.85, "accuracy = {accuracy}");
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_separable_data();
        let config = RandomForestConfig::new(10).unwrap().with_seed(99);
        let preds1 = config
            .fit(&features, &labels, &names)
            .unwrap()
            .forest()
            .predict_batch(&features)
            .unwrap();
        let preds2 = config
            .fit(&features, &labels, &names)
            .unwrap()
            .forest()
            .predict_batch(&features)
            .unwrap();
        assert_eq!(preds1, preds2);
    }

    #[test]
    fn unseeded_fit_records_drawn_seed() {
        let (features, labels, names) = make_separable_data();
        let result = RandomForestConfig::new(3)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        let replay = RandomForestConfig::new(3)
            .unwrap()
            .with_seed(result.metadata().seed)
            .fit(&features, &labels, &names)
            .unwrap();
        assert_eq!(
            result.forest().predict_batch(&features).unwrap(),
            replay.forest().predict_batch(&features).unwrap()
        );
    }

    #[test]
    fn metadata_reports_draw_count() {
        let (features, labels, names) = make_separable_data();
        let result = RandomForestConfig::new(2)
            .unwrap()
            .with_max_samples(0.5)
            .with_seed(1)
            .fit(&features, &labels, &names)
            .unwrap();
        let meta = result.metadata();
        assert_eq!(meta.draw_count, 30);
        assert_eq!(meta.n_classes, 3);
        assert_eq!(meta.max_features_resolved, 2);
        assert_eq!(result.forest().n_trees(), 2);
    }

    #[test]
    fn resolve_max_features_variants() {
        assert_eq!(resolve_max_features(MaxFeatures::Auto, 100).unwrap(), 10);
        assert_eq!(resolve_max_features(MaxFeatures::Sqrt, 10).unwrap(), 4);
        assert_eq!(resolve_max_features(MaxFeatures::Log2, 8).unwrap(), 3);
        assert_eq!(resolve_max_features(MaxFeatures::Fraction(0.5), 9).unwrap(), 5);
        assert_eq!(resolve_max_features(MaxFeatures::All, 7).unwrap(), 7);
        assert!(matches!(
            resolve_max_features(MaxFeatures::Fixed(8), 7),
            Err(RfError::InvalidMaxFeatures { max_features: 8, n_features: 7 })
        ));
        assert!(resolve_max_features(MaxFeatures::Fixed(0), 7).is_err());
    }

    #[test]
    fn sample_rows_without_replacement_is_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut rows = sample_rows(10, 6, false, &mut rng);
        assert_eq!(rows.len(), 6);
        rows.sort_unstable();
        rows.dedup();
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn draw_count_never_zero() {
        assert_eq!(draw_count(1, 0.1), 1);
        assert_eq!(draw_count(10, 1.0), 10);
        assert_eq!(draw_count(10, 0.25), 3);
    }

    #[test]
    fn empty_dataset_error() {
        let config = RandomForestConfig::new(10).unwrap();
        let err = config.fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn invalid_config_rejected_before_training() {
        let (features, labels, names) = make_separable_data();
        let err = RandomForestConfig::new(10)
            .unwrap()
            .with_n_bins(1)
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidBinCount { n_bins: 1 }));
    }
}
