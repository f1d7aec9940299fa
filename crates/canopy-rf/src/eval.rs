//! Evaluation strategies: leave-one-out cross-validation and a fixed
//! train/test split.

use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;

/// Outcome of predicting one held-out sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldOutPrediction {
    /// Index of the held-out sample in the full dataset.
    pub index: usize,
    /// Class code predicted for it.
    pub predicted: usize,
    /// Number of samples the model was trained on.
    pub n_train: usize,
}

/// Train on every sample except `index` and predict that sample.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::HoldOutOutOfRange`] | `index >= features.len()` |
/// | [`RfError::LabelCountMismatch`] | `labels.len() != features.len()` |
/// | Other RF errors | From underlying training or prediction |
pub fn hold_out(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
    index: usize,
) -> Result<HeldOutPrediction, RfError> {
    let n_samples = features.len();
    if labels.len() != n_samples {
        return Err(RfError::LabelCountMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    if index >= n_samples {
        return Err(RfError::HoldOutOutOfRange { index, n_samples });
    }

    let (train_features, train_labels): (Vec<Vec<f64>>, Vec<usize>) = features
        .iter()
        .zip(labels)
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, (row, &label))| (row.clone(), label))
        .unzip();

    let result = config.fit(&train_features, &train_labels, feature_names)?;
    let predicted = result.forest().predict(&features[index])?;

    Ok(HeldOutPrediction {
        index,
        predicted,
        n_train: train_features.len(),
    })
}

/// Aligned true and predicted class codes from one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// True class code per evaluated sample.
    pub true_labels: Vec<usize>,
    /// Predicted class code per evaluated sample, index-aligned with `true_labels`.
    pub predicted: Vec<usize>,
    /// Training-set size behind each prediction.
    pub training_sizes: Vec<usize>,
}

impl Evaluation {
    /// Fraction of correct predictions, 0.0 for an empty evaluation.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        accuracy(&self.true_labels, &self.predicted)
    }

    /// Number of correct predictions.
    #[must_use]
    pub fn n_correct(&self) -> usize {
        self.true_labels
            .iter()
            .zip(&self.predicted)
            .filter(|(t, p)| t == p)
            .count()
    }

    /// Number of wrong predictions.
    #[must_use]
    pub fn n_errors(&self) -> usize {
        self.true_labels.len() - self.n_correct()
    }
}

/// Fraction of positions where `true_labels` and `predicted` agree.
///
/// Compares up to the shorter sequence; returns 0.0 when it is empty.
#[must_use]
pub fn accuracy(true_labels: &[usize], predicted: &[usize]) -> f64 {
    let n = true_labels.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let correct = true_labels
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / n as f64
}

/// Leave-one-out cross-validation: N fits, each on N-1 samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveOneOut;

impl LeaveOneOut {
    /// Number of train/predict rounds for `n_samples` samples.
    #[must_use]
    pub fn n_splits(&self, n_samples: usize) -> usize {
        n_samples
    }

    /// Hold out each sample in input order and predict it from the rest.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero samples |
    /// | [`RfError::LabelCountMismatch`] | `labels.len() != features.len()` |
    /// | Other RF errors | From underlying training or prediction |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<Evaluation, RfError> {
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        let n_splits = self.n_splits(features.len());
        debug!(n_splits, "leave-one-out splits");

        let mut predicted = Vec::with_capacity(n_splits);
        let mut training_sizes = Vec::with_capacity(n_splits);
        for index in 0..n_splits {
            let held = hold_out(config, features, labels, feature_names, index)?;
            debug!(
                index,
                true_label = labels[index],
                predicted = held.predicted,
                n_train = held.n_train,
                "held-out sample predicted"
            );
            predicted.push(held.predicted);
            training_sizes.push(held.n_train);
        }

        let evaluation = Evaluation {
            true_labels: labels.to_vec(),
            predicted,
            training_sizes,
        };
        info!(
            n_correct = evaluation.n_correct(),
            n_errors = evaluation.n_errors(),
            "leave-one-out complete"
        );
        Ok(evaluation)
    }
}

/// Fit once on a training set and predict a separate test set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainTest;

impl TrainTest {
    /// Train on `(train_features, train_labels)` and predict every test row.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::LabelCountMismatch`] | test labels and rows differ in count |
    /// | [`RfError::PredictionFeatureMismatch`] | test rows differ in width from training rows |
    /// | Other RF errors | From underlying training |
    #[instrument(skip_all, fields(n_train = train_features.len(), n_test = test_features.len()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        train_features: &[Vec<f64>],
        train_labels: &[usize],
        test_features: &[Vec<f64>],
        test_labels: &[usize],
        feature_names: &[String],
    ) -> Result<Evaluation, RfError> {
        if test_labels.len() != test_features.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: test_features.len(),
                n_labels: test_labels.len(),
            });
        }

        let result = config.fit(train_features, train_labels, feature_names)?;
        let predicted = result.forest().predict_batch(test_features)?;

        let evaluation = Evaluation {
            true_labels: test_labels.to_vec(),
            predicted,
            training_sizes: vec![train_features.len(); test_features.len()],
        };
        info!(
            n_correct = evaluation.n_correct(),
            n_errors = evaluation.n_errors(),
            "train/test evaluation complete"
        );
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;

    fn four_samples() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        // Three genes, two clearly separated classes.
        let features = vec![
            vec![1.0, 2.0, 1.5],
            vec![1.2, 2.1, 1.4],
            vec![9.0, 8.5, 9.2],
            vec![9.3, 8.8, 9.1],
        ];
        let names = ["G1", "G2", "G3"].map(String::from).to_vec();
        (features, vec![0, 0, 1, 1], names)
    }

    fn config() -> RandomForestConfig {
        RandomForestConfig::new(100)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(17)
    }

    #[test]
    fn hold_out_trains_on_the_rest() {
        let (features, labels, names) = four_samples();
        let held = hold_out(&config(), &features, &labels, &names, 2).unwrap();
        assert_eq!(held.index, 2);
        assert_eq!(held.n_train, 3);
        assert_eq!(held.predicted, 1);
    }

    #[test]
    fn hold_out_index_out_of_range() {
        let (features, labels, names) = four_samples();
        let err = hold_out(&config(), &features, &labels, &names, 4).unwrap_err();
        assert!(matches!(err, RfError::HoldOutOutOfRange { index: 4, n_samples: 4 }));
    }

    #[test]
    fn leave_one_out_separable_is_perfect() {
        let (features, labels, names) = four_samples();
        let eval = LeaveOneOut.evaluate(&config(), &features, &labels, &names).unwrap();
        assert_eq!(eval.predicted, labels);
        assert_eq!(eval.training_sizes, vec![3; 4]);
        assert_eq!(eval.n_errors(), 0);
        assert!((eval.accuracy() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn leave_one_out_empty_dataset() {
        let err = LeaveOneOut.evaluate(&config(), &[], &[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn train_test_predicts_every_test_row() {
        let (features, labels, names) = four_samples();
        let test = vec![vec![1.1, 2.0, 1.3], vec![9.1, 8.7, 9.0], vec![0.9, 1.9, 1.6]];
        let eval = TrainTest
            .evaluate(&config(), &features, &labels, &test, &[0, 1, 1], &names)
            .unwrap();
        assert_eq!(eval.predicted, vec![0, 1, 0]);
        assert_eq!(eval.n_correct(), 2);
        assert_eq!(eval.n_errors(), 1);
        assert_eq!(eval.training_sizes, vec![4; 3]);
    }

    #[test]
    fn train_test_label_count_mismatch() {
        let (features, labels, names) = four_samples();
        let err = TrainTest
            .evaluate(&config(), &features, &labels, &[vec![1.0, 2.0, 1.5]], &[0, 1], &names)
            .unwrap_err();
        assert!(matches!(err, RfError::LabelCountMismatch { n_samples: 1, n_labels: 2 }));
    }

    #[test]
    fn accuracy_helper() {
        assert!((accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]) - 0.75).abs() < f64::EPSILON);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
