//! Prediction methods for the Random Forest ensemble.

use rayon::prelude::*;

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// Class probability distribution from a prediction.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class: the lowest code among the most probable.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (idx, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = idx;
            }
        }
        best
    }

    /// Return the probability of the predicted class.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.probs.get(self.predicted_class()).copied().unwrap_or(0.0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class code for a single sample.
    ///
    /// Returns the argmax of the averaged probability distribution.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (slot, p) in avg.iter_mut().zip(tree.predict_proba(sample)?) {
                *slot += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(avg))
    }

    /// Predict class codes for a batch of samples.
    ///
    /// Samples are split into chunks of `max_batch_size` rows that are
    /// scored in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        Ok(self
            .predict_proba_batch(features)?
            .iter()
            .map(ClassDistribution::predicted_class)
            .collect())
    }

    /// Return probability distributions for a batch of samples.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, RfError> {
        let chunks: Vec<Vec<ClassDistribution>> = features
            .par_chunks(self.max_batch_size.max(1))
            .map(|chunk| -> Result<Vec<ClassDistribution>, RfError> {
                chunk.iter().map(|sample| self.predict_proba(sample)).collect()
            })
            .collect::<Result<_, RfError>>()?;
        Ok(chunks.into_iter().flatten().collect())
    }

    /// Return the trees of the ensemble.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RandomForestConfig;

    use super::*;

    fn fit(max_batch_size: usize) -> RandomForest {
        let features: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, 1.0]).collect();
        let labels: Vec<usize> = (0..12).map(|i| usize::from(i >= 6)).collect();
        RandomForestConfig::new(8)
            .unwrap()
            .with_seed(3)
            .with_max_batch_size(max_batch_size)
            .fit(&features, &labels, &["a".into(), "b".into()])
            .unwrap()
            .into_forest()
    }

    #[test]
    fn batch_matches_individual_for_any_chunk_size() {
        let samples: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64 + 0.2, 1.0]).collect();
        for batch in [1, 5, 4096] {
            let forest = fit(batch);
            let probs = forest.predict_proba_batch(&samples).unwrap();
            assert_eq!(probs.len(), samples.len());
            for (sample, dist) in samples.iter().zip(&probs) {
                let single = forest.predict_proba(sample).unwrap();
                assert_eq!(dist.as_slice(), single.as_slice());
            }
        }
    }

    #[test]
    fn batch_reports_width_errors() {
        let forest = fit(2);
        let err = forest
            .predict_batch(&[vec![1.0, 1.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn predicted_class_prefers_lowest_on_tie() {
        let dist = ClassDistribution::new(vec![0.4, 0.4, 0.2]);
        assert_eq!(dist.predicted_class(), 0);
        assert!((dist.confidence() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn accessors() {
        let forest = fit(16);
        assert_eq!(forest.n_trees(), 8);
        assert_eq!(forest.trees().len(), 8);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.n_classes(), 2);
        assert_eq!(forest.feature_names(), ["a", "b"]);
    }
}
