use std::fmt;
use std::str::FromStr;

use crate::error::RfError;
use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero (pure node).
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

impl FromStr for SplitCriterion {
    type Err = RfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gini" => Ok(Self::Gini),
            "entropy" => Ok(Self::Entropy),
            _ => Err(RfError::UnknownCriterion {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gini => f.write_str("gini"),
            Self::Entropy => f.write_str("entropy"),
        }
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value: samples with `value <= threshold` go left.
    pub(crate) threshold: f64,
    /// Unnormalized impurity decrease `n·I - n_l·I_l - n_r·I_r`.
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

impl SplitResult {
    /// Impurity decrease weighted by the node's share of the tree's samples.
    ///
    /// Equals `N_t / N · (I - N_l / N_t · I_l - N_r / N_t · I_r)`, the
    /// quantity compared against `min_impurity_decrease`.
    pub(crate) fn weighted_decrease(&self, total_samples: usize) -> f64 {
        self.impurity_decrease / total_samples as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(&[4, 0], 4);
        assert!(imp.value().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[2, 2], 4);
        assert!((imp.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[3, 3], 6);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn entropy_skips_empty_classes() {
        let imp = SplitCriterion::Entropy.impurity(&[5, 0, 5], 10);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn empty_node_is_pure() {
        assert_eq!(SplitCriterion::Gini.impurity(&[0, 0], 0).value(), 0.0);
    }

    #[test]
    fn criterion_from_str() {
        assert_eq!("gini".parse::<SplitCriterion>().unwrap(), SplitCriterion::Gini);
        assert_eq!("Entropy".parse::<SplitCriterion>().unwrap(), SplitCriterion::Entropy);
        assert!(matches!(
            "mse".parse::<SplitCriterion>(),
            Err(RfError::UnknownCriterion { .. })
        ));
    }

    #[test]
    fn criterion_display_round_trips() {
        for criterion in [SplitCriterion::Gini, SplitCriterion::Entropy] {
            assert_eq!(criterion.to_string().parse::<SplitCriterion>().unwrap(), criterion);
        }
    }

    #[test]
    fn weighted_decrease_normalizes_by_tree_size() {
        let split = SplitResult {
            feature: FeatureIndex::new(0),
            threshold: 0.5,
            impurity_decrease: 2.0,
            left_indices: vec![0, 1],
            right_indices: vec![2, 3],
        };
        assert!((split.weighted_decrease(8) - 0.25).abs() < f64::EPSILON);
    }
}
