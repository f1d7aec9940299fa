//! Command-line definition and conversion into run and classifier configs.

use std::path::PathBuf;

use canopy_rf::{MaxFeatures, RandomForestConfig, RfError, SplitCriterion};
use clap::{ArgAction, Parser};

use crate::pipeline::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(about = "Random forest classification of GCT/CLS expression data")]
#[command(version)]
pub struct Cli {
    /// Training feature file (.gct)
    #[arg(short = 'f', long = "feature")]
    pub feature: PathBuf,

    /// Training target file (.cls)
    #[arg(short = 't', long = "target")]
    pub target: PathBuf,

    /// Test feature file (.gct); enables train/test mode
    #[arg(long = "test_feat")]
    pub test_feat: Option<PathBuf>,

    /// Test target file (.cls); enables train/test mode
    #[arg(long = "test_tar")]
    pub test_tar: Option<PathBuf>,

    /// Prediction output filename (default: <feature stem>.pred.odf)
    #[arg(short = 'p', long = "pred_odf")]
    pub pred_odf: Option<String>,

    /// Export the model trained on all training data
    #[arg(long = "model_output", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true", value_parser = parse_bool)]
    pub model_output: bool,

    /// Draw a bootstrap sample for each tree
    #[arg(long = "bootstrap", action = ArgAction::Set, num_args = 0..=1,
          default_value = "true", default_missing_value = "true", value_parser = parse_bool)]
    pub bootstrap: bool,

    /// Split criterion: gini or entropy
    #[arg(long = "split_criterion", default_value = "gini", value_parser = parse_criterion)]
    pub split_criterion: SplitCriterion,

    /// Maximum tree depth
    #[arg(long = "max_depth", default_value_t = 16)]
    pub max_depth: usize,

    /// Maximum leaves per tree (-1 for unlimited)
    #[arg(long = "max_leaves", default_value_t = -1, allow_negative_numbers = true)]
    pub max_leaves: i64,

    /// Fraction of samples drawn per tree, in (0, 1]
    #[arg(long = "max_samples", default_value_t = 1.0)]
    pub max_samples: f64,

    /// Features tried per split: auto, sqrt, log2, all, a count or a ratio
    #[arg(long = "max_features", default_value = "auto", value_parser = parse_max_features)]
    pub max_features: MaxFeatures,

    /// Minimum weighted impurity decrease required to split
    #[arg(long = "min_impurity_decrease", default_value_t = 0.0)]
    pub min_impurity_decrease: f64,

    /// Minimum samples in a leaf
    #[arg(long = "min_samples_leaf", default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Minimum samples to split a node
    #[arg(long = "min_samples_split", default_value_t = 2)]
    pub min_samples_split: usize,

    /// Number of trees
    #[arg(long = "n_estimators", default_value_t = 100)]
    pub n_estimators: usize,

    /// Histogram bins per feature
    #[arg(long = "n_bins", default_value_t = 128)]
    pub n_bins: usize,

    /// Worker threads used for training and prediction
    #[arg(long = "n_streams", default_value_t = 4, value_parser = parse_positive)]
    pub n_streams: usize,

    /// Integer seed, or None for fresh entropy
    #[arg(long = "random_state", default_value = "None", value_parser = parse_random_state)]
    pub random_state: std::option::Option<u64>,

    /// Samples per prediction batch
    #[arg(long = "max_batch_size", default_value_t = 4096)]
    pub max_batch_size: usize,

    /// Classifier verbosity (0-3)
    #[arg(short = 'v', long = "verbose", num_args = 0..=1,
          default_value_t = 0, default_missing_value = "1")]
    pub verbose: u8,

    /// Print program debug messages
    #[arg(short = 'd', long = "debug", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true", value_parser = parse_bool)]
    pub debug: bool,
}

impl Cli {
    /// Paths, output naming and flags for one run. The report lands in the
    /// current working directory.
    #[must_use]
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            feature: self.feature.clone(),
            target: self.target.clone(),
            test_feature: self.test_feat.clone(),
            test_target: self.test_tar.clone(),
            pred_odf: self.pred_odf.clone(),
            model_output: self.model_output,
            output_dir: PathBuf::from("."),
        }
    }

    /// Classifier hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] for zero trees and
    /// [`RfError::InvalidMaxLeaves`] for a negative leaf count other than -1.
    /// Other ranges are checked when the forest is fitted.
    pub fn forest_config(&self) -> Result<RandomForestConfig, RfError> {
        let max_leaves = match self.max_leaves {
            -1 => None,
            n => Some(usize::try_from(n).map_err(|_| RfError::InvalidMaxLeaves { max_leaves: n })?),
        };
        Ok(RandomForestConfig::new(self.n_estimators)?
            .with_bootstrap(self.bootstrap)
            .with_criterion(self.split_criterion)
            .with_max_depth(Some(self.max_depth))
            .with_max_leaves(max_leaves)
            .with_max_samples(self.max_samples)
            .with_max_features(self.max_features)
            .with_min_impurity_decrease(self.min_impurity_decrease)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_min_samples_split(self.min_samples_split)
            .with_n_bins(self.n_bins)
            .with_random_state(self.random_state)
            .with_max_batch_size(self.max_batch_size))
    }
}

/// Accept `True/False/true/false/1/0`.
fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        other => Err(format!("expected True/False/true/false/1/0, got \"{other}\"")),
    }
}

fn parse_random_state(s: &str) -> Result<Option<u64>, String> {
    if s == "None" {
        return Ok(None);
    }
    s.parse::<u64>()
        .map(Some)
        .map_err(|_| format!("expected an unsigned integer or None, got \"{s}\""))
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected an integer >= 1, got \"{s}\"")),
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion, String> {
    s.parse().map_err(|e: RfError| e.to_string())
}

fn parse_max_features(s: &str) -> Result<MaxFeatures, String> {
    s.parse().map_err(|e: RfError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["canopy", "-f", "train.gct", "-t", "train.cls"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert!(!cli.model_output);
        assert!(cli.bootstrap);
        assert!(!cli.debug);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.max_leaves, -1);
        assert_eq!(cli.n_streams, 4);
        assert_eq!(cli.random_state, None);
        assert_eq!(cli.max_features, MaxFeatures::Auto);

        let config = cli.forest_config().unwrap();
        assert_eq!(config.n_estimators(), 100);
        assert_eq!(config.max_leaves(), None);
        assert_eq!(config.max_depth(), Some(16));
        assert_eq!(config.seed(), None);
    }

    #[test]
    fn bool_flags_accept_bare_and_explicit_values() {
        let cli = parse(&["--model_output", "--debug", "False", "--bootstrap", "0"]);
        assert!(cli.model_output);
        assert!(!cli.debug);
        assert!(!cli.bootstrap);

        let cli = parse(&["-d", "True", "--model_output", "1"]);
        assert!(cli.debug);
        assert!(cli.model_output);

        let argv = ["canopy", "-f", "a.gct", "-t", "a.cls", "--debug", "yes"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn verbose_bare_means_one() {
        assert_eq!(parse(&["-v"]).verbose, 1);
        assert_eq!(parse(&["--verbose", "3"]).verbose, 3);
    }

    #[test]
    fn random_state_and_leaves() {
        let cli = parse(&["--random_state", "7", "--max_leaves", "8"]);
        let config = cli.forest_config().unwrap();
        assert_eq!(config.seed(), Some(7));
        assert_eq!(config.max_leaves(), Some(8));

        let cli = parse(&["--max_leaves", "-5"]);
        assert!(matches!(
            cli.forest_config(),
            Err(RfError::InvalidMaxLeaves { max_leaves: -5 })
        ));
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            ["--split_criterion", "mse"],
            ["--max_features", "1.5"],
            ["--n_streams", "0"],
            ["--random_state", "seed"],
        ] {
            let mut argv = vec!["canopy", "-f", "a.gct", "-t", "a.cls"];
            argv.extend_from_slice(&bad);
            assert!(Cli::try_parse_from(argv).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn run_config_carries_paths() {
        let cli = parse(&["--test_feat", "test.gct", "-p", "out/run.pred.odf"]);
        let run = cli.run_config();
        assert_eq!(run.test_feature.as_deref(), Some(std::path::Path::new("test.gct")));
        assert_eq!(run.test_target, None);
        assert_eq!(run.pred_odf.as_deref(), Some("out/run.pred.odf"));
        assert_eq!(run.output_dir, PathBuf::from("."));
    }

    #[test]
    fn zero_trees_rejected() {
        let cli = parse(&["--n_estimators", "0"]);
        assert!(matches!(cli.forest_config(), Err(RfError::InvalidTreeCount { .. })));
    }
}
