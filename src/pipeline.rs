//! Run orchestration: validate inputs, evaluate, export, write the report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canopy_io::{
    read_features, read_targets, validate_file, FeatureTable, FileFormat, IoError, OdfWriter,
    OutputName, PredictionReport, Role, SampleName, TargetTable,
};
use canopy_rf::{Evaluation, LeaveOneOut, RandomForestConfig, TrainTest};
use tracing::{debug, info, instrument};

/// Inputs and outputs of one run, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub feature: PathBuf,
    pub target: PathBuf,
    pub test_feature: Option<PathBuf>,
    pub test_target: Option<PathBuf>,
    /// Explicit report name; derived from `feature` when absent.
    pub pred_odf: Option<String>,
    pub model_output: bool,
    /// Directory receiving the report and model artifacts.
    pub output_dir: PathBuf,
}

/// How predictions are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    LeaveOneOut,
    TrainTest,
}

impl EvaluationMode {
    /// Leave-one-out unless at least one test file passed validation.
    #[must_use]
    pub fn select(test_feature: Option<FileFormat>, test_target: Option<FileFormat>) -> Self {
        if test_feature.is_none() && test_target.is_none() {
            Self::LeaveOneOut
        } else {
            Self::TrainTest
        }
    }
}

/// Run the whole pipeline. Returns the written report path, or `None` when
/// a required input failed validation and nothing was done.
#[instrument(skip_all, fields(feature = %run.feature.display()))]
pub fn run(run: &RunConfig, forest: &RandomForestConfig) -> Result<Option<PathBuf>> {
    let feature_format = validate_file(Some(run.feature.as_path()), Role::Feature);
    let target_format = validate_file(Some(run.target.as_path()), Role::Target);
    let (Some(feature_format), Some(target_format)) = (feature_format, target_format) else {
        debug!("required input failed validation, skipping run");
        return Ok(None);
    };
    let test_feature_format = validate_file(run.test_feature.as_deref(), Role::Feature);
    let test_target_format = validate_file(run.test_target.as_deref(), Role::Target);

    let features = read_features(&run.feature, feature_format, None)
        .context("failed to read training feature file")?;
    let targets =
        read_targets(&run.target, target_format).context("failed to read training target file")?;
    let rows = features.sample_rows();

    debug!(
        params = %serde_json::to_string(&forest.params())?,
        "classifier parameters"
    );

    let mode = EvaluationMode::select(test_feature_format, test_target_format);
    info!(?mode, "evaluation mode selected");
    let (evaluation, sample_names) = match mode {
        EvaluationMode::LeaveOneOut => {
            debug!(
                n_splits = LeaveOneOut.n_splits(rows.len()),
                n_features = features.n_features(),
                n_samples = features.n_samples(),
                "leave-one-out over training data"
            );
            let evaluation = LeaveOneOut
                .evaluate(forest, &rows, targets.labels(), features.feature_names())
                .context("leave-one-out evaluation failed")?;
            (evaluation, features.sample_names().to_vec())
        }
        EvaluationMode::TrainTest => {
            let (test_features, test_targets) = load_test_set(run, &features)?;
            debug!(
                n_train = features.n_samples(),
                n_test = test_features.n_samples(),
                n_features = features.n_features(),
                "train/test split"
            );
            let evaluation = TrainTest
                .evaluate(
                    forest,
                    &rows,
                    targets.labels(),
                    &test_features.sample_rows(),
                    test_targets.labels(),
                    features.feature_names(),
                )
                .context("train/test evaluation failed")?;
            (evaluation, test_features.sample_names().to_vec())
        }
    };
    log_evaluation(&evaluation);

    let name = OutputName::resolve(run.pred_odf.as_deref(), &run.feature);
    let writer = OdfWriter::new(&run.output_dir).context("failed to prepare output directory")?;

    if run.model_output {
        export_model(forest, &features, &targets, &name, &run.output_dir)?;
    }

    report(&evaluation, &sample_names, &targets, &name, &writer).map(Some)
}

/// Load the test tables, read with the training formats and aligned to
/// the training feature order.
fn load_test_set(run: &RunConfig, training: &FeatureTable) -> Result<(FeatureTable, TargetTable)> {
    let feature_path = run.test_feature.as_deref().ok_or(IoError::MissingInput {
        role: Role::Feature,
    })?;
    let target_path = run.test_target.as_deref().ok_or(IoError::MissingInput {
        role: Role::Target,
    })?;
    let features = read_features(feature_path, FileFormat::Gct, Some(training))
        .context("failed to read test feature file")?;
    let targets =
        read_targets(target_path, FileFormat::Cls).context("failed to read test target file")?;
    Ok((features, targets))
}

fn log_evaluation(evaluation: &Evaluation) {
    debug!(true_labels = ?evaluation.true_labels, "true target values");
    debug!(predicted = ?evaluation.predicted, "predicted target values");
    debug!(
        accuracy = %format!("{:.2}%", evaluation.accuracy() * 100.0),
        "accuracy score"
    );
}

/// Fit on all training data and write the JSON dump and binary checkpoint.
#[instrument(skip_all, fields(base = %name.model_basename()))]
fn export_model(
    forest: &RandomForestConfig,
    features: &FeatureTable,
    targets: &TargetTable,
    name: &OutputName,
    dir: &Path,
) -> Result<()> {
    let result = forest
        .fit(&features.sample_rows(), targets.labels(), features.feature_names())
        .context("full-data model training failed")?;
    let model = result.forest();

    let json_path = name.json_model_path(dir);
    let json = model.to_json().context("failed to dump model trees")?;
    fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let checkpoint_path = name.checkpoint_path(dir);
    model
        .save_checkpoint(&checkpoint_path)
        .context("failed to save model checkpoint")?;

    info!(
        json = %json_path.display(),
        checkpoint = %checkpoint_path.display(),
        n_trees = result.metadata().n_trees,
        "model exported"
    );
    Ok(())
}

fn report(
    evaluation: &Evaluation,
    sample_names: &[SampleName],
    targets: &TargetTable,
    name: &OutputName,
    writer: &OdfWriter,
) -> Result<PathBuf> {
    debug!(class_names = ?targets.class_names(), "target names");
    let report = PredictionReport::assemble(
        &evaluation.true_labels,
        &evaluation.predicted,
        sample_names,
        targets.class_names(),
    )
    .context("failed to assemble prediction report")?;

    debug!(output = %name, "output filename");
    let path = writer
        .write(name, &report)
        .context("failed to write prediction report")?;
    info!(
        n_correct = report.n_correct(),
        n_errors = report.n_errors(),
        "run complete"
    );
    Ok(path)
}
