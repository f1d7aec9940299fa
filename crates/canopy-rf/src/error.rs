use std::path::PathBuf;

/// Errors from Random Forest configuration, training, evaluation and export.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_estimators is zero.
    #[error("n_estimators must be at least 1, got {n_estimators}")]
    InvalidTreeCount {
        /// The invalid n_estimators value provided.
        n_estimators: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when max_leaves is set below 2.
    #[error("max_leaves must be at least 2 (or unlimited), got {max_leaves}")]
    InvalidMaxLeaves {
        /// The invalid max_leaves value provided.
        max_leaves: i64,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when min_impurity_decrease is negative or not finite.
    #[error("min_impurity_decrease must be a finite value >= 0.0, got {value}")]
    InvalidMinImpurityDecrease {
        /// The invalid min_impurity_decrease value provided.
        value: f64,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when a max_features string cannot be parsed.
    #[error("invalid max_features \"{value}\": expected auto, sqrt, log2, all, an integer count or a ratio in (0.0, 1.0]")]
    UnknownMaxFeatures {
        /// The raw value that failed to parse.
        value: String,
    },

    /// Returned when max_samples is not in (0.0, 1.0].
    #[error("max_samples must be in (0.0, 1.0], got {fraction}")]
    InvalidMaxSamples {
        /// The invalid max_samples value provided.
        fraction: f64,
    },

    /// Returned when n_bins is below 2.
    #[error("n_bins must be at least 2, got {n_bins}")]
    InvalidBinCount {
        /// The invalid n_bins value provided.
        n_bins: usize,
    },

    /// Returned when max_batch_size is zero.
    #[error("max_batch_size must be at least 1, got {max_batch_size}")]
    InvalidBatchSize {
        /// The invalid max_batch_size value provided.
        max_batch_size: usize,
    },

    /// Returned when a split criterion name is not recognised.
    #[error("unknown split criterion \"{name}\" (expected gini or entropy)")]
    UnknownCriterion {
        /// The unrecognised name.
        name: String,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the number of labels differs from the number of samples.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows (samples).
        n_samples: usize,
        /// Number of labels supplied.
        n_labels: usize,
    },

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a held-out index is outside the dataset.
    #[error("held-out index {index} is out of range for {n_samples} samples")]
    HoldOutOutOfRange {
        /// The requested held-out sample index.
        index: usize,
        /// Number of samples in the dataset.
        n_samples: usize,
    },

    /// Returned when the JSON model dump cannot be produced.
    #[error("failed to render JSON model dump")]
    DumpModel {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the checkpoint that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing a model artifact fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading a model checkpoint fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a checkpoint with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The checkpoint format version this build expects.
        expected: u32,
        /// The checkpoint format version found in the file.
        found: u32,
        /// Path to the checkpoint with the incompatible version.
        path: PathBuf,
    },
}
