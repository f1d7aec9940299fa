//! I/O error types for canopy-io.

use std::path::PathBuf;

use crate::format::{FileFormat, Role};

/// Errors from GCT/CLS parsing, report assembly and ODF output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when a required input path was never supplied.
    #[error("no {role} file was given")]
    MissingInput {
        /// Role of the missing file.
        role: Role,
    },

    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading an already opened file fails.
    #[error("cannot read {path}")]
    ReadFile {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a reader is handed a format it does not parse.
    #[error("{path} is a {format} file, which cannot be read as {role} data")]
    WrongFormat {
        /// Path being read.
        path: PathBuf,
        /// Format that was passed in.
        format: FileFormat,
        /// Role the caller asked for.
        role: Role,
    },

    /// Returned when the tab-separated parser encounters a malformed record.
    #[error("parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying csv error.
        source: csv::Error,
    },

    /// Returned when the first line of a GCT file is not a known version tag.
    #[error("unsupported GCT version line \"{found}\" in {path} (expected #1.2 or #1.3)")]
    UnsupportedGctVersion {
        /// Path to the GCT file.
        path: PathBuf,
        /// The first line as read.
        found: String,
    },

    /// Returned when a header line cannot be parsed.
    #[error("malformed header line {line_number} in {path}: \"{line}\"")]
    MalformedHeader {
        /// Path to the file.
        path: PathBuf,
        /// One-based line number.
        line_number: usize,
        /// The offending line.
        line: String,
    },

    /// Returned when declared dimensions disagree with the file content.
    #[error("{path} declares {declared} {what}, found {found}")]
    DimensionMismatch {
        /// Path to the file.
        path: PathBuf,
        /// What was counted (rows, samples, classes, labels).
        what: &'static str,
        /// Count declared in the header.
        declared: usize,
        /// Count actually present.
        found: usize,
    },

    /// Returned when a file holds no samples or no features.
    #[error("empty dataset (no {what}) in {path}")]
    EmptyDataset {
        /// Path to the file.
        path: PathBuf,
        /// What is missing.
        what: &'static str,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} ({feature}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Feature name of the offending row.
        feature: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, sample column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Zero-based sample column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the same sample name labels two columns.
    #[error("duplicate sample name \"{name}\" in {path}: columns {first_col} and {second_col}")]
    DuplicateSampleName {
        /// Path to the file.
        path: PathBuf,
        /// The duplicated name.
        name: String,
        /// Zero-based sample column of the first occurrence.
        first_col: usize,
        /// Zero-based sample column of the second occurrence.
        second_col: usize,
    },

    /// Returned when a test feature table lacks a feature the model was trained on.
    #[error("feature \"{feature}\" from the training data is missing in {path}")]
    MissingFeature {
        /// Path to the test feature file.
        path: PathBuf,
        /// The training feature that was not found.
        feature: String,
    },

    /// Returned when a CLS label is neither a valid class code nor a declared class name.
    #[error("unknown class label \"{label}\" at position {position} in {path}")]
    UnknownClassLabel {
        /// Path to the CLS file.
        path: PathBuf,
        /// The raw label.
        label: String,
        /// Zero-based label position.
        position: usize,
    },

    /// Returned when a class code has no entry in the class-name table.
    #[error("class code {code} has no name ({n_classes} classes declared)")]
    UnknownClassCode {
        /// The unresolvable code.
        code: usize,
        /// Number of declared class names.
        n_classes: usize,
    },

    /// Returned when report inputs are not index-aligned.
    #[error("report inputs differ in length: {n_true} true labels, {n_predicted} predictions, {n_samples} sample names")]
    LengthMismatch {
        /// Number of true class codes.
        n_true: usize,
        /// Number of predicted class codes.
        n_predicted: usize,
        /// Number of sample names.
        n_samples: usize,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report row cannot be rendered as tab-separated text.
    #[error("cannot render report row {index}")]
    RenderRecord {
        /// One-based row index.
        index: usize,
        /// Underlying csv error.
        source: csv::Error,
    },

    /// Returned when an output file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
