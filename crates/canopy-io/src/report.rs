//! Prediction report: one record per sample plus the ODF metadata header.

use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

use crate::cls::resolve_class_name;
use crate::domain::SampleName;
use crate::IoError;

/// Confidence is not estimated; every row reports this constant.
pub const CONFIDENCE_PLACEHOLDER: u8 = 1;

/// One output row.
///
/// Field order is the column order of the written table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    /// One-based position in input sample order.
    pub index: usize,
    pub sample_name: SampleName,
    pub true_class: String,
    pub predicted_class: String,
    pub confidence: u8,
    #[serde(serialize_with = "serialize_flag")]
    pub correct: bool,
}

fn serialize_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "TRUE" } else { "FALSE" })
}

/// Ordered `key -> value` metadata written above the table.
///
/// `HeaderLines` is derived from the number of entries that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdfHeader {
    entries: Vec<(&'static str, String)>,
}

impl OdfHeader {
    fn for_counts(n_correct: usize, n_errors: usize) -> Self {
        let entries = vec![
            (
                "COLUMN_NAMES",
                ["Samples", "True Class", "Predicted Class", "Confidence", "Correct?"].join("\t"),
            ),
            (
                "COLUMN_TYPES",
                ["String ", "String", "String", "float", "boolean"].join("\t"),
            ),
            ("Model", "Prediction Results".to_string()),
            ("PredictorModel", "Random Forest Classifier".to_string()),
            ("NumFeatures", "0".to_string()),
            ("NumCorrect", n_correct.to_string()),
            ("NumErrors", n_errors.to_string()),
            ("DataLines", (n_correct + n_errors).to_string()),
        ];
        Self { entries }
    }

    /// Number of header lines after the `HeaderLines` line itself.
    #[must_use]
    pub fn header_lines(&self) -> usize {
        self.entries.len()
    }

    /// Entries in output order, excluding `HeaderLines`.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Records and header ready for the ODF writer.
#[derive(Debug, Clone)]
pub struct PredictionReport {
    records: Vec<PredictionRecord>,
    header: OdfHeader,
    n_errors: usize,
}

impl PredictionReport {
    /// Pair true and predicted codes with sample names and class names.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | The three sequences differ in length |
    /// | [`IoError::UnknownClassCode`] | A code has no entry in `class_names` |
    #[instrument(skip_all, fields(n_samples = sample_names.len()))]
    pub fn assemble(
        true_labels: &[usize],
        predicted: &[usize],
        sample_names: &[SampleName],
        class_names: &[String],
    ) -> Result<Self, IoError> {
        if true_labels.len() != predicted.len() || true_labels.len() != sample_names.len() {
            return Err(IoError::LengthMismatch {
                n_true: true_labels.len(),
                n_predicted: predicted.len(),
                n_samples: sample_names.len(),
            });
        }

        let mut n_errors = 0;
        let mut records = Vec::with_capacity(true_labels.len());
        for (i, ((&t, &p), name)) in true_labels.iter().zip(predicted).zip(sample_names).enumerate() {
            let correct = t == p;
            if !correct {
                n_errors += 1;
            }
            records.push(PredictionRecord {
                index: i + 1,
                sample_name: name.clone(),
                true_class: resolve_class_name(class_names, t)?.to_string(),
                predicted_class: resolve_class_name(class_names, p)?.to_string(),
                confidence: CONFIDENCE_PLACEHOLDER,
                correct,
            });
        }

        let header = OdfHeader::for_counts(records.len() - n_errors, n_errors);
        debug!(n_errors, "prediction report assembled");
        Ok(Self {
            records,
            header,
            n_errors,
        })
    }

    #[must_use]
    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    #[must_use]
    pub fn header(&self) -> &OdfHeader {
        &self.header
    }

    #[must_use]
    pub fn n_errors(&self) -> usize {
        self.n_errors
    }

    #[must_use]
    pub fn n_correct(&self) -> usize {
        self.records.len() - self.n_errors
    }
}
