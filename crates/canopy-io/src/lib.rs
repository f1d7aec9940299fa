//! GCT/CLS input, output naming and ODF prediction reports for canopy.

mod cls;
mod domain;
mod error;
mod format;
mod gct;
mod naming;
mod odf;
mod report;

pub use cls::{read_targets, TargetTable};
pub use domain::SampleName;
pub use error::IoError;
pub use format::{validate_file, FileFormat, Role};
pub use gct::{read_features, FeatureTable, GctReader};
pub use naming::{prediction_filename, OutputName};
pub use odf::{render_odf, OdfWriter};
pub use report::{OdfHeader, PredictionRecord, PredictionReport, CONFIDENCE_PLACEHOLDER};
