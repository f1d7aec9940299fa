//! Output filename resolution for the prediction report and model artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

const PRED_SUFFIX: &str = ".pred.odf";

/// Derive the default report name from a feature file: the file name with
/// its last extension replaced by `.pred.odf`.
///
/// `data/all_aml_train.gct` becomes `all_aml_train.pred.odf`.
#[must_use]
pub fn prediction_filename(feature: &Path) -> String {
    let stem = feature
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{PRED_SUFFIX}")
}

/// Resolved report file name, always without a directory part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName(String);

impl OutputName {
    /// Use `explicit` when given, otherwise derive the name from `feature`.
    /// Everything up to the last `/` is stripped in both cases.
    #[must_use]
    pub fn resolve(explicit: Option<&str>, feature: &Path) -> Self {
        let name = match explicit {
            Some(name) => name.to_string(),
            None => prediction_filename(feature),
        };
        let bare = match name.rfind('/') {
            Some(pos) => &name[pos + 1..],
            None => name.as_str(),
        };
        Self(bare.to_string())
    }

    /// The report file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.0
    }

    /// Base name for model artifacts: the report name with `.pred.odf` removed.
    #[must_use]
    pub fn model_basename(&self) -> String {
        self.0.replace(PRED_SUFFIX, "")
    }

    /// `<base>_json_model.txt` inside `dir`.
    #[must_use]
    pub fn json_model_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_json_model.txt", self.model_basename()))
    }

    /// `<base>_model.tl` inside `dir`.
    #[must_use]
    pub fn checkpoint_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_model.tl", self.model_basename()))
    }

    /// The report path inside `dir`.
    #[must_use]
    pub fn report_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.0)
    }
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
