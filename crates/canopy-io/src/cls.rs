//! CLS class-label reader and the class-name table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::format::{FileFormat, Role};
use crate::IoError;

/// Class labels for one sample set, plus the declared class names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    class_names: Vec<String>,
    labels: Vec<usize>,
}

impl TargetTable {
    /// Build a table from already resolved codes.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownClassCode`] if a label has no class name.
    pub fn new(class_names: Vec<String>, labels: Vec<usize>) -> Result<Self, IoError> {
        if let Some(&code) = labels.iter().find(|&&c| c >= class_names.len()) {
            return Err(IoError::UnknownClassCode {
                code,
                n_classes: class_names.len(),
            });
        }
        Ok(Self {
            class_names,
            labels,
        })
    }

    /// Class names in declaration order; position is the class code.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// One class code per sample.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Resolve a class code to its name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownClassCode`] if `code` is out of range.
    pub fn class_name(&self, code: usize) -> Result<&str, IoError> {
        resolve_class_name(&self.class_names, code)
    }
}

pub(crate) fn resolve_class_name(class_names: &[String], code: usize) -> Result<&str, IoError> {
    class_names
        .get(code)
        .map(String::as_str)
        .ok_or(IoError::UnknownClassCode {
            code,
            n_classes: class_names.len(),
        })
}

/// Read a CLS file into a [`TargetTable`].
///
/// Line 1 holds `N K 1`, line 2 `# name_0 .. name_{K-1}`, line 3 the `N`
/// labels. Labels are integer codes below `K` or class names, which map to
/// their position on line 2.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::WrongFormat`] | `format` is not CLS |
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::MalformedHeader`] | Line 1 or 2 missing or unparseable |
/// | [`IoError::DimensionMismatch`] | Label or class count differs from line 1 |
/// | [`IoError::UnknownClassLabel`] | Label is neither a valid code nor a class name |
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_targets(path: &Path, format: FileFormat) -> Result<TargetTable, IoError> {
    if format != FileFormat::Cls {
        return Err(IoError::WrongFormat {
            path: path.to_path_buf(),
            format,
            role: Role::Target,
        });
    }

    let content = fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let malformed = |line_number: usize, line: &str| IoError::MalformedHeader {
        path: path.to_path_buf(),
        line_number,
        line: line.to_string(),
    };

    let dims_line = lines.next().ok_or_else(|| malformed(1, ""))?;
    let dims: Vec<usize> = dims_line
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| malformed(1, dims_line))?;
    let (n_samples, n_classes) = match dims.as_slice() {
        [n, k, ..] => (*n, *k),
        _ => return Err(malformed(1, dims_line)),
    };

    let names_line = lines.next().ok_or_else(|| malformed(2, ""))?;
    let Some(names) = names_line.trim_start().strip_prefix('#') else {
        return Err(malformed(2, names_line));
    };
    let class_names: Vec<String> = names.split_whitespace().map(str::to_string).collect();
    if class_names.len() != n_classes {
        return Err(IoError::DimensionMismatch {
            path: path.to_path_buf(),
            what: "classes",
            declared: n_classes,
            found: class_names.len(),
        });
    }

    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(n_classes);
    for (code, name) in class_names.iter().enumerate() {
        by_name.entry(name.as_str()).or_insert(code);
    }

    let raw_labels: Vec<&str> = lines.flat_map(str::split_whitespace).collect();
    if raw_labels.len() != n_samples {
        return Err(IoError::DimensionMismatch {
            path: path.to_path_buf(),
            what: "labels",
            declared: n_samples,
            found: raw_labels.len(),
        });
    }

    let labels = raw_labels
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            raw.parse::<usize>()
                .ok()
                .filter(|&code| code < n_classes)
                .or_else(|| by_name.get(raw).copied())
                .ok_or_else(|| IoError::UnknownClassLabel {
                    path: path.to_path_buf(),
                    label: (*raw).to_string(),
                    position,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(?class_names, "class names declared");
    info!(n_samples, n_classes, "target table loaded");

    Ok(TargetTable {
        class_names,
        labels,
    })
}
