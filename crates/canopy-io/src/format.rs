//! Input roles and extension-based file validation.

use std::fmt;
use std::path::Path;

use tracing::debug;

/// What an input file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Expression matrix (`.gct`).
    Feature,
    /// Class labels (`.cls`).
    Target,
}

impl Role {
    /// The only format accepted for this role.
    #[must_use]
    pub fn expected_format(self) -> FileFormat {
        match self {
            Role::Feature => FileFormat::Gct,
            Role::Target => FileFormat::Cls,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Feature => f.write_str("feature"),
            Role::Target => f.write_str("target"),
        }
    }
}

/// Recognized input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// GenePattern GCT expression matrix.
    Gct,
    /// GenePattern CLS class labels.
    Cls,
}

impl FileFormat {
    /// Lower-case file extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Gct => "gct",
            FileFormat::Cls => "cls",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Check that `path` carries the extension its role requires.
///
/// Returns `None` when no path was given or the extension (compared case
/// insensitively) does not match the role. Existence is not checked here;
/// a missing file surfaces when it is read.
#[must_use]
pub fn validate_file(path: Option<&Path>, role: Role) -> Option<FileFormat> {
    let Some(path) = path else {
        debug!(%role, "no file given");
        return None;
    };
    let expected = role.expected_format();
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected.extension()));
    if matches {
        Some(expected)
    } else {
        debug!(path = %path.display(), %role, expected = %expected, "invalid file extension");
        None
    }
}
