//! GCT expression-matrix reader with full input validation.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::SampleName;
use crate::format::{FileFormat, Role};
use crate::IoError;

/// Parsed expression matrix: rows are features (genes), columns are samples.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    source: PathBuf,
    feature_names: Vec<String>,
    descriptions: Vec<String>,
    sample_names: Vec<SampleName>,
    /// `values[feature_index][sample_index]`.
    values: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Return the file this table was read from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Return the feature names in row order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature descriptions in row order (empty when absent).
    #[must_use]
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// Return the sample names in column order.
    #[must_use]
    pub fn sample_names(&self) -> &[SampleName] {
        &self.sample_names
    }

    /// Return the feature-major matrix.
    #[must_use]
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Return the number of features (rows).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of samples (columns).
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.sample_names.len()
    }

    /// Transpose into `rows[sample_index][feature_index]`, the layout the
    /// classifier trains on.
    #[must_use]
    pub fn sample_rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_samples())
            .map(|s| self.values.iter().map(|row| row[s]).collect())
            .collect()
    }

    /// Reorder rows to follow `training`'s feature order.
    ///
    /// A table already in the same order is returned unchanged. Otherwise
    /// rows are matched by feature name (first occurrence wins) and extra
    /// rows are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingFeature`] when a training feature is absent.
    #[instrument(skip_all, fields(path = %self.source.display()))]
    pub fn align_to(self, training: &FeatureTable) -> Result<Self, IoError> {
        if self.feature_names == training.feature_names {
            return Ok(self);
        }

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.n_features());
        for (row, name) in self.feature_names.iter().enumerate() {
            index.entry(name.as_str()).or_insert(row);
        }

        let mut order = Vec::with_capacity(training.n_features());
        for name in &training.feature_names {
            let row = index
                .get(name.as_str())
                .copied()
                .ok_or_else(|| IoError::MissingFeature {
                    path: self.source.clone(),
                    feature: name.clone(),
                })?;
            order.push(row);
        }

        debug!(
            n_features = self.n_features(),
            n_kept = order.len(),
            "test features aligned to training order"
        );

        Ok(Self {
            feature_names: order.iter().map(|&r| self.feature_names[r].clone()).collect(),
            descriptions: order.iter().map(|&r| self.descriptions[r].clone()).collect(),
            values: order.iter().map(|&r| self.values[r].clone()).collect(),
            sample_names: self.sample_names,
            source: self.source,
        })
    }
}

/// Read a feature file, aligning it to `companion` (the training table)
/// when one is given.
///
/// # Errors
///
/// [`IoError::WrongFormat`] when `format` is not GCT, any [`GctReader::read`]
/// error, or [`IoError::MissingFeature`] from alignment.
pub fn read_features(
    path: &Path,
    format: FileFormat,
    companion: Option<&FeatureTable>,
) -> Result<FeatureTable, IoError> {
    if format != FileFormat::Gct {
        return Err(IoError::WrongFormat {
            path: path.to_path_buf(),
            format,
            role: Role::Feature,
        });
    }
    let table = GctReader::new(path).read()?;
    match companion {
        Some(training) => table.align_to(training),
        None => Ok(table),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GctVersion {
    V1_2,
    V1_3,
}

/// Reads a GCT 1.2 or 1.3 file.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::UnsupportedGctVersion`] | First line is not `#1.2` / `#1.3` |
/// | [`IoError::MalformedHeader`] | Dimension line or column header unparseable |
/// | [`IoError::CsvParse`] | Malformed tab-separated record |
/// | [`IoError::EmptyDataset`] | Zero samples or zero feature rows |
/// | [`IoError::DimensionMismatch`] | Declared row/sample counts differ from content |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::DuplicateSampleName`] | Same sample name labels two columns |
pub struct GctReader {
    path: PathBuf,
}

impl GctReader {
    /// Create a new reader for the given GCT file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the GCT file, returning a [`FeatureTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureTable, IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);

        let version_line = self.header_line(&mut reader, 1)?;
        let version = match version_line.trim() {
            "#1.2" => GctVersion::V1_2,
            "#1.3" => GctVersion::V1_3,
            _ => {
                return Err(IoError::UnsupportedGctVersion {
                    path: self.path.clone(),
                    found: version_line.clone(),
                });
            }
        };

        let dims_line = self.header_line(&mut reader, 2)?;
        let malformed_dims = || IoError::MalformedHeader {
            path: self.path.clone(),
            line_number: 2,
            line: dims_line.clone(),
        };
        let dims: Vec<usize> = dims_line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| malformed_dims())?;
        // Columns before the first sample: the name plus row metadata.
        let (n_rows, n_cols, leading, n_col_meta) = match (version, dims.as_slice()) {
            (GctVersion::V1_2, [rows, cols]) => (*rows, *cols, 2, 0),
            (GctVersion::V1_3, [rows, cols, row_meta, col_meta]) => {
                (*rows, *cols, 1 + row_meta, *col_meta)
            }
            _ => return Err(malformed_dims()),
        };
        debug!(?version, n_rows, n_cols, leading, n_col_meta, "read GCT preamble");

        if n_cols == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
                what: "samples",
            });
        }

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        let mut records = rdr.records();

        let header = match records.next() {
            Some(result) => result.map_err(|e| self.csv_error(e))?,
            None => {
                return Err(IoError::MalformedHeader {
                    path: self.path.clone(),
                    line_number: 3,
                    line: String::new(),
                });
            }
        };
        let header_fields = significant_fields(&header);
        if header_fields.len() < leading {
            return Err(IoError::MalformedHeader {
                path: self.path.clone(),
                line_number: 3,
                line: header_fields.join("\t"),
            });
        }
        let found_cols = header_fields.len() - leading;
        if found_cols != n_cols {
            return Err(IoError::DimensionMismatch {
                path: self.path.clone(),
                what: "samples",
                declared: n_cols,
                found: found_cols,
            });
        }

        let mut sample_names = Vec::with_capacity(n_cols);
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(n_cols);
        for (col, name) in header_fields[leading..].iter().enumerate() {
            if let Some(&first_col) = seen.get(name) {
                return Err(IoError::DuplicateSampleName {
                    path: self.path.clone(),
                    name: (*name).to_string(),
                    first_col,
                    second_col: col,
                });
            }
            seen.insert(*name, col);
            sample_names.push(SampleName::new((*name).to_string()));
        }

        for _ in 0..n_col_meta {
            if let Some(result) = records.next() {
                result.map_err(|e| self.csv_error(e))?;
            }
        }

        let expected = leading + n_cols;
        let mut feature_names = Vec::with_capacity(n_rows);
        let mut descriptions = Vec::with_capacity(n_rows);
        let mut values = Vec::with_capacity(n_rows);

        for (row_index, result) in records.enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let fields = significant_fields(&record);
            if fields.is_empty() {
                continue;
            }
            if fields.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    feature: fields[0].to_string(),
                    expected,
                    got: fields.len(),
                });
            }

            let mut row = Vec::with_capacity(n_cols);
            for (col_index, raw) in fields[leading..].iter().enumerate() {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: (*raw).to_string(),
                    })?;
                row.push(value);
            }

            feature_names.push(fields[0].to_string());
            descriptions.push(if leading > 1 { fields[1].to_string() } else { String::new() });
            values.push(row);
        }

        if values.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
                what: "feature rows",
            });
        }
        if values.len() != n_rows {
            return Err(IoError::DimensionMismatch {
                path: self.path.clone(),
                what: "rows",
                declared: n_rows,
                found: values.len(),
            });
        }

        info!(
            n_features = feature_names.len(),
            n_samples = sample_names.len(),
            "feature table loaded"
        );

        Ok(FeatureTable {
            source: self.path.clone(),
            feature_names,
            descriptions,
            sample_names,
            values,
        })
    }

    fn header_line(&self, reader: &mut impl BufRead, line_number: usize) -> Result<String, IoError> {
        let mut line = String::new();
        let n = reader.read_line(&mut line).map_err(|e| IoError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        if n == 0 {
            return Err(IoError::MalformedHeader {
                path: self.path.clone(),
                line_number,
                line,
            });
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

/// Record fields with trailing empty cells (stray tabs) removed.
fn significant_fields(record: &csv::StringRecord) -> Vec<&str> {
    let mut fields: Vec<&str> = record.iter().collect();
    while fields.last().is_some_and(|f| f.trim().is_empty()) {
        fields.pop();
    }
    fields
}
