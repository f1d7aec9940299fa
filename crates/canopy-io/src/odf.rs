//! ODF writer for prediction reports.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::naming::OutputName;
use crate::report::PredictionReport;
use crate::IoError;

const ODF_VERSION_LINE: &str = "ODF 1.0";

/// Writes [`PredictionReport`]s as ODF files into one directory.
///
/// An existing file with the same name is overwritten.
pub struct OdfWriter {
    output_dir: PathBuf,
}

impl OdfWriter {
    /// Create a writer targeting `output_dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write `report` to `{output_dir}/{name}` and return the path.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::RenderRecord`] if a row cannot be rendered, or
    /// [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(name = %name))]
    pub fn write(&self, name: &OutputName, report: &PredictionReport) -> Result<PathBuf, IoError> {
        let path = name.report_path(&self.output_dir);
        let bytes = render_odf(report)?;
        fs::write(&path, bytes).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(
            path = %path.display(),
            rows = report.records().len(),
            "prediction report written"
        );
        Ok(path)
    }
}

/// Render a report in ODF text form: version line, `HeaderLines`, the
/// header entries, then one tab-separated line per record.
///
/// # Errors
///
/// Returns [`IoError::RenderRecord`] if a row cannot be rendered.
pub fn render_odf(report: &PredictionReport) -> Result<Vec<u8>, IoError> {
    let header = report.header();
    let mut text = format!("{ODF_VERSION_LINE}\nHeaderLines={}\n", header.header_lines());
    for (key, value) in header.entries() {
        // Column descriptors use ':' as separator, everything else '='.
        let sep = if key.starts_with("COLUMN_") { ':' } else { '=' };
        text.push_str(&format!("{key}{sep}{value}\n"));
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(text.into_bytes());
    for record in report.records() {
        wtr.serialize(record).map_err(|e| IoError::RenderRecord {
            index: record.index,
            source: e,
        })?;
    }
    wtr.into_inner().map_err(|e| IoError::RenderRecord {
        index: report.records().len(),
        source: e.into_error().into(),
    })
}
