//! Result types returned by the conversion server and by a finished cycle.

use serde::{Deserialize, Serialize};

/// One converted file, exactly as the server reports it.
///
/// The controller treats every field as opaque: deserialisation checks that
/// each exists, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub filename: String,
    /// Source code page the server detected or applied, e.g. `cp037`.
    pub used_encoding: String,
    pub dest_encoding: String,
    /// Characters with no mapping that were replaced with U+FFFD.
    pub replacement_count: u64,
    /// Link to a ZIP with the converted text and a JSON report.
    pub zip_download: String,
}

/// One element of the server's response array.
///
/// The server answers a rejected file (wrong extension, content that does
/// not look like EBCDIC) with `{"filename", "error"}` in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Converted(ConversionResult),
    Rejected { filename: String, error: String },
}

impl FileOutcome {
    pub fn filename(&self) -> &str {
        match self {
            FileOutcome::Converted(r) => &r.filename,
            FileOutcome::Rejected { filename, .. } => filename,
        }
    }

    pub fn as_converted(&self) -> Option<&ConversionResult> {
        match self {
            FileOutcome::Converted(r) => Some(r),
            FileOutcome::Rejected { .. } => None,
        }
    }
}

/// Parse a response body into outcomes, preserving order.
pub fn parse_outcomes(body: &str) -> Result<Vec<FileOutcome>, serde_json::Error> {
    serde_json::from_str(body)
}

/// Everything a successful cycle produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutput {
    /// Per-file outcomes in response order.
    pub outcomes: Vec<FileOutcome>,
    pub stats: UploadStats,
}

impl UploadOutput {
    pub fn converted(&self) -> impl Iterator<Item = &ConversionResult> {
        self.outcomes.iter().filter_map(FileOutcome::as_converted)
    }
}

/// Summary counters for one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadStats {
    pub files_sent: usize,
    pub bytes_sent: u64,
    pub converted: usize,
    pub rejected: usize,
    pub total_replacements: u64,
    /// Wall-clock time from request start to rendered results.
    pub total_duration_ms: u64,
}

impl UploadStats {
    pub(crate) fn tally(outcomes: &[FileOutcome]) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Converted(r) => {
                    stats.converted += 1;
                    stats.total_replacements += r.replacement_count;
                }
                FileOutcome::Rejected { .. } => stats.rejected += 1,
            }
        }
        stats
    }
}
