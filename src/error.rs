//! Error types for the sheetstream pipeline

use thiserror::Error;

/// Result type alias for sheetstream operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for the load-and-export pipeline
#[derive(Error, Debug)]
pub enum ExportError {
    /// IO error wrapper (input file unreadable, output file not creatable)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The gzip stream of the input file is malformed
    #[error("failed to decompress '{path}': {detail}")]
    Decompression { path: String, detail: String },

    /// Decompressed content is not a valid JSON array of records
    #[error("failed to parse records: {0}")]
    Parse(#[from] serde_json::Error),

    /// Sheet count out of the supported range
    #[error("N_SHEETS must be between 1 and 9")]
    Config { value: i64 },

    /// Error occurred while writing the workbook
    #[error("failed to write workbook: {0}")]
    Write(String),

    /// Error occurred while writing a row
    #[error("failed to write row {row} to sheet '{sheet}': {detail}")]
    WriteRow {
        row: u32,
        sheet: String,
        detail: String,
    },
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Write(err.to_string())
    }
}
