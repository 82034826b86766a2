//! Export error types

use formkit_core::PortError;
use thiserror::Error;

/// Export error
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook could not be built
    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output was not valid UTF-8
    #[error("encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Unknown export format name
    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),

    /// Storage or mail transport failed
    #[error("port error: {0}")]
    Port(#[from] PortError),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
