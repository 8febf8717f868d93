//! Error types for spreadsheet loading, chart building and deck export.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a spreadsheet into charts and slides.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the XLSX workbook structure.
    #[error("XLSX parsing error: {0}")]
    XlsxParseError(String),

    /// Failed to parse the legacy XLS workbook structure.
    #[error("XLS parsing error: {0}")]
    XlsParseError(String),

    /// The selected sheet has no header row.
    #[error("Sheet '{0}' is empty")]
    EmptySheet(String),

    /// No sheet with the requested name exists in the workbook.
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    /// A chart refers to a column the table does not have.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// A chart request is not valid for the table.
    #[error("Invalid chart: {0}")]
    InvalidChart(String),

    /// Drawing or encoding a chart image failed.
    #[error("Chart rendering error: {0}")]
    RenderError(String),

    /// Assembling or writing the presentation failed.
    #[error("Export error: {0}")]
    ExportError(String),

    /// ZIP archive error (for XLSX/PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for XLSX/PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// OLE/CFB container error (for XLS).
    #[error("OLE/CFB error: {0}")]
    CfbError(String),
}
