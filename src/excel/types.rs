use serde::{Deserialize, Serialize};

/// Why the reference scanner touched (or could not touch) a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefNote {
    /// A single-cell reference pointed at a cell that did not exist
    MissingCell,
    /// Interior or edge cell of a same-column range
    RangeFill,
    /// Corner of a multi-column (or oversized) range
    RangeCorner,
    /// The reference named a sheet the workbook does not have
    SheetNotFound,
}

/// One entry of the reference scanner's creation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRef {
    pub sheet: String,
    pub cell: String,
    pub note: RefNote,
}

/// Current state of a cell, as reported in recalculation diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugCell {
    pub cell: String,
    pub exists: bool,
    pub value: Option<String>,
    /// Data type tag as stored in the file ("n", "s", "b", "e", "str", ...)
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub formula: Option<String>,
}

/// A workbook-level defined name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedNameEntry {
    pub name: String,
    pub address: String,
}

/// Excel-specific errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcelError {
    pub message: String,
    pub error_type: ExcelErrorType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcelErrorType {
    FileNotFound,
    InvalidFormat,
    ReadError,
    WriteError,
    ChecksumMismatch,
}

impl std::fmt::Display for ExcelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExcelError {}

impl ExcelError {
    pub fn new(message: impl Into<String>, error_type: ExcelErrorType) -> Self {
        ExcelError {
            message: message.into(),
            error_type,
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        ExcelError::new(format!("File not found: {}", path), ExcelErrorType::FileNotFound)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::InvalidFormat)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::ReadError)
    }

    pub fn write_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::WriteError)
    }
}
