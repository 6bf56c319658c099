//! Spreadsheet codec errors.

use thiserror::Error;

/// Errors raised while reading or writing a workbook.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The buffer is not a readable `.xlsx` workbook.
    #[error("cannot read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    /// The workbook could not be produced.
    #[error("cannot write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// The workbook has no sheet or no rows.
    #[error("workbook is empty")]
    Empty,

    /// A required column or preamble cell is missing.
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    /// The warehouse preamble row is missing or malformed.
    #[error("first row must carry the warehouse id")]
    MissingWarehouse,

    /// A cell could not be interpreted.
    #[error("row {row}, column '{column}': {reason}")]
    BadCell {
        /// 1-based row number as shown in spreadsheet software.
        row: usize,
        column: &'static str,
        reason: String,
    },
}

/// Result type for spreadsheet operations.
pub type Result<T> = std::result::Result<T, SheetError>;
