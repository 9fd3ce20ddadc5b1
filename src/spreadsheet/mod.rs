//! In-memory decoding of `.xlsx` and `.xls` workbooks into sheets of cells.

pub(crate) mod cell;
mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xls;
pub(crate) mod xlsx;

use crate::error::ExcelSchemaError;
use crate::helpers::cfb::Cfb;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use thiserror::Error;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("File '{0}' not found in workbook")]
    FileError(String),

    #[error("Workbook '{0}' is password protected")]
    PasswordProtectedError(String),

    #[error("Workbook '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("File '{0}' is not an Excel workbook")]
    UnknownFormatError(String),

    #[error("Invalid cell value '{1}' at {0}")]
    CellValueError(String, String),

    #[error("Cell reference '{0}' is outside the worksheet grid")]
    CellReferenceError(String),
}

/// A decoded workbook.
pub(crate) trait Spreadsheet {
    /// Name of the uploaded file, for messages.
    fn name(&self) -> &str;

    /// Reads every worksheet in workbook order.
    fn read_sheets(&mut self) -> Result<Vec<Sheet>, ExcelSchemaError>;
}

/// Picks a decoder from the leading bytes of the file.
pub(crate) fn open_spreadsheet(name: &str, bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, ExcelSchemaError> {
    if bytes.starts_with(ZIP_SIGNATURE) {
        Ok(Box::new(XlsxSpreadsheet::open(name, bytes)?))
    } else if Cfb::is_compound_file(&bytes) {
        let cfb = Cfb::new(bytes)?;
        if cfb.exists("EncryptedPackage") {
            Err(SpreadsheetError::PasswordProtectedError(name.to_owned()))?
        }
        Ok(Box::new(XlsSpreadsheet::open(name, &cfb)?))
    } else {
        Err(SpreadsheetError::UnknownFormatError(name.to_owned()))?
    }
}
