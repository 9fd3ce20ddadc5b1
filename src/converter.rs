//! Workbook to schema pipeline: one table per non-empty worksheet.

use crate::database::identifier::sanitize;
use crate::database::Column;
use crate::database::Table;
use crate::error::ExcelSchemaError;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::sheet::Sheet;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;

/// Accepted upload suffixes, matched case-sensitively.
pub const EXCEL_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("File must be an Excel file (.xlsx or .xls)")]
    InvalidFileExtensionError,

    #[error("Uploaded file is empty")]
    EmptyUploadError,

    #[error("No valid data found in Excel file")]
    NoTablesError,
}

/// Every generated table plus their statements joined by a blank line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversionResult {
    pub tables: Vec<Table>,
    pub sql: String,
}

pub fn has_excel_extension(file_name: &str) -> bool {
    EXCEL_EXTENSIONS.iter().any(|extension| file_name.ends_with(extension))
}

/// Decodes the workbook and builds a table for each worksheet that has at
/// least one data row below its header.
pub fn convert_workbook(file_name: &str, bytes: Vec<u8>) -> Result<ConversionResult, ExcelSchemaError> {
    if !has_excel_extension(file_name) {
        Err(ConvertError::InvalidFileExtensionError)?
    }
    if bytes.is_empty() {
        Err(ConvertError::EmptyUploadError)?
    }

    let size = bytes.len();
    let mut spreadsheet = open_spreadsheet(file_name, bytes)?;
    let sheets = spreadsheet.read_sheets()?;
    info!(file = spreadsheet.name(), size, sheets = sheets.len(), "decoded workbook");

    let mut tables = Vec::new();
    for sheet in &sheets {
        if sheet.data_row_count() == 0 {
            debug!(sheet = %sheet.name, "skipping sheet without data rows");
            continue;
        }
        let table = convert_sheet(sheet)?;
        debug!(sheet = %sheet.name, table = %table.name, columns = table.columns.len(), "generated table");
        tables.push(table);
    }
    if tables.is_empty() {
        Err(ConvertError::NoTablesError)?
    }

    let sql = tables
        .iter()
        .map(Table::create_statement)
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(ConversionResult { tables, sql })
}

fn convert_sheet(sheet: &Sheet) -> Result<Table, ExcelSchemaError> {
    let headers = sheet.headers()?;
    let mut columns = Vec::with_capacity(headers.len());
    for (header, cells) in headers.iter().zip(sheet.columns()) {
        let values = cells
            .into_iter()
            .map(|cell| cell.map(|cell| cell.to_value()).transpose().map(Option::flatten))
            .collect::<Result<Vec<Option<CellValue>>, ExcelSchemaError>>()?;
        columns.push(Column::infer(sanitize(header), &values));
    }
    Ok(Table::new(sanitize(&sheet.name), columns))
}
