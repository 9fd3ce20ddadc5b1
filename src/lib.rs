//! # Excel Schema
//!
//! Infers SQL `CREATE TABLE` statements from the sheets of an Excel workbook.
//!
//! Each worksheet with at least one data row becomes a table: the sheet name
//! and header labels are sanitized into identifiers, every column's values are
//! classified into a SQL type, and the statements are rendered in sheet order.
//!
//! Workbooks are decoded in memory by a native reader for both formats:
//!
//! - `.xlsx`: Office Open XML (ZIP archive of XML parts)
//! - `.xls`: BIFF8 records inside an OLE compound file
//!
//! The crate ships an HTTP API (`serve`) and an offline converter (`convert`).

pub mod cli;
pub mod converter;
pub mod database;
mod error;
mod helpers;
pub mod logging;
pub mod server;
mod spreadsheet;

pub use converter::convert_workbook;
pub use converter::ConversionResult;
pub use converter::ConvertError;
pub use error::ExcelSchemaError;
pub use spreadsheet::cell::CellValue;
