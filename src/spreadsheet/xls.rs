use crate::error::ExcelSchemaError;
use crate::error::ResultMessage;
use crate::error::ResultOptionChain;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use either::Either;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const DATE1904: u16 = 34;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const XF: u16 = 224;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const ARRAY: u16 = 545;
const TABLE: u16 = 566;
const RK: u16 = 638;
const FORMAT: u16 = 1054;
const SHARED_FORMULA: u16 = 1212;
const BOF: u16 = 2057;

/// BoundSheet8 sheet type for ordinary worksheets.
const WORKSHEET: u8 = 0;
/// CodePage value meaning compressed strings are Latin-1.
const CODE_PAGE_UTF16: u16 = 1200;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid Code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid Formula value '{0:#018x}'")]
    FormulaValueError(u64),
}

/// A cell's type is either known from the record or looked up through its XF index.
type CellRecord = (Either<CellType, usize>, String);

/// A BIFF8 (Excel 97-2003) workbook held in memory.
pub(crate) struct XlsSpreadsheet {
    name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    number_formats: Vec<CellType>,
    /// (sheet name, BOF offset) in workbook order
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    /// Reads the workbook globals substream: encoding, date system, formats,
    /// shared strings and the worksheet directory.
    pub(crate) fn open(file_name: &str, cfb: &Cfb) -> Result<XlsSpreadsheet, ExcelSchemaError> {
        let mut reader = cfb
            .read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .map(Biff8Reader::new)
            .ok_or_else(|| SpreadsheetError::FileError("Workbook".to_owned()))?;
        let mut is_1904 = false;
        let mut shared_strings = Vec::new();
        let mut custom_formats: HashMap<String, CellType> = HashMap::new();
        let mut format_indexes: Vec<String> = Vec::new();
        let mut sheets: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::PasswordProtectedError(file_name.to_owned()))?,
            DATE1904 => is_1904 = reader.read_u16()? == 1,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                if code_page != CODE_PAGE_UTF16 {
                    reader.encoding = codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?;
                }
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_xl_unicode_string()?;
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
            XF => {
                reader.skip(2)?;
                format_indexes.push(reader.read_u16()?.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                let _visibility = reader.read_u8()?;
                let sheet_type = reader.read_u8()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                if sheet_type == WORKSHEET {
                    sheets.push((sheet_name, pointer));
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        debug!(
            file = file_name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            is_1904,
            "opened xls workbook"
        );

        // DATE1904 may follow FORMAT records, so custom formats are re-evaluated here.
        let custom_formats = if is_1904 { to_1904(custom_formats) } else { custom_formats };
        let number_formats = load_number_formats(format_indexes, custom_formats, is_1904);
        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            number_formats,
            sheets,
        })
    }

    fn read_sheet(&mut self, sheet_name: &str, pointer: usize) -> Result<Sheet, ExcelSchemaError> {
        let mut sheet = Sheet::new(sheet_name);
        self.reader.goto(pointer);
        self.reader.next()?; // BOF
        while let Some(tag) = self.reader.next()? {
            match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let col_lower_bound = self.reader.read_u16()? as usize;
                    // rgrkrec is 6 bytes per cell, then the 2-byte last column.
                    let count = self.reader.record_len().saturating_sub(6) / 6;
                    for col in col_lower_bound..col_lower_bound + count {
                        let index = self.reader.read_u16()? as usize;
                        let value = self.reader.read_rk_number()?;
                        let kind = self.number_format(index);
                        sheet.push(Cell { row, col, kind, value });
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    let (either, value) = match tag {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => read_number_cell(&mut self.reader)?,
                        RK => read_rk_cell(&mut self.reader)?,
                        LABEL_SST => {
                            self.reader.skip(2)?;
                            let index = self.reader.read_usize()?;
                            let value = self.shared_strings.get(index).cloned().ok_or_else(|| {
                                SpreadsheetError::CellValueError(index_to_reference(row, col), index.to_string())
                            })?;
                            (Either::Left(CellType::Text), value)
                        }
                        LABEL => read_label_cell(&mut self.reader)?,
                        _ => read_formula_cell(&mut self.reader)?,
                    };
                    let kind = match either {
                        Either::Left(kind) => kind,
                        Either::Right(index) => self.number_format(index),
                    };
                    if !value.is_empty() {
                        sheet.push(Cell { row, col, kind, value });
                    }
                }
                _ => (),
            }
        }
        Ok(sheet)
    }

    fn number_format(&self, index: usize) -> CellType {
        self.number_formats.get(index).copied().unwrap_or(CellType::Number)
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_sheets(&mut self) -> Result<Vec<Sheet>, ExcelSchemaError> {
        let mut sheets = Vec::with_capacity(self.sheets.len());
        for (sheet_name, pointer) in self.sheets.clone() {
            let sheet = self.read_sheet(&sheet_name, pointer).with_prefix(&sheet_name)?;
            debug!(sheet = %sheet_name, cells = sheet.cells.len(), "read worksheet");
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

fn to_1904(custom_formats: HashMap<String, CellType>) -> HashMap<String, CellType> {
    custom_formats
        .into_iter()
        .map(|(id, kind)| {
            let kind = match kind {
                CellType::NumberDateTime1900 => CellType::NumberDateTime1904,
                CellType::NumberDate1900 => CellType::NumberDate1904,
                CellType::NumberTime1900 => CellType::NumberTime1904,
                other => other,
            };
            (id, kind)
        })
        .collect()
}

/// SST: total reference count, unique count, then the strings.
fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, ExcelSchemaError> {
    reader.skip(4)?;
    let count = reader.read_usize()?;
    let mut shared_strings = Vec::with_capacity(count.min(65_536));
    for _ in 0..count {
        shared_strings.push(reader.read_xl_unicode_rich_extended_string()?);
    }
    Ok(shared_strings)
}

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<CellRecord, ExcelSchemaError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    if reader.read_u8()? == 0 {
        Ok((Either::Left(CellType::Boolean), value.to_string()))
    } else {
        Ok((Either::Left(CellType::Error), to_error_value(value).to_owned()))
    }
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<CellRecord, ExcelSchemaError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_f64()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<CellRecord, ExcelSchemaError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_rk_number()?;
    Ok((Either::Right(index), value))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<CellRecord, ExcelSchemaError> {
    reader.skip(2)?;
    let value = reader.read_xl_unicode_string()?;
    Ok((Either::Left(CellType::Text), value))
}

/// FormulaValue: a plain double unless the top two bytes are 0xFFFF, in
/// which case the low byte says string (in the next STRING record),
/// boolean, error or empty string.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<CellRecord, ExcelSchemaError> {
    let index = reader.read_u16()? as usize;
    let formula = reader.read_u64()?;
    if formula & 0xFFFF_0000_0000_0000 != 0xFFFF_0000_0000_0000 {
        return Ok((Either::Right(index), f64::from_bits(formula).to_string()));
    }
    match formula & 0xFF {
        0 => loop {
            // Shared and array formula definitions may sit between FORMULA and STRING.
            match reader.next()? {
                Some(STRING) => break Ok((Either::Left(CellType::Text), reader.read_xl_unicode_string()?)),
                Some(SHARED_FORMULA | ARRAY | TABLE) => continue,
                _ => Err(XlsError::FormulaValueError(formula))?,
            }
        },
        1 => {
            let value = if formula & 0xFF_0000 != 0 { "1" } else { "0" };
            Ok((Either::Left(CellType::Boolean), value.to_owned()))
        }
        2 => {
            let code = ((formula >> 16) & 0xFF) as u8;
            Ok((Either::Left(CellType::Error), to_error_value(code).to_owned()))
        }
        3 => Ok((Either::Left(CellType::Text), String::new())),
        _ => Err(XlsError::FormulaValueError(formula))?,
    }
}
