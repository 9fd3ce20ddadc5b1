use crate::error::ExcelSchemaError;
use crate::error::ResultMessage;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::MAX_COLUMNS;
use crate::spreadsheet::reference::MAX_ROWS;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use tracing::debug;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts";
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";
const TAG_FORMAT_INDEX: &[u8] = b"xf";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";
const TAG_TEXT: &[u8] = b"t";
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const TAG_SHEET: &[u8] = b"sheet";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// An Office Open XML workbook held in memory.
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: Archive,
    number_formats: Vec<CellType>,
    shared_strings: Vec<String>,
    /// (sheet name, archive path) in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str, bytes: Vec<u8>) -> Result<XlsxSpreadsheet, ExcelSchemaError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(
            file = file_name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            is_1904,
            "opened xlsx workbook"
        );

        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            shared_strings,
            sheets,
        })
    }

    fn read_sheet(&mut self, sheet_name: &str, zip_path: &str) -> Result<Sheet, ExcelSchemaError> {
        let mut sheet = Sheet::new(sheet_name);
        let mut reader = self
            .zip
            .xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut is_shared = false;
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                if let Some(index) = event.attribute("r")?.and_then(|r| r.parse::<usize>().ok()) {
                    if index > MAX_ROWS {
                        Err(SpreadsheetError::CellReferenceError(format!("row {index}")))?;
                    }
                    row_count = index.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                (row, col) = match event.attribute("r")? {
                    Some(reference) => reference_to_index(&reference)
                        .ok_or_else(|| SpreadsheetError::CellReferenceError(reference.to_string()))?,
                    None if row_count >= MAX_ROWS || col_count >= MAX_COLUMNS => {
                        Err(SpreadsheetError::CellReferenceError(index_to_reference(row_count, col_count)))?
                    }
                    None => (row_count, col_count),
                };
                col_count = col + 1;
                value.clear();
                let cell_type = event.attribute("t")?;
                is_shared = cell_type.as_deref() == Some("s");
                kind = match cell_type.as_deref() {
                    Some("s") | Some("inlineStr") | Some("str") => CellType::Text,
                    Some("d") => CellType::IsoDateTime,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    _ => CellType::Number,
                };
                if kind == CellType::Number {
                    if let Some(style) = event.attribute("s")?.filter(|style| !style.is_empty()) {
                        let index = style.parse::<usize>()?;
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
                if is_shared {
                    let index = value.trim().parse::<usize>()?;
                    value = self
                        .shared_strings
                        .get(index)
                        .cloned()
                        .ok_or_else(|| SpreadsheetError::CellValueError(index_to_reference(row, col), value.clone()))?;
                }
            }
            Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                if !value.is_empty() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
            }
        });
        Ok(sheet)
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_sheets(&mut self) -> Result<Vec<Sheet>, ExcelSchemaError> {
        let mut sheets = Vec::with_capacity(self.sheets.len());
        for (sheet_name, zip_path) in self.sheets.clone() {
            let sheet = self.read_sheet(&sheet_name, &zip_path).with_prefix(&sheet_name)?;
            debug!(sheet = %sheet_name, cells = sheet.cells.len(), "read worksheet");
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

/// Ordered (sheet name, archive path) pairs and the 1904 date-system flag.
fn load_workbook(zip: &mut Archive) -> Result<(Vec<(String, String)>, bool), ExcelSchemaError> {
    let relationships = excel::load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_owned()))?;
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for result in event.attributes() {
                let attribute = result?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.into_owned()),
                    b"id" => id = Some(attribute.unescape_value()?.into_owned()),
                    _ => (),
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .attribute("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Cell types indexed by style id, from `xl/styles.xml`.
fn load_number_formats(zip: &mut Archive, is_1904: bool) -> Result<Vec<CellType>, ExcelSchemaError> {
    let Some(mut reader) = zip.xml_reader("xl/styles.xml")? else {
        return Ok(Vec::new());
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?;
            let format = event.attribute("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.into_owned(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            let id = event.attribute("numFmtId")?.map(|id| id.into_owned()).unwrap_or_else(|| "0".to_owned());
            format_indexes.push(id);
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

fn load_shared_strings(zip: &mut Archive) -> Result<Vec<String>, ExcelSchemaError> {
    let Some(mut reader) = zip.xml_reader("xl/sharedStrings.xml")? else {
        return Ok(Vec::new());
    };
    let mut shared_strings = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Collects the text up to `end_tag`. Phonetic runs (`rPh`) are skipped;
/// outside a `<v>` only text inside `<t>` counts.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, ExcelSchemaError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
