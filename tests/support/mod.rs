//! Builds small `.xlsx` and `.xls` workbooks in memory.

#![allow(dead_code)]

mod xls;

pub use xls::*;

use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Style index whose number format is the built-in short date (id 14).
const DATE_STYLE: usize = 1;

#[derive(Clone, Debug)]
pub enum Value {
    Text(&'static str),
    Number(&'static str),
    /// Serial day number rendered with a date format.
    Date(u32),
    Bool(bool),
    Blank,
}

pub use Value::*;

enum SheetBody {
    Rows(Vec<Vec<Value>>),
    /// Verbatim content of `<sheetData>`.
    Raw(String),
}

#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<(String, SheetBody)>,
    shared_strings: bool,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str, rows: Vec<Vec<Value>>) -> Self {
        self.sheets.push((name.to_owned(), SheetBody::Rows(rows)));
        self
    }

    /// A sheet whose `<sheetData>` children are written as given.
    pub fn raw_sheet(mut self, name: &str, sheet_data: &str) -> Self {
        self.sheets.push((name.to_owned(), SheetBody::Raw(sheet_data.to_owned())));
        self
    }

    /// Stores text through `xl/sharedStrings.xml` instead of inline strings.
    pub fn with_shared_strings(mut self) -> Self {
        self.shared_strings = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut strings: Vec<&str> = Vec::new();

        let mut worksheets = Vec::new();
        for (_, body) in &self.sheets {
            worksheets.push(match body {
                SheetBody::Rows(rows) => self.worksheet_xml(&self.sheet_data_xml(rows, &mut strings)),
                SheetBody::Raw(sheet_data) => self.worksheet_xml(sheet_data),
            });
        }

        write_part(&mut zip, options, "[Content_Types].xml", &self.content_types_xml());
        write_part(&mut zip, options, "xl/workbook.xml", &self.workbook_xml());
        write_part(&mut zip, options, "xl/_rels/workbook.xml.rels", &self.relationships_xml());
        write_part(&mut zip, options, "xl/styles.xml", STYLES_XML);
        for (index, worksheet) in worksheets.iter().enumerate() {
            let path = format!("xl/worksheets/sheet{}.xml", index + 1);
            write_part(&mut zip, options, &path, worksheet);
        }
        if self.shared_strings {
            write_part(&mut zip, options, "xl/sharedStrings.xml", &shared_strings_xml(&strings));
        }
        zip.finish().unwrap().into_inner()
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        for index in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{index}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        for (index, (name, _)) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(name),
                index + 1,
                index + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn relationships_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for index in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{index}.xml"/>"#
            ));
        }
        xml.push_str(r#"<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
        xml.push_str("</Relationships>");
        xml
    }

    fn worksheet_xml(&self, sheet_data: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
        )
    }

    fn sheet_data_xml(&self, rows: &[Vec<Value>], strings: &mut Vec<&'static str>) -> String {
        let mut xml = String::new();
        for (row, values) in rows.iter().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
            for (col, value) in values.iter().enumerate() {
                let reference = format!("{}{}", column_name(col), row + 1);
                let cell = match value {
                    Text(text) if self.shared_strings => {
                        let index = strings.iter().position(|s| s == text).unwrap_or_else(|| {
                            strings.push(*text);
                            strings.len() - 1
                        });
                        format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#)
                    }
                    Text(text) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(text)),
                    Number(number) => format!(r#"<c r="{reference}"><v>{number}</v></c>"#),
                    Date(serial) => format!(r#"<c r="{reference}" s="{DATE_STYLE}"><v>{serial}</v></c>"#),
                    Bool(flag) => format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*flag)),
                    Blank => continue,
                };
                xml.push_str(&cell);
            }
            xml.push_str("</row>");
        }
        xml
    }
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

fn shared_strings_xml(strings: &[&str]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for text in strings {
        xml.push_str(&format!("<si><t>{}</t></si>", escape(text)));
    }
    xml.push_str("</sst>");
    xml
}

fn write_part(zip: &mut ZipWriter<Cursor<Vec<u8>>>, options: SimpleFileOptions, path: &str, content: &str) {
    zip.start_file(path, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
}

fn column_name(mut col: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// A compound file header with nothing behind it: recognized as `.xls`
/// container but unreadable.
pub fn compound_file_signature() -> Vec<u8> {
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.resize(64, 0);
    bytes
}
