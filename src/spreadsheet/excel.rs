//! Pieces shared by the `.xlsx` and `.xls` readers.

use crate::error::ExcelSchemaError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Worksheet relationship ids to archive paths.
pub(super) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<String, String>, ExcelSchemaError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
    let mut relationships = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.attribute("Id")?;
            let kind = event.attribute("Type")?;
            let target = event.attribute("Target")?;
            // Charts, themes and the like share this file.
            if kind.map(|kind| kind.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.into_owned(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves each cell format (XF) to a cell type through its number format id.
pub(super) fn load_number_formats(
    format_indexes: Vec<String>,
    custom_formats: HashMap<String, CellType>,
    is_1904: bool,
) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Relationship targets are relative to `xl/` unless rooted.
pub(super) fn to_zip_path(path: &str) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_owned()
    } else if path.starts_with("xl/") {
        path.to_owned()
    } else {
        format!("xl/{path}")
    }
}
