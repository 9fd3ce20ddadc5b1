use crate::spreadsheet::cell::CellValue;
use serde::Serialize;
use serde::Serializer;
use std::fmt::Display;

/// Longest text that still gets a `VARCHAR(n)` column.
pub const VARCHAR_LIMIT: usize = 255;

/// Coarse shape of a column's non-null values.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Classification {
    Textual,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// No non-null values at all.
    Unknown,
}

impl Classification {
    /// The most specific class every non-null value fits.
    pub fn detect(values: &[Option<CellValue>]) -> Classification {
        let values: Vec<&CellValue> = values.iter().flatten().collect();
        if values.is_empty() {
            Classification::Unknown
        } else if values.iter().all(|value| matches!(value, CellValue::Boolean(_))) {
            Classification::Boolean
        } else if values.iter().all(|value| matches!(value, CellValue::Integer(_))) {
            Classification::Integer
        } else if values.iter().all(|value| matches!(value, CellValue::Integer(_) | CellValue::Float(_))) {
            Classification::Float
        } else if values.iter().all(|value| matches!(value, CellValue::DateTime(_))) {
            Classification::DateTime
        } else {
            Classification::Textual
        }
    }
}

/// Column types the generator can emit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SqlType {
    Varchar(usize),
    Text,
    Integer,
    Decimal,
    Boolean,
    Timestamp,
}

impl Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Varchar(length) => write!(f, "VARCHAR({length})"),
            SqlType::Text => write!(f, "TEXT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::Decimal => write!(f, "DECIMAL(10,2)"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

impl Serialize for SqlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One column of a generated table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: String, kind: SqlType, nullable: bool) -> Self {
        Column {
            name,
            kind,
            nullable,
            primary_key: false,
        }
    }

    /// Infers the column definition from the column's data values.
    pub fn infer(name: String, values: &[Option<CellValue>]) -> Self {
        let (kind, nullable) = infer_type(values);
        Column::new(name, kind, nullable)
    }
}

/// SQL type and nullability for a column's data values.
///
/// Nullability only records whether any value is absent; it never changes
/// the type. Text length is counted in characters of the rendered value.
pub fn infer_type(values: &[Option<CellValue>]) -> (SqlType, bool) {
    let nullable = values.iter().any(Option::is_none);
    let kind = match Classification::detect(values) {
        Classification::Textual => {
            let max_length = values
                .iter()
                .flatten()
                .map(|value| value.to_string().chars().count())
                .max()
                .unwrap_or(0);
            if max_length <= VARCHAR_LIMIT {
                SqlType::Varchar(max_length)
            } else {
                SqlType::Text
            }
        }
        Classification::Integer => SqlType::Integer,
        Classification::Float => SqlType::Decimal,
        Classification::Boolean => SqlType::Boolean,
        Classification::DateTime => SqlType::Timestamp,
        Classification::Unknown => SqlType::Varchar(VARCHAR_LIMIT),
    };
    (kind, nullable)
}
