use crate::error::ExcelSchemaError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use serde::Serialize;
use std::fmt::Display;

/// Text that reads as a missing value rather than as data.
const NULL_LITERALS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const MICROS_PER_DAY: f64 = 86_400_000_000f64;

/// How a raw cell string is to be interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Serial date-time number, 1900 date system
    NumberDateTime1900,
    NumberDate1900,
    NumberTime1900,
    /// Serial date-time number, 1904 date system
    NumberDateTime1904,
    NumberDate1904,
    NumberTime1904,
    /// ISO 8601 text from `t="d"` cells
    IsoDateTime,
    Text,
    Error,
}

impl CellType {
    /// Maps built-in number format ids to date/time types.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => {
                Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 })
            }
            _ => None,
        }
    }

    /// Scans a custom format code for date (`y`, `d`) and time (`h`, `s`)
    /// tokens outside quoted literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Error code byte to its display text.
pub(crate) fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A single non-null cell value, as seen by type inference.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Boolean(true) => write!(f, "True"),
            CellValue::Boolean(false) => write!(f, "False"),
            CellValue::Integer(value) => write!(f, "{value}"),
            // Integral floats keep their fractional marker: `2.0`, not `2`.
            CellValue::Float(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 => {
                write!(f, "{value:.1}")
            }
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::Text(value) => write!(f, "{value}"),
            CellValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
        }
    }
}

/// A decoded cell: 0-based position, interpretation and raw text.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Interprets the raw text; `None` for empty, error and null-literal cells.
    pub(crate) fn to_value(&self) -> Result<Option<CellValue>, ExcelSchemaError> {
        if NULL_LITERALS.contains(&self.value.as_str()) {
            return Ok(None);
        }
        let value = match self.kind {
            CellType::Empty | CellType::Error => return Ok(None),
            CellType::Boolean => CellValue::Boolean(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => self.to_number()?,
            CellType::NumberDateTime1900 | CellType::NumberDate1900 => CellValue::DateTime(self.to_datetime(false)?),
            CellType::NumberDateTime1904 | CellType::NumberDate1904 => CellValue::DateTime(self.to_datetime(true)?),
            CellType::NumberTime1900 | CellType::NumberTime1904 => CellValue::Time(self.to_time()?),
            CellType::IsoDateTime => self.to_iso_value(),
            CellType::Text => CellValue::Text(self.value.clone()),
        };
        Ok(Some(value))
    }

    fn to_number(&self) -> Result<CellValue, ExcelSchemaError> {
        let text = self.value.trim();
        if !text.contains(['.', 'e', 'E']) {
            if let Ok(integer) = text.parse::<i64>() {
                return Ok(CellValue::Integer(integer));
            }
        }
        Ok(CellValue::Float(self.to_double()?))
    }

    fn to_double(&self) -> Result<f64, ExcelSchemaError> {
        self.value.trim().parse::<f64>().map_err(|_| self.value_error())
    }

    /// Serial number to date-time. Serials before 1900-03-01 are shifted by
    /// one day to undo the fictitious 1900-02-29.
    fn to_datetime(&self, is_1904: bool) -> Result<NaiveDateTime, ExcelSchemaError> {
        let serial = self.to_double()?;
        let days = serial.trunc() as i64;
        let offset = if is_1904 {
            1_462
        } else if days < 60 {
            1
        } else {
            0
        };
        let micros = (serial.fract() * MICROS_PER_DAY).round() as i64;
        NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
            .zip(Duration::try_days(days.saturating_add(offset)))
            .and_then(|(epoch, days)| epoch.checked_add_signed(days))
            .and_then(|date| date.checked_add_signed(Duration::microseconds(micros)))
            .ok_or_else(|| self.value_error())
    }

    fn to_time(&self) -> Result<NaiveTime, ExcelSchemaError> {
        let fraction = self.to_double()?.rem_euclid(1.0);
        let micros = (fraction * MICROS_PER_DAY).round() as i64 % 86_400_000_000;
        NaiveTime::from_num_seconds_from_midnight_opt(
            (micros / 1_000_000) as u32,
            ((micros % 1_000_000) * 1_000) as u32,
        )
        .ok_or_else(|| self.value_error())
    }

    /// ISO cells hold a date, a date-time or a bare time; anything else stays text.
    fn to_iso_value(&self) -> CellValue {
        let text = self.value.trim();
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            CellValue::DateTime(datetime)
        } else if let Some(datetime) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            CellValue::DateTime(datetime)
        } else if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M:%S%.f") {
            CellValue::Time(time)
        } else {
            CellValue::Text(self.value.clone())
        }
    }

    fn value_error(&self) -> ExcelSchemaError {
        SpreadsheetError::CellValueError(self.reference(), self.value.clone()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    fn datetime(text: &str) -> CellValue {
        CellValue::DateTime(NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[test]
    fn numbers_split_into_integer_and_float() {
        assert_eq!(cell(CellType::Number, "42").to_value().unwrap(), Some(CellValue::Integer(42)));
        assert_eq!(cell(CellType::Number, "-3").to_value().unwrap(), Some(CellValue::Integer(-3)));
        assert_eq!(cell(CellType::Number, "1.5").to_value().unwrap(), Some(CellValue::Float(1.5)));
        assert_eq!(cell(CellType::Number, "1E3").to_value().unwrap(), Some(CellValue::Float(1000.0)));
        assert_eq!(
            cell(CellType::Number, "99999999999999999999").to_value().unwrap(),
            Some(CellValue::Float(1e20))
        );
        assert!(cell(CellType::Number, "abc").to_value().is_err());
    }

    #[test]
    fn null_literals_and_errors_are_absent() {
        for literal in ["", "NA", "null", "NaN", "#N/A", "n/a"] {
            assert_eq!(cell(CellType::Text, literal).to_value().unwrap(), None, "{literal}");
        }
        assert_eq!(cell(CellType::Error, "#DIV/0!").to_value().unwrap(), None);
        assert_eq!(cell(CellType::Empty, "x").to_value().unwrap(), None);
        assert_eq!(cell(CellType::Text, "Na").to_value().unwrap(), Some(CellValue::Text("Na".to_owned())));
    }

    #[test]
    fn booleans() {
        assert_eq!(cell(CellType::Boolean, "1").to_value().unwrap(), Some(CellValue::Boolean(true)));
        assert_eq!(cell(CellType::Boolean, "0").to_value().unwrap(), Some(CellValue::Boolean(false)));
    }

    #[test]
    fn serial_dates_honour_both_epochs() {
        assert_eq!(cell(CellType::NumberDate1900, "1").to_value().unwrap(), Some(datetime("1900-01-01 00:00:00")));
        assert_eq!(cell(CellType::NumberDate1900, "61").to_value().unwrap(), Some(datetime("1900-03-01 00:00:00")));
        assert_eq!(
            cell(CellType::NumberDateTime1900, "45292.75").to_value().unwrap(),
            Some(datetime("2024-01-01 18:00:00"))
        );
        assert_eq!(cell(CellType::NumberDate1904, "0").to_value().unwrap(), Some(datetime("1904-01-01 00:00:00")));
    }

    #[test]
    fn serial_times() {
        let value = cell(CellType::NumberTime1900, "0.5").to_value().unwrap();
        assert_eq!(value, Some(CellValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())));
    }

    #[test]
    fn iso_cells() {
        assert_eq!(cell(CellType::IsoDateTime, "2024-05-06").to_value().unwrap(), Some(datetime("2024-05-06 00:00:00")));
        assert_eq!(
            cell(CellType::IsoDateTime, "2024-05-06T07:08:09").to_value().unwrap(),
            Some(datetime("2024-05-06 07:08:09"))
        );
        assert_eq!(
            cell(CellType::IsoDateTime, "07:08:09").to_value().unwrap(),
            Some(CellValue::Time(NaiveTime::from_hms_opt(7, 8, 9).unwrap()))
        );
    }

    #[test]
    fn renders_values() {
        assert_eq!(CellValue::Float(2.0).to_string(), "2.0");
        assert_eq!(CellValue::Float(2.25).to_string(), "2.25");
        assert_eq!(CellValue::Boolean(false).to_string(), "False");
        assert_eq!(datetime("2024-01-02 03:04:05").to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn detects_custom_date_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", true), CellType::NumberDateTime1904);
        assert_eq!(CellType::parse_custom_number_format("[h]:mm:ss", false), CellType::NumberTime1900);
        assert_eq!(CellType::parse_custom_number_format("#,##0.00\"days\"", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
    }
}
