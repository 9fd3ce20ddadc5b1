use thiserror::Error;

/// Crate-wide error type.
/// Aggregates errors from the standard library, the decoding dependencies and every internal module.
#[derive(Error, Debug)]
pub enum ExcelSchemaError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),

    // Conversion errors
    #[error("{0}")]
    ConvertError(#[from] crate::converter::ConvertError),
}

impl ExcelSchemaError {
    /// Whether the failure is the uploader's fault (HTTP 400) rather than a
    /// processing failure (HTTP 500).
    pub fn is_invalid_input(&self) -> bool {
        use crate::spreadsheet::SpreadsheetError;
        match self {
            ExcelSchemaError::ConvertError(_) => true,
            ExcelSchemaError::SpreadsheetError(error) => matches!(
                error,
                SpreadsheetError::PasswordProtectedError(_) | SpreadsheetError::SpreadsheetEmptyError(_)
            ),
            _ => false,
        }
    }
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ExcelSchemaError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| ExcelSchemaError::WithContextError(format!("{}: {}", message, e)))
    }
}
