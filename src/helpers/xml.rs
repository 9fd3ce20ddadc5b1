//! Thin quick-xml wrapper used by the xlsx reader.

use crate::error::ExcelSchemaError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntity(String),
}

pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` then yields Start + End like any other cell.
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, or `None` at end of document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, ExcelSchemaError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of the named attribute, if present.
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ExcelSchemaError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ExcelSchemaError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }
}

pub(crate) trait XmlTextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), ExcelSchemaError>;

    /// Appends a character reference (`&#x41;`) or predefined entity (`&amp;`).
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ExcelSchemaError>;
}

impl XmlTextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), ExcelSchemaError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ExcelSchemaError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::UnknownEntity(raw.to_string()))?;
        }
        Ok(())
    }
}

/// Drives an [`XmlReader`] to the end of the document, dispatching each
/// event to the given match arms.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}
