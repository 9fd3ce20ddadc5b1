//! BIFF8 record stream reader for the `.xls` `Workbook` stream.
//!
//! A record is a 2-byte type, a 2-byte length and a payload. Payloads longer
//! than 8224 bytes spill into CONTINUE records; the reader stitches those
//! segments together so callers see one logical record, except that string
//! character data restarts with a fresh option byte at every segment boundary.

use crate::error::ExcelSchemaError;
use crate::helpers::bytes::le_f64;
use crate::helpers::bytes::le_u16;
use crate::helpers::bytes::le_u32;
use crate::helpers::bytes::le_u64;
use encoding_rs::Encoding;
use encoding_rs::UTF_16LE;
use std::ops::Range;
use thiserror::Error;

const CONTINUE: u16 = 60;
const RECORD_HEADER_SIZE: usize = 4;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining in record")]
    NotEnoughData(usize),
}

pub(crate) struct Biff8Reader {
    /// Encoding for compressed (8-bit) strings; UTF-16LE means Latin-1 passthrough.
    pub(crate) encoding: &'static Encoding,
    stream: Vec<u8>,
    /// Offset of the next record header.
    next_record: usize,
    /// Payload ranges of the current record and its CONTINUE records.
    segments: Vec<Range<usize>>,
    segment: usize,
    cursor: usize,
}

impl Biff8Reader {
    pub(crate) fn new(stream: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: UTF_16LE,
            stream,
            next_record: 0,
            segments: Vec::new(),
            segment: 0,
            cursor: 0,
        }
    }

    /// Advances to the next record and returns its type.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, ExcelSchemaError> {
        let Some((kind, payload)) = self.record_at(self.next_record) else {
            return Ok(None);
        };
        self.next_record = payload.end;
        self.segments.clear();
        self.segments.push(payload);
        while let Some((CONTINUE, payload)) = self.record_at(self.next_record) {
            self.next_record = payload.end;
            self.segments.push(payload);
        }
        self.segment = 0;
        self.cursor = self.segments[0].start;
        Ok(Some(kind))
    }

    fn record_at(&self, offset: usize) -> Option<(u16, Range<usize>)> {
        let header = self.stream.get(offset..offset + RECORD_HEADER_SIZE)?;
        let kind = le_u16(&header[0..2]);
        let size = le_u16(&header[2..4]) as usize;
        let start = offset + RECORD_HEADER_SIZE;
        let end = (start + size).min(self.stream.len());
        Some((kind, start..end))
    }

    /// Moves to an absolute stream offset, e.g. a worksheet's BOF.
    pub(crate) fn goto(&mut self, offset: usize) {
        self.next_record = offset;
        self.segments.clear();
    }

    /// Total payload size of the current record, CONTINUE records included.
    pub(crate) fn record_len(&self) -> usize {
        self.segments.iter().map(|segment| segment.len()).sum()
    }

    /// Returns up to `length` bytes without crossing a segment boundary.
    fn read_partial(&mut self, length: usize) -> &[u8] {
        while let Some(segment) = self.segments.get(self.segment) {
            if self.cursor < segment.end {
                break;
            }
            self.segment += 1;
            if let Some(next) = self.segments.get(self.segment) {
                self.cursor = next.start;
            }
        }
        let Some(segment) = self.segments.get(self.segment) else {
            return &[];
        };
        let lower = self.cursor;
        let upper = segment.end.min(lower + length);
        self.cursor = upper;
        &self.stream[lower..upper]
    }

    fn read_exact(&mut self, length: usize) -> Result<&[u8], ExcelSchemaError> {
        let bytes = self.read_partial(length);
        if bytes.len() == length {
            Ok(bytes)
        } else {
            Err(Biff8Error::NotEnoughData(length))?
        }
    }

    /// Skips bytes, crossing CONTINUE boundaries if needed.
    pub(crate) fn skip(&mut self, length: usize) -> Result<(), ExcelSchemaError> {
        let mut remaining = length;
        while remaining > 0 {
            let skipped = self.read_partial(remaining).len();
            if skipped == 0 {
                Err(Biff8Error::NotEnoughData(remaining))?;
            }
            remaining -= skipped;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ExcelSchemaError> {
        Ok(self.read_exact(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ExcelSchemaError> {
        self.read_exact(2).map(le_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ExcelSchemaError> {
        self.read_exact(4).map(le_u32)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, ExcelSchemaError> {
        self.read_u32().map(|value| value as usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, ExcelSchemaError> {
        self.read_exact(8).map(le_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, ExcelSchemaError> {
        self.read_exact(8).map(le_f64)
    }

    /// Reads an RkNumber and renders it as decimal text.
    pub(crate) fn read_rk_number(&mut self) -> Result<String, ExcelSchemaError> {
        self.read_u32().map(decode_rk)
    }

    /// ShortXLUnicodeString: 1-byte character count.
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, ExcelSchemaError> {
        let count = self.read_u8()? as usize;
        let flags = self.read_u8()?;
        self.read_characters(count, flags)
    }

    /// XLUnicodeString: 2-byte character count.
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, ExcelSchemaError> {
        let count = self.read_u16()? as usize;
        let flags = self.read_u8()?;
        self.read_characters(count, flags)
    }

    /// XLUnicodeRichExtendedString as stored in the shared string table.
    /// Formatting runs and phonetic data are skipped.
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, ExcelSchemaError> {
        let count = self.read_u16()? as usize;
        let flags = self.read_u8()?;
        let runs = if flags & 0x08 != 0 { self.read_u16()? as usize } else { 0 };
        let phonetic_size = if flags & 0x04 != 0 { self.read_usize()? } else { 0 };
        let string = self.read_characters(count, flags)?;
        self.skip(4 * runs)?;
        self.skip(phonetic_size)?;
        Ok(string)
    }

    /// Reads `count` characters; a CONTINUE boundary inside the character
    /// data is followed by a new option byte that may switch the width.
    fn read_characters(&mut self, count: usize, flags: u8) -> Result<String, ExcelSchemaError> {
        let encoding = self.encoding;
        let mut string = String::with_capacity(count);
        let mut remaining = count;
        let mut flags = flags;
        loop {
            let is_wide = flags & 0x01 != 0;
            let width = if is_wide { 2 } else { 1 };
            let bytes = self.read_partial(remaining * width);
            let read = bytes.len() / width;
            decode_characters(bytes, is_wide, encoding, &mut string);
            remaining -= read.min(remaining);
            if remaining == 0 {
                return Ok(string);
            }
            if read == 0 && self.segment >= self.segments.len() {
                Err(Biff8Error::NotEnoughData(remaining * width))?;
            }
            flags = self.read_u8()?;
        }
    }
}

fn decode_characters(bytes: &[u8], is_wide: bool, encoding: &'static Encoding, target: &mut String) {
    if is_wide {
        let (text, _, _) = UTF_16LE.decode(bytes);
        target.push_str(&text);
    } else if encoding == UTF_16LE {
        // Compressed BIFF8 strings are the low bytes of UTF-16 code units.
        target.extend(bytes.iter().map(|byte| *byte as char));
    } else {
        let (text, _, _) = encoding.decode(bytes);
        target.push_str(&text);
    }
}

/// Decodes an RkNumber: bit 0 divides by 100, bit 1 selects a 30-bit integer
/// over the high 30 bits of a double.
pub(crate) fn decode_rk(rk: u32) -> String {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };
    let value = if rk & 0x01 != 0 { value / 100.0 } else { value };
    value.to_string()
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
