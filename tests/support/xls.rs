//! Builds small BIFF8 `.xls` workbooks in memory, wrapped in a version 3
//! compound file with a single `Workbook` stream.

const BOF: u16 = 2057;
const EOF: u16 = 10;
const CODE_PAGE: u16 = 66;
const XF: u16 = 224;
const SST: u16 = 252;
const BOUND_SHEET8: u16 = 133;
const LABEL_SST: u16 = 253;
const LABEL: u16 = 516;
const NUMBER: u16 = 515;
const RK: u16 = 638;
const MUL_RK: u16 = 189;

const SECTOR_SIZE: usize = 512;
const MINI_STREAM_CUTOFF: usize = 4096;
const END_OF_CHAIN: u32 = 0xFFFF_FFFE;
const FREE_SECTOR: u32 = 0xFFFF_FFFF;
const FAT_SECTOR: u32 = 0xFFFF_FFFD;

/// XF index whose number format is the built-in short date (id 14).
pub const XLS_DATE_STYLE: u16 = 1;

pub fn record(kind: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 4);
    bytes.extend_from_slice(&kind.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn cell_header(row: u16, col: u16) -> Vec<u8> {
    let mut payload = row.to_le_bytes().to_vec();
    payload.extend(col.to_le_bytes());
    payload
}

/// An RkNumber holding a 30-bit integer.
pub fn rk_integer(value: i32) -> u32 {
    ((value << 2) | 0x02) as u32
}

/// An RkNumber holding an integer number of hundredths.
pub fn rk_hundredths(value: i32) -> u32 {
    ((value << 2) | 0x03) as u32
}

pub fn label_sst(row: u16, col: u16, index: u32) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend(0u16.to_le_bytes());
    payload.extend(index.to_le_bytes());
    record(LABEL_SST, &payload)
}

/// LABEL with a compressed (8-bit) string.
pub fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend(0u16.to_le_bytes());
    payload.extend((text.len() as u16).to_le_bytes());
    payload.push(0);
    payload.extend(text.bytes());
    record(LABEL, &payload)
}

pub fn number(row: u16, col: u16, xf: u16, value: f64) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend(xf.to_le_bytes());
    payload.extend(value.to_le_bytes());
    record(NUMBER, &payload)
}

pub fn rk(row: u16, col: u16, xf: u16, value: u32) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend(xf.to_le_bytes());
    payload.extend(value.to_le_bytes());
    record(RK, &payload)
}

/// MULRK over consecutive columns starting at `first_col`.
pub fn mul_rk(row: u16, first_col: u16, cells: &[(u16, u32)]) -> Vec<u8> {
    let mut payload = cell_header(row, first_col);
    for (xf, value) in cells {
        payload.extend(xf.to_le_bytes());
        payload.extend(value.to_le_bytes());
    }
    payload.extend((first_col + cells.len() as u16 - 1).to_le_bytes());
    record(MUL_RK, &payload)
}

enum XlsSheet {
    Worksheet(String, Vec<Vec<u8>>),
    Chart(String),
}

#[derive(Default)]
pub struct XlsBuilder {
    shared_strings: Vec<&'static str>,
    sheets: Vec<XlsSheet>,
}

impl XlsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared_strings(mut self, strings: &[&'static str]) -> Self {
        self.shared_strings = strings.to_vec();
        self
    }

    /// A worksheet substream made of the given cell records.
    pub fn sheet(mut self, name: &str, records: Vec<Vec<u8>>) -> Self {
        self.sheets.push(XlsSheet::Worksheet(name.to_owned(), records));
        self
    }

    /// A chart sheet entry; only worksheets are read.
    pub fn chart(mut self, name: &str) -> Self {
        self.sheets.push(XlsSheet::Chart(name.to_owned()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        compound_file("Workbook", &self.workbook_stream())
    }

    fn workbook_stream(&self) -> Vec<u8> {
        let mut stream = bof(0x0005);
        stream.extend(record(CODE_PAGE, &1200u16.to_le_bytes()));
        stream.extend(xf(0));
        stream.extend(xf(14));
        stream.extend(self.sst());

        // BoundSheet8 pointers are patched once the substreams are placed.
        let mut pointers = Vec::new();
        for sheet in &self.sheets {
            let (name, sheet_type) = match sheet {
                XlsSheet::Worksheet(name, _) => (name, 0u8),
                XlsSheet::Chart(name) => (name, 2u8),
            };
            pointers.push(stream.len() + 4);
            let mut payload = 0u32.to_le_bytes().to_vec();
            payload.extend([0, sheet_type, name.len() as u8, 0]);
            payload.extend(name.bytes());
            stream.extend(record(BOUND_SHEET8, &payload));
        }
        stream.extend(record(EOF, &[]));

        for (sheet, pointer) in self.sheets.iter().zip(pointers) {
            let XlsSheet::Worksheet(_, records) = sheet else {
                continue;
            };
            let offset = stream.len() as u32;
            stream[pointer..pointer + 4].copy_from_slice(&offset.to_le_bytes());
            stream.extend(bof(0x0010));
            for cell in records {
                stream.extend_from_slice(cell);
            }
            stream.extend(record(EOF, &[]));
        }
        stream
    }

    fn sst(&self) -> Vec<u8> {
        let count = self.shared_strings.len() as u32;
        let mut payload = count.to_le_bytes().to_vec();
        payload.extend(count.to_le_bytes());
        for text in &self.shared_strings {
            payload.extend((text.len() as u16).to_le_bytes());
            payload.push(0);
            payload.extend(text.bytes());
        }
        record(SST, &payload)
    }
}

fn bof(substream_type: u16) -> Vec<u8> {
    let mut payload = 0x0600u16.to_le_bytes().to_vec();
    payload.extend(substream_type.to_le_bytes());
    payload.resize(16, 0);
    record(BOF, &payload)
}

fn xf(format_id: u16) -> Vec<u8> {
    let mut payload = vec![0u8; 20];
    payload[2..4].copy_from_slice(&format_id.to_le_bytes());
    record(XF, &payload)
}

fn put_u16(buffer: &mut [u8], offset: usize, value: u16) {
    buffer[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn directory_entry(name: &str, kind: u8, start: u32, size: u32) -> Vec<u8> {
    let mut entry = vec![0u8; 128];
    let units: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    for (index, unit) in units.iter().enumerate() {
        put_u16(&mut entry, index * 2, *unit);
    }
    put_u16(&mut entry, 64, (units.len() * 2) as u16);
    entry[66] = kind;
    put_u32(&mut entry, 68, FREE_SECTOR);
    put_u32(&mut entry, 72, FREE_SECTOR);
    put_u32(&mut entry, 76, FREE_SECTOR);
    put_u32(&mut entry, 116, start);
    put_u32(&mut entry, 120, size);
    entry
}

/// Sector 0 holds the FAT, sector 1 the directory, the stream follows from
/// sector 2. The stream is padded past the mini stream cutoff so it lives in
/// regular sectors.
fn compound_file(stream_name: &str, stream: &[u8]) -> Vec<u8> {
    let size = stream.len().max(MINI_STREAM_CUTOFF).div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
    let stream_sectors = size / SECTOR_SIZE;
    assert!(stream_sectors + 2 <= SECTOR_SIZE / 4, "stream too large for one FAT sector");

    let mut header = vec![0u8; SECTOR_SIZE];
    header[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    put_u16(&mut header, 24, 0x3E);
    put_u16(&mut header, 26, 3);
    put_u16(&mut header, 28, 0xFFFE);
    put_u16(&mut header, 30, 9);
    put_u16(&mut header, 32, 6);
    put_u32(&mut header, 44, 1);
    put_u32(&mut header, 48, 1);
    put_u32(&mut header, 56, MINI_STREAM_CUTOFF as u32);
    put_u32(&mut header, 60, END_OF_CHAIN);
    put_u32(&mut header, 68, END_OF_CHAIN);
    for index in 0..109 {
        put_u32(&mut header, 76 + index * 4, if index == 0 { 0 } else { FREE_SECTOR });
    }

    let mut fat = vec![FAT_SECTOR, END_OF_CHAIN];
    for sector in 2..stream_sectors + 1 {
        fat.push(sector as u32 + 1);
    }
    fat.push(END_OF_CHAIN);
    fat.resize(SECTOR_SIZE / 4, FREE_SECTOR);

    let mut directory = directory_entry("Root Entry", 5, END_OF_CHAIN, 0);
    directory.extend(directory_entry(stream_name, 2, 2, size as u32));
    directory.resize(SECTOR_SIZE, 0);

    let mut file = header;
    file.extend(fat.iter().flat_map(|id| id.to_le_bytes()));
    file.extend(directory);
    file.extend_from_slice(stream);
    file.resize(SECTOR_SIZE * (stream_sectors + 3), 0);
    file
}
