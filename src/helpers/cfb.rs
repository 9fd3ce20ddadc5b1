//! OLE Compound File Binary reader.
//!
//! Legacy `.xls` workbooks live in a `Workbook` stream inside a compound file,
//! and password-protected `.xlsx` files are wrapped in one as well (an
//! `EncryptedPackage` stream). The whole file is already in memory, so the
//! reader simply indexes the sector table instead of seeking.

use crate::error::ExcelSchemaError;
use crate::helpers::bytes::le_u16;
use crate::helpers::bytes::le_u64;
use crate::helpers::bytes::le_usize;
use crate::helpers::bytes::sector_ids;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::collections::HashSet;
use thiserror::Error;

const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;
/// Ids above this value are markers (free, end of chain, FAT, DIFAT).
const MAX_REGULAR_SECTOR: usize = 0xFFFF_FFFA;

/// Errors raised while walking the compound file structure.
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The compound file is truncated or corrupted")]
    Truncated,

    #[error("Invalid OLE signature (not an office document?)")]
    Signature,

    #[error("Unsupported sector size '2 ^ {1}' for major version '{0}'")]
    SectorSize(u16, u16),

    #[error("Sector chain starting at '{0}' is broken or cyclic")]
    BrokenChain(usize),

    #[error("Missing root directory entry")]
    RootDirectory,
}

/// A parsed compound file holding its streams by name.
pub(crate) struct Cfb {
    data: Vec<u8>,
    sector_size: usize,
    mini_stream_cutoff: usize,
    fat: Vec<usize>,
    mini_fat: Vec<usize>,
    mini_stream: Vec<u8>,
    entries: HashMap<String, Entry>,
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    start: usize,
    size: usize,
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    first_directory_sector: usize,
    mini_stream_cutoff: usize,
    first_mini_fat_sector: usize,
    mini_fat_sector_count: usize,
    first_difat_sector: usize,
}

impl Header {
    fn parse(bytes: &[u8]) -> Header {
        Header {
            major_version: le_u16(&bytes[26..28]),
            sector_shift: le_u16(&bytes[30..32]),
            first_directory_sector: le_usize(&bytes[48..52]),
            mini_stream_cutoff: le_usize(&bytes[56..60]),
            first_mini_fat_sector: le_usize(&bytes[60..64]),
            mini_fat_sector_count: le_usize(&bytes[64..68]),
            first_difat_sector: le_usize(&bytes[68..72]),
        }
    }

    fn sector_size(&self) -> Result<usize, CfbError> {
        match (self.major_version, self.sector_shift) {
            (3, 9) => Ok(512),
            // Version 4 pads the header out to a full 4096-byte sector.
            (4, 12) => Ok(4096),
            (major, shift) => Err(CfbError::SectorSize(major, shift)),
        }
    }
}

impl Entry {
    fn parse(bytes: &[u8], is_version_3: bool) -> Option<(String, Entry)> {
        let name_size = (le_u16(&bytes[64..66]) as usize).min(64);
        if name_size == 0 {
            return None;
        }
        let (name, _, _) = UTF_16LE.decode(&bytes[..name_size]);
        let name = name.trim_end_matches('\0').to_owned();
        let start = le_usize(&bytes[116..120]);
        let mut size = le_u64(&bytes[120..128]);
        if is_version_3 {
            // Only the low 32 bits are defined for 512-byte sector files.
            size &= 0xFFFF_FFFF;
        }
        Some((name, Entry { start, size: size as usize }))
    }
}

impl Cfb {
    /// Returns true when the bytes start with the compound file signature.
    pub(crate) fn is_compound_file(bytes: &[u8]) -> bool {
        bytes.starts_with(&SIGNATURE)
    }

    pub(crate) fn new(data: Vec<u8>) -> Result<Cfb, ExcelSchemaError> {
        if !Self::is_compound_file(&data) {
            Err(CfbError::Signature)?;
        }
        if data.len() < HEADER_SIZE {
            Err(CfbError::Truncated)?;
        }
        let header = Header::parse(&data[..HEADER_SIZE]);
        let sector_size = header.sector_size()?;
        let mut cfb = Cfb {
            data,
            sector_size,
            mini_stream_cutoff: header.mini_stream_cutoff,
            fat: Vec::new(),
            mini_fat: Vec::new(),
            mini_stream: Vec::new(),
            entries: HashMap::new(),
        };

        cfb.fat = cfb.load_fat(&header)?;
        let directory = cfb.read_chain(header.first_directory_sector)?;
        cfb.entries = directory
            .chunks_exact(DIRECTORY_ENTRY_SIZE)
            .filter_map(|bytes| Entry::parse(bytes, sector_size == 512))
            .collect();
        let root = *cfb.entries.get("Root Entry").ok_or(CfbError::RootDirectory)?;

        if header.mini_fat_sector_count > 0 {
            cfb.mini_fat = sector_ids(&cfb.read_chain(header.first_mini_fat_sector)?).collect();
        }
        let mut mini_stream = cfb.read_chain(root.start)?;
        mini_stream.truncate(root.size);
        cfb.mini_stream = mini_stream;
        Ok(cfb)
    }

    /// Checks whether a stream with this name exists.
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Reads a whole stream by name.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, ExcelSchemaError> {
        let Some(entry) = self.entries.get(name) else {
            return Ok(None);
        };
        let mut bytes = if entry.size < self.mini_stream_cutoff {
            self.read_mini_chain(entry.start)?
        } else {
            self.read_chain(entry.start)?
        };
        bytes.truncate(entry.size);
        Ok(Some(bytes))
    }

    /// Sectors physically present after the header; no chain can be longer.
    fn sector_count(&self) -> usize {
        self.data.len().div_ceil(self.sector_size).saturating_sub(1)
    }

    fn sector(&self, id: usize) -> Result<&[u8], CfbError> {
        // Sector 0 starts right after the header, which occupies one sector.
        let lower = (id + 1) * self.sector_size;
        if lower >= self.data.len() {
            return Err(CfbError::Truncated);
        }
        let upper = self.data.len().min(lower + self.sector_size);
        Ok(&self.data[lower..upper])
    }

    /// Collects the FAT sectors listed by the header DIFAT and its chained DIFAT sectors.
    fn load_fat(&self, header: &Header) -> Result<Vec<usize>, ExcelSchemaError> {
        let mut difat: Vec<usize> = sector_ids(&self.data[76..HEADER_SIZE]).collect();
        let mut next = header.first_difat_sector;
        let mut visited = 0usize;
        while next <= MAX_REGULAR_SECTOR {
            visited += 1;
            if visited > self.sector_count() {
                Err(CfbError::BrokenChain(header.first_difat_sector))?;
            }
            let mut ids: Vec<usize> = sector_ids(self.sector(next)?).collect();
            next = ids.pop().ok_or(CfbError::Truncated)?;
            difat.extend(ids);
        }

        // A FAT sector listed twice would only inflate the table.
        let mut seen = HashSet::new();
        let mut fat = Vec::<usize>::new();
        for id in difat.into_iter().filter(|id| *id <= MAX_REGULAR_SECTOR) {
            if seen.insert(id) {
                fat.extend(sector_ids(self.sector(id)?));
            }
        }
        Ok(fat)
    }

    fn read_chain(&self, start: usize) -> Result<Vec<u8>, ExcelSchemaError> {
        let mut content = Vec::<u8>::new();
        let mut id = start;
        let mut steps = 0usize;
        while id <= MAX_REGULAR_SECTOR {
            steps += 1;
            if steps > self.sector_count() {
                Err(CfbError::BrokenChain(start))?;
            }
            content.extend_from_slice(self.sector(id)?);
            id = *self.fat.get(id).ok_or(CfbError::BrokenChain(start))?;
        }
        Ok(content)
    }

    fn read_mini_chain(&self, start: usize) -> Result<Vec<u8>, ExcelSchemaError> {
        let mut content = Vec::<u8>::new();
        let mut id = start;
        let mut steps = 0usize;
        while id <= MAX_REGULAR_SECTOR {
            steps += 1;
            if steps > self.mini_stream.len().div_ceil(MINI_SECTOR_SIZE) {
                Err(CfbError::BrokenChain(start))?;
            }
            let lower = id * MINI_SECTOR_SIZE;
            let upper = self.mini_stream.len().min(lower + MINI_SECTOR_SIZE);
            let sector = self.mini_stream.get(lower..upper).ok_or(CfbError::Truncated)?;
            content.extend_from_slice(sector);
            id = *self.mini_fat.get(id).ok_or(CfbError::BrokenChain(start))?;
        }
        Ok(content)
    }
}
