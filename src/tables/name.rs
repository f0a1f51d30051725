use crate::{Result, VeroGlyphsError, buffer::VeroBufReader};

use super::{TableMetadata, cmap::PlatformId};

/// Well known name identifiers
pub mod name_id {
    pub const COPYRIGHT: u16 = 0;
    pub const FAMILY: u16 = 1;
    pub const SUBFAMILY: u16 = 2;
    pub const UNIQUE_ID: u16 = 3;
    pub const FULL_NAME: u16 = 4;
    pub const VERSION: u16 = 5;
    pub const POSTSCRIPT_NAME: u16 = 6;
    pub const TYPOGRAPHIC_FAMILY: u16 = 16;
}

/// Windows language id of English (United States)
pub const LANGUAGE_EN_US: u16 = 0x0409;

/// Represents a table format
/// the name table can have 2 formats
/// 0 => plain name records
/// 1 => name records followed by language tag records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Records,
    LanguageTagged,
    Unknown(u16),
}

impl From<u16> for TableFormat {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Records,
            1 => Self::LanguageTagged,
            _ => Self::Unknown(value),
        }
    }
}

/// Represents a name record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRecord {
    /// Platform identifier code.
    pub platform_id: PlatformId,

    /// Platform-specific encoding identifier
    pub encoding_id: u16,

    /// Language identifier
    /// not enumed because there are literally DOZENS
    /// [find them here](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6name.html)
    pub language_id: u16,

    /// Name identifier, see [`name_id`]
    pub name_id: u16,

    /// Name string length in bytes
    pub length: u16,

    /// Name string offset in bytes from stringOffset
    pub offset: u16,
}

impl NameRecord {
    pub const SIZE: usize = 12;

    fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self> {
        Ok(Self {
            platform_id: PlatformId::from(reader.read_u16()?),
            encoding_id: reader.read_u16()?,
            language_id: reader.read_u16()?,
            name_id: reader.read_u16()?,
            length: reader.read_u16()?,
            offset: reader.read_u16()?,
        })
    }
}

/// Represents the [name table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6name.html)
#[derive(Debug, Clone)]
pub struct Name {
    /// The format of the name table
    format: TableFormat,

    /// The name records in file order
    name_records: Vec<NameRecord>,

    /// The string storage, the strings can't be kept as `String`s since
    /// their encoding depends on the record pointing at them
    storage: Vec<u8>,
}

impl Name {
    /// Parses the name table described by `metadata` out of the font buffer
    pub fn parse(data: &[u8], metadata: &TableMetadata) -> Result<Self> {
        let table = VeroBufReader::from_buffer(data)
            .slice(metadata.offset as usize, metadata.length as usize)?;
        Self::from_buffer(table)
    }

    pub fn from_buffer(table: &[u8]) -> Result<Self> {
        let mut reader = VeroBufReader::from_buffer(table);

        let format = TableFormat::from(reader.read_u16()?);
        let count = reader.read_u16()?;
        let string_offset = usize::from(reader.read_u16()?);

        let name_records = (0..count)
            .map(|_| NameRecord::from_reader(&mut reader))
            .collect::<Result<Vec<_>>>()?;

        // Strings referenced by records may sit anywhere after string_offset,
        // a storage area starting past the end of the table is just empty
        let storage = table.get(string_offset..).unwrap_or_default().to_vec();

        Ok(Self {
            format,
            name_records,
            storage,
        })
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    pub fn records(&self) -> &[NameRecord] {
        &self.name_records
    }

    /// Decodes the string of `record`, `None` when it lies outside the
    /// storage or uses an encoding this reader can't decode
    pub fn decode(&self, record: &NameRecord) -> Option<String> {
        let bytes = VeroBufReader::from_buffer(&self.storage)
            .slice(usize::from(record.offset), usize::from(record.length))
            .ok()?;

        match (record.platform_id, record.encoding_id) {
            (PlatformId::Unicode, _) | (PlatformId::Windows, _) => Some(decode_utf16_be(bytes)),
            (PlatformId::Macintosh, 0) => Some(decode_mac_roman(bytes)),
            _ => None,
        }
    }

    /// Looks up a name, preferring English (US) Windows records, then any
    /// Windows record, then Macintosh (English first) and finally Unicode
    /// platform records.
    pub fn get(&self, name_id: u16) -> Option<String> {
        let candidates = |predicate: &dyn Fn(&NameRecord) -> bool| {
            self.name_records
                .iter()
                .filter(|record| record.name_id == name_id)
                .filter(|record| predicate(record))
                .find_map(|record| self.decode(record).filter(|name| !name.is_empty()))
        };

        candidates(&|record| {
            record.platform_id == PlatformId::Windows && record.language_id == LANGUAGE_EN_US
        })
        .or_else(|| candidates(&|record| record.platform_id == PlatformId::Windows))
        .or_else(|| {
            candidates(&|record| record.platform_id == PlatformId::Macintosh && record.language_id == 0)
        })
        .or_else(|| candidates(&|record| record.platform_id == PlatformId::Macintosh))
        .or_else(|| candidates(&|record| record.platform_id == PlatformId::Unicode))
    }

    /// Like [`Name::get`] but a missing name is an error
    pub fn require(&self, name_id: u16) -> Result<String> {
        self.get(name_id)
            .ok_or(VeroGlyphsError::MissingNameRecord { name_id })
    }
}

fn decode_utf16_be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Characters 0x80..=0xFF of the Mac OS Roman encoding
#[rustfmt::skip]
const MAC_ROMAN_HIGH: [char; 128] = [
    '\u{00C4}', '\u{00C5}', '\u{00C7}', '\u{00C9}', '\u{00D1}', '\u{00D6}', '\u{00DC}', '\u{00E1}',
    '\u{00E0}', '\u{00E2}', '\u{00E4}', '\u{00E3}', '\u{00E5}', '\u{00E7}', '\u{00E9}', '\u{00E8}',
    '\u{00EA}', '\u{00EB}', '\u{00ED}', '\u{00EC}', '\u{00EE}', '\u{00EF}', '\u{00F1}', '\u{00F3}',
    '\u{00F2}', '\u{00F4}', '\u{00F6}', '\u{00F5}', '\u{00FA}', '\u{00F9}', '\u{00FB}', '\u{00FC}',
    '\u{2020}', '\u{00B0}', '\u{00A2}', '\u{00A3}', '\u{00A7}', '\u{2022}', '\u{00B6}', '\u{00DF}',
    '\u{00AE}', '\u{00A9}', '\u{2122}', '\u{00B4}', '\u{00A8}', '\u{2260}', '\u{00C6}', '\u{00D8}',
    '\u{221E}', '\u{00B1}', '\u{2264}', '\u{2265}', '\u{00A5}', '\u{00B5}', '\u{2202}', '\u{2211}',
    '\u{220F}', '\u{03C0}', '\u{222B}', '\u{00AA}', '\u{00BA}', '\u{03A9}', '\u{00E6}', '\u{00F8}',
    '\u{00BF}', '\u{00A1}', '\u{00AC}', '\u{221A}', '\u{0192}', '\u{2248}', '\u{2206}', '\u{00AB}',
    '\u{00BB}', '\u{2026}', '\u{00A0}', '\u{00C0}', '\u{00C3}', '\u{00D5}', '\u{0152}', '\u{0153}',
    '\u{2013}', '\u{2014}', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00F7}', '\u{25CA}',
    '\u{00FF}', '\u{0178}', '\u{2044}', '\u{20AC}', '\u{2039}', '\u{203A}', '\u{FB01}', '\u{FB02}',
    '\u{2021}', '\u{00B7}', '\u{201A}', '\u{201E}', '\u{2030}', '\u{00C2}', '\u{00CA}', '\u{00C1}',
    '\u{00CB}', '\u{00C8}', '\u{00CD}', '\u{00CE}', '\u{00CF}', '\u{00CC}', '\u{00D3}', '\u{00D4}',
    '\u{F8FF}', '\u{00D2}', '\u{00DA}', '\u{00DB}', '\u{00D9}', '\u{0131}', '\u{02C6}', '\u{02DC}',
    '\u{00AF}', '\u{02D8}', '\u{02D9}', '\u{02DA}', '\u{00B8}', '\u{02DD}', '\u{02DB}', '\u{02C7}',
];

fn decode_mac_roman(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| match byte {
            0x00..=0x7F => char::from(byte),
            _ => MAC_ROMAN_HIGH[usize::from(byte - 0x80)],
        })
        .collect()
}
