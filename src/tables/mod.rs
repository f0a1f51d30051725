use std::{collections::BTreeMap, fmt};

use thiserror::Error;

use crate::{VeroGlyphsError, buffer::VeroBufReader};

pub mod cmap;
pub mod head;
pub mod maxp;
pub mod name;
pub mod post;

/// A 4 byte table identifier, such as `cmap` or `head`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const CMAP: Self = Self(*b"cmap");
    pub const HEAD: Self = Self(*b"head");
    pub const MAXP: Self = Self(*b"maxp");
    pub const NAME: Self = Self(*b"name");
    pub const POST: Self = Self(*b"post");

    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

/// Represents the error messages which may occur when trying
/// to parse the font container (offset table, table records, collection header)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableEncodingError {
    #[error("The required buffer length for this table is {0} bytes, got {1} bytes")]
    InvalidBufferLength(usize, usize),

    #[error("Unknown sfnt version 0x{0:08x}")]
    UnknownSfntVersion(u32),

    #[error("Table '{tag}' at offset {offset} with length {length} exceeds the {len} byte buffer")]
    TableOutOfBounds {
        tag: Tag,
        offset: u32,
        length: u32,
        len: usize,
    },

    #[error("Font index {index} is out of range, the collection holds {count} fonts")]
    FontIndexOutOfRange { index: u32, count: u32 },
}

/// The scalar types an sfnt offset table may start with
pub mod sfnt_version {
    pub const TRUETYPE: u32 = 0x0001_0000;
    /// `OTTO`, CFF flavored OpenType
    pub const OPENTYPE_CFF: u32 = 0x4F54_544F;
    /// `true`, Apple TrueType
    pub const APPLE_TRUE: u32 = 0x7472_7565;
    /// `typ1`, old style PostScript font in an sfnt wrapper
    pub const TYPE1: u32 = 0x7479_7031;
    /// `ttcf`, a font collection header
    pub const COLLECTION: u32 = 0x7474_6366;
}

/// Represents the offset subtable directory and it's metadata
/// providing us with important info such as the number of tables
#[derive(Debug, Clone)]
pub struct OffsetTable {
    scalar_type: u32,
    num_tables: u16,
    search_range: u16,
    entry_selector: u16,
    range_shift: u16,
}

impl OffsetTable {
    /// Size of the offset table in bytes
    pub const SIZE: usize = 12;

    /// Constructs the offset sub table from a raw buffer
    /// the offset sub table buffer size must be 12 per the reference manual.
    pub fn from_buffer(buf: &[u8]) -> Result<Self, VeroGlyphsError> {
        if buf.len() != Self::SIZE {
            return Err(TableEncodingError::InvalidBufferLength(Self::SIZE, buf.len()).into());
        }

        let mut reader = VeroBufReader::from_buffer(buf);
        let table = Self {
            scalar_type: reader.read_u32()?,
            num_tables: reader.read_u16()?,
            search_range: reader.read_u16()?,
            entry_selector: reader.read_u16()?,
            range_shift: reader.read_u16()?,
        };

        match table.scalar_type {
            sfnt_version::TRUETYPE
            | sfnt_version::OPENTYPE_CFF
            | sfnt_version::APPLE_TRUE
            | sfnt_version::TYPE1 => Ok(table),
            other => Err(TableEncodingError::UnknownSfntVersion(other).into()),
        }
    }

    pub fn scalar_type(&self) -> u32 {
        self.scalar_type
    }

    /// Returns the number of tables exists in the font file
    pub fn num_tables(&self) -> u16 {
        self.num_tables
    }

    /// Binary search hints, kept for completeness but never relied upon
    pub fn search_hints(&self) -> (u16, u16, u16) {
        (self.search_range, self.entry_selector, self.range_shift)
    }
}

/// Represents metadata for a table within the font file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMetadata {
    /// The table identifier
    pub tag: Tag,
    /// The checksum of the table. This value can be used to verify the
    /// integrity of the table data.
    pub checksum: u32,
    /// The offset of the table, in bytes, from the beginning of the file
    pub offset: u32,
    /// The length of this table in bytes, not including padding
    pub length: u32,
}

impl TableMetadata {
    /// Size of a table record in bytes
    pub const SIZE: usize = 16;

    /// Constructs a `TableMetadata` instance from a 16 byte table record
    ///
    /// * Bytes 0-3: Tag
    /// * Bytes 4-7: Checksum of the table
    /// * Bytes 8-11: Offset of the table from the beginning of the file
    /// * Bytes 12-15: Length of the table in bytes
    pub fn from_buffer(buf: &[u8]) -> Result<Self, VeroGlyphsError> {
        if buf.len() != Self::SIZE {
            return Err(TableEncodingError::InvalidBufferLength(Self::SIZE, buf.len()).into());
        }

        let mut reader = VeroBufReader::from_buffer(buf);
        Ok(Self {
            tag: Tag::new(&reader.read_tag()?),
            checksum: reader.read_u32()?,
            offset: reader.read_u32()?,
            length: reader.read_u32()?,
        })
    }

    /// The byte range of the table inside the font buffer
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize
    }
}

/// Sums a table as a sequence of big-endian u32 words, a trailing partial
/// word is zero padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Computes the checksum a table record should carry for `data`.
///
/// The `head` table contains `checkSumAdjustment`, which is computed after the
/// table checksum and is therefore treated as zero here.
pub fn expected_checksum(tag: Tag, data: &[u8]) -> u32 {
    let sum = table_checksum(data);
    let adjustment_at = head::Head::CHECKSUM_ADJUSTMENT_OFFSET;
    match (tag, data.get(adjustment_at..adjustment_at + 4)) {
        (Tag::HEAD, Some(adjustment)) => {
            let mut word = [0u8; 4];
            word.copy_from_slice(adjustment);
            sum.wrapping_sub(u32::from_be_bytes(word))
        }
        _ => sum,
    }
}

/// The `ttcf` header at the start of a font collection
#[derive(Debug, Clone)]
pub struct CollectionHeader {
    major_version: u16,
    minor_version: u16,
    offsets: Vec<u32>,
}

impl CollectionHeader {
    pub fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self, VeroGlyphsError> {
        reader.seek_to(0)?;

        let tag = reader.read_u32()?;
        if tag != sfnt_version::COLLECTION {
            return Err(TableEncodingError::UnknownSfntVersion(tag).into());
        }

        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        let num_fonts = reader.read_u32()?;

        // Bounds check the whole offset array before allocating for it
        reader.slice(reader.position(), num_fonts as usize * 4)?;
        let offsets = (0..num_fonts)
            .map(|_| reader.read_u32())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            major_version,
            minor_version,
            offsets,
        })
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn num_fonts(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Offset of the offset table of the font at `index`
    pub fn font_offset(&self, index: u32) -> Result<u32, TableEncodingError> {
        self.offsets
            .get(index as usize)
            .copied()
            .ok_or(TableEncodingError::FontIndexOutOfRange {
                index,
                count: self.num_fonts(),
            })
    }
}

/// Returns true when `data` starts with a font collection header
pub fn is_collection(data: &[u8]) -> bool {
    data.get(0..4) == Some(&sfnt_version::COLLECTION.to_be_bytes()[..])
}

/// The parsed table directory of one font: the offset table and a record
/// for every table, keyed by tag.
#[derive(Debug, Clone)]
pub struct TableDirectory {
    /// The offset table, which provides the number of tables
    pub offset: OffsetTable,
    records: BTreeMap<Tag, TableMetadata>,
    checksum_mismatches: Vec<Tag>,
}

impl TableDirectory {
    /// Parses the directory of a single (non collection) font that starts
    /// at the beginning of `data`
    pub fn parse(data: &[u8], verify_checksums: bool) -> Result<Self, VeroGlyphsError> {
        Self::parse_at(data, 0, verify_checksums)
    }

    /// Parses a table directory whose offset table starts `directory_offset`
    /// bytes into `data`. Table offsets are always relative to the start of
    /// `data`, which is what font collections require.
    pub fn parse_at(
        data: &[u8],
        directory_offset: usize,
        verify_checksums: bool,
    ) -> Result<Self, VeroGlyphsError> {
        let mut reader = VeroBufReader::from_buffer(data);
        reader.seek_to(directory_offset)?;

        let offset = OffsetTable::from_buffer(reader.read_bytes(OffsetTable::SIZE)?)?;
        let records_buffer =
            reader.read_bytes(usize::from(offset.num_tables()) * TableMetadata::SIZE)?;

        let mut records = BTreeMap::new();
        for raw_record in records_buffer.chunks(TableMetadata::SIZE) {
            let metadata = TableMetadata::from_buffer(raw_record)?;

            if reader
                .slice(metadata.offset as usize, metadata.length as usize)
                .is_err()
            {
                return Err(TableEncodingError::TableOutOfBounds {
                    tag: metadata.tag,
                    offset: metadata.offset,
                    length: metadata.length,
                    len: data.len(),
                }
                .into());
            }

            log::trace!(
                "table '{}' offset={} length={} checksum=0x{:08x}",
                metadata.tag,
                metadata.offset,
                metadata.length,
                metadata.checksum
            );

            // A later record with the same tag replaces the earlier one
            records.insert(metadata.tag, metadata);
        }

        let mut directory = Self {
            offset,
            records,
            checksum_mismatches: Vec::new(),
        };

        if verify_checksums {
            directory.verify_checksums(data);
        }

        log::debug!(
            "parsed table directory: version=0x{:08x} tables={}",
            directory.offset.scalar_type(),
            directory.records.len()
        );

        Ok(directory)
    }

    /// Recomputes every table checksum, mismatches are logged and recorded
    /// but never fail the parse.
    fn verify_checksums(&mut self, data: &[u8]) {
        self.checksum_mismatches.clear();

        for metadata in self.records.values() {
            // Ranges were bounds checked while parsing the records
            let Some(table) = data.get(metadata.range()) else {
                continue;
            };

            let computed = expected_checksum(metadata.tag, table);
            if computed != metadata.checksum {
                log::warn!(
                    "checksum mismatch for table '{}': stored 0x{:08x}, computed 0x{:08x}",
                    metadata.tag,
                    metadata.checksum,
                    computed
                );
                self.checksum_mismatches.push(metadata.tag);
            }
        }
    }

    /// Looks up the record of a table
    pub fn get(&self, tag: Tag) -> Option<&TableMetadata> {
        self.records.get(&tag)
    }

    /// Like [`TableDirectory::get`] but a missing table is an error
    pub fn require(&self, tag: Tag) -> Result<&TableMetadata, VeroGlyphsError> {
        self.get(tag).ok_or(VeroGlyphsError::MissingTable(tag))
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.records.contains_key(&tag)
    }

    /// Borrows the bytes of a table out of the font buffer
    pub fn table_data<'a>(&self, data: &'a [u8], tag: Tag) -> Result<&'a [u8], VeroGlyphsError> {
        let metadata = self.require(tag)?;
        Ok(VeroBufReader::from_buffer(data).slice(metadata.offset as usize, metadata.length as usize)?)
    }

    /// Tables in ascending tag order
    pub fn tables(&self) -> impl Iterator<Item = &TableMetadata> {
        self.records.values()
    }

    /// Tags of the tables whose stored checksum did not match their contents
    pub fn checksum_mismatches(&self) -> &[Tag] {
        &self.checksum_mismatches
    }
}
