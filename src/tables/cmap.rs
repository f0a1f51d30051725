//! [cmap table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cmap.html)
//! implementation, maps character codes to glyph indices.
//!
//! Formats 0, 4, 6 and 12 are supported, these cover the byte encodings,
//! the Basic Multilingual Plane and the full Unicode range. Subtables in any
//! other format are kept as [`CmapSubtable::Unsupported`] and never map
//! anything.

use std::{collections::BTreeMap, sync::Arc};

use crate::{Result, VeroGlyphsError, buffer::VeroBufReader};

use super::TableMetadata;

/// Represents the platform identifier of a cmap subtable or a name record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformId {
    Unicode,
    Macintosh,
    /// ISO, deprecated
    Iso,
    Windows,
    Custom,
    Unknown(u16),
}

impl From<u16> for PlatformId {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Unicode,
            1 => Self::Macintosh,
            2 => Self::Iso,
            3 => Self::Windows,
            4 => Self::Custom,
            _ => Self::Unknown(value),
        }
    }
}

impl From<PlatformId> for u16 {
    fn from(value: PlatformId) -> Self {
        match value {
            PlatformId::Unicode => 0,
            PlatformId::Macintosh => 1,
            PlatformId::Iso => 2,
            PlatformId::Windows => 3,
            PlatformId::Custom => 4,
            PlatformId::Unknown(value) => value,
        }
    }
}

/// Something covering an inclusive, non empty range of character codes
trait CodeRange {
    fn first(&self) -> u32;
    fn last(&self) -> u32;
}

/// Finds the range containing `code` in `ranges`, which must be sorted
/// ascending and must not overlap. `project` turns the matched range into a
/// glyph index.
fn search_ranges<R, F>(ranges: &[R], code: u32, project: F) -> Option<u32>
where
    R: CodeRange,
    F: FnOnce(&R) -> Option<u32>,
{
    // First range that does not end before `code`
    let index = ranges.partition_point(|range| range.last() < code);
    let range = ranges.get(index)?;

    if range.first() > code {
        return None;
    }

    project(range)
}

fn is_sorted_and_disjoint<R: CodeRange>(ranges: &[R]) -> bool {
    ranges.iter().all(|range| range.first() <= range.last())
        && ranges
            .windows(2)
            .all(|pair| pair[0].last() < pair[1].first())
}

/// Drops inverted ranges, sorts the rest by their first code and drops every
/// range overlapping one kept before it, which leaves `ranges` searchable.
fn repair_ranges<R: CodeRange>(ranges: &mut Vec<R>) {
    ranges.retain(|range| range.first() <= range.last());
    ranges.sort_by_key(|range| (range.first(), range.last()));

    let mut covered_until: Option<u32> = None;
    ranges.retain(|range| {
        if covered_until.is_some_and(|last| range.first() <= last) {
            return false;
        }
        covered_until = Some(range.last());
        true
    });
}

/// Glyph 0 is the missing glyph, a mapping to it is no mapping at all
fn non_missing(glyph: u32) -> Option<u32> {
    (glyph != 0).then_some(glyph)
}

/// Format 0, byte encoding table
#[derive(Debug, Clone)]
pub struct Format0 {
    language: u16,
    glyph_ids: Vec<u8>,
}

impl Format0 {
    fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self> {
        let _length = reader.read_u16()?;
        let language = reader.read_u16()?;
        let glyph_ids = reader.read_bytes(256)?.to_vec();

        Ok(Self {
            language,
            glyph_ids,
        })
    }

    pub fn glyph_index(&self, code: u32) -> Option<u32> {
        let glyph = *self.glyph_ids.get(usize::try_from(code).ok()?)?;
        non_missing(u32::from(glyph))
    }

    fn codepoints(&self) -> Vec<u32> {
        (0..256).filter(|&code| self.glyph_index(code).is_some()).collect()
    }
}

/// One segment of a format 4 subtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start_code: u16,
    pub end_code: u16,
    pub id_delta: i16,
    pub id_range_offset: u16,
    /// Position of this segment in the parallel arrays of the subtable,
    /// `id_range_offset` is relative to it.
    index: usize,
}

impl Segment {
    /// Number of glyph id array entries this segment needs, `None` when it
    /// maps through `id_delta` alone
    fn referenced_glyph_ids(&self, seg_count: usize) -> Option<usize> {
        if self.id_range_offset == 0 || self.start_code > self.end_code {
            return None;
        }

        let last_slot = usize::from(self.id_range_offset / 2) + usize::from(self.end_code - self.start_code);
        Some((self.index + last_slot + 1).saturating_sub(seg_count))
    }
}

impl CodeRange for Segment {
    fn first(&self) -> u32 {
        u32::from(self.start_code)
    }

    fn last(&self) -> u32 {
        u32::from(self.end_code)
    }
}

/// Format 4, segment mapping to delta values
#[derive(Debug, Clone)]
pub struct Format4 {
    language: u16,
    /// Segment count as stored, repairs may drop entries from `segments`
    seg_count: usize,
    segments: Vec<Segment>,
    glyph_ids: Vec<u16>,
}

impl Format4 {
    fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self> {
        // Byte layout looks like this:
        // Header        : 14 bytes
        // End Code      : [u16; segcount]
        //                 < 2 byte padding>
        // Start Code    : [u16; segcount]
        // ID Delta      : [i16; segcount]
        // ID Range Offs : [u16; segcount]
        // Glyph IDS     : up to the declared length
        let start = reader.position() - 2;
        let length = usize::from(reader.read_u16()?);
        let language = reader.read_u16()?;
        let seg_count = usize::from(reader.read_u16()? / 2);
        reader.skip(6)?;

        let end_codes = read_u16_array(reader, seg_count)?;
        reader.skip(2)?;
        let start_codes = read_u16_array(reader, seg_count)?;
        let id_deltas = read_u16_array(reader, seg_count)?;
        let id_range_offsets = read_u16_array(reader, seg_count)?;

        let mut segments: Vec<Segment> = (0..seg_count)
            .map(|index| Segment {
                start_code: start_codes[index],
                end_code: end_codes[index],
                id_delta: id_deltas[index] as i16,
                id_range_offset: id_range_offsets[index],
                index,
            })
            .collect();

        if segments.last().map(|segment| segment.end_code) != Some(0xFFFF) {
            log::warn!("cmap format 4 subtable lacks the 0xFFFF terminating segment");
        }

        if !is_sorted_and_disjoint(&segments) {
            log::warn!("cmap format 4 segments are not sorted or overlap, repairing them");
            repair_ranges(&mut segments);
        }

        // The u16 length wraps for subtables past 64 KiB and is frequently
        // wrong otherwise, so the glyph id array spans at least as far as the
        // segments index into it.
        let arrays_end = reader.position();
        let declared = (start + length)
            .checked_sub(arrays_end)
            .filter(|_| start + length <= reader.len())
            .unwrap_or(0)
            / 2;
        let referenced = segments
            .iter()
            .filter_map(|segment| segment.referenced_glyph_ids(seg_count))
            .max()
            .unwrap_or(0);
        if referenced > declared {
            log::debug!("cmap format 4 length covers {declared} glyph ids, segments use {referenced}");
        }
        let glyph_count = declared.max(referenced).min(reader.remaining() / 2);
        let glyph_ids = read_u16_array(reader, glyph_count)?;

        Ok(Self {
            language,
            seg_count,
            segments,
            glyph_ids,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn glyph_index(&self, code: u32) -> Option<u32> {
        let code = u16::try_from(code).ok()?;
        search_ranges(&self.segments, u32::from(code), |segment| {
            self.segment_glyph(segment, code)
        })
    }

    fn segment_glyph(&self, segment: &Segment, code: u16) -> Option<u32> {
        if segment.id_range_offset == 0 {
            let glyph = code.wrapping_add(segment.id_delta as u16);
            return non_missing(u32::from(glyph));
        }

        // id_range_offset is a byte offset from the segment's own slot in the
        // id range offset array. That array sits right before the glyph id
        // array, so the slot lies `seg_count - index` entries before it.
        let from_slot = usize::from(segment.id_range_offset / 2) + usize::from(code - segment.start_code);
        let glyph_position = (segment.index + from_slot).checked_sub(self.seg_count)?;
        let glyph = *self.glyph_ids.get(glyph_position)?;

        if glyph == 0 {
            return None;
        }

        non_missing(u32::from(glyph.wrapping_add(segment.id_delta as u16)))
    }

    fn codepoints(&self) -> Vec<u32> {
        self.segments
            .iter()
            .filter(|segment| !(segment.start_code == 0xFFFF && segment.end_code == 0xFFFF))
            .flat_map(|segment| segment.start_code..=segment.end_code)
            .filter(|&code| self.glyph_index(u32::from(code)).is_some())
            .map(u32::from)
            .collect()
    }
}

/// Format 6, trimmed table mapping
#[derive(Debug, Clone)]
pub struct Format6 {
    language: u16,
    first_code: u16,
    glyph_ids: Vec<u16>,
}

impl Format6 {
    fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self> {
        let _length = reader.read_u16()?;
        let language = reader.read_u16()?;
        let first_code = reader.read_u16()?;
        let entry_count = usize::from(reader.read_u16()?);
        let glyph_ids = read_u16_array(reader, entry_count)?;

        Ok(Self {
            language,
            first_code,
            glyph_ids,
        })
    }

    pub fn glyph_index(&self, code: u32) -> Option<u32> {
        let index = code.checked_sub(u32::from(self.first_code))?;
        let glyph = *self.glyph_ids.get(usize::try_from(index).ok()?)?;
        non_missing(u32::from(glyph))
    }

    fn codepoints(&self) -> Vec<u32> {
        let first = u32::from(self.first_code);
        (first..first + self.glyph_ids.len() as u32)
            .filter(|&code| self.glyph_index(code).is_some())
            .collect()
    }
}

/// One sequential map group of a format 12 subtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

impl CodeRange for SequentialMapGroup {
    fn first(&self) -> u32 {
        self.start_char_code
    }

    fn last(&self) -> u32 {
        self.end_char_code
    }
}

/// Format 12, segmented coverage
#[derive(Debug, Clone)]
pub struct Format12 {
    language: u32,
    groups: Vec<SequentialMapGroup>,
}

impl Format12 {
    const GROUP_SIZE: usize = 12;

    /// Codes past the last Unicode scalar value are never listed
    const MAX_CODEPOINT: u32 = 0x10_FFFF;

    fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self> {
        let _reserved = reader.read_u16()?;
        let _length = reader.read_u32()?;
        let language = reader.read_u32()?;
        let num_groups = reader.read_u32()? as usize;

        // Bounds check the whole group array before allocating for it
        let raw_groups = reader.read_bytes(num_groups.saturating_mul(Self::GROUP_SIZE))?;
        let mut group_reader = VeroBufReader::from_buffer(raw_groups);
        let mut groups = Vec::with_capacity(num_groups);
        for _ in 0..num_groups {
            groups.push(SequentialMapGroup {
                start_char_code: group_reader.read_u32()?,
                end_char_code: group_reader.read_u32()?,
                start_glyph_id: group_reader.read_u32()?,
            });
        }

        if !is_sorted_and_disjoint(&groups) {
            log::warn!("cmap format 12 groups are not sorted or overlap, repairing them");
            repair_ranges(&mut groups);
        }

        Ok(Self { language, groups })
    }

    pub fn groups(&self) -> &[SequentialMapGroup] {
        &self.groups
    }

    pub fn glyph_index(&self, code: u32) -> Option<u32> {
        search_ranges(&self.groups, code, |group| {
            non_missing(group.start_glyph_id.checked_add(code - group.start_char_code)?)
        })
    }

    fn codepoints(&self) -> Vec<u32> {
        self.groups
            .iter()
            .flat_map(|group| group.start_char_code..=group.end_char_code.min(Self::MAX_CODEPOINT))
            .filter(|&code| self.glyph_index(code).is_some())
            .collect()
    }
}

fn read_u16_array(reader: &mut VeroBufReader<'_>, count: usize) -> Result<Vec<u16>> {
    let raw = reader.read_bytes(count * 2)?;
    Ok(raw
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// One parsed cmap subtable
#[derive(Debug, Clone)]
pub enum CmapSubtable {
    Format0(Format0),
    Format4(Format4),
    Format6(Format6),
    Format12(Format12),
    /// A format this reader does not understand, maps nothing
    Unsupported(u16),
    /// A subtable that could not be read, maps nothing
    Malformed,
}

impl CmapSubtable {
    /// Parses the subtable starting at the reader's position
    fn from_reader(reader: &mut VeroBufReader<'_>) -> Result<Self> {
        let format = reader.read_u16()?;

        Ok(match format {
            0 => Self::Format0(Format0::from_reader(reader)?),
            4 => Self::Format4(Format4::from_reader(reader)?),
            6 => Self::Format6(Format6::from_reader(reader)?),
            12 => Self::Format12(Format12::from_reader(reader)?),
            other => {
                log::warn!("unsupported cmap subtable format {other}");
                Self::Unsupported(other)
            }
        })
    }

    /// The subtable format, `None` for a malformed subtable
    pub fn format(&self) -> Option<u16> {
        match self {
            Self::Format0(_) => Some(0),
            Self::Format4(_) => Some(4),
            Self::Format6(_) => Some(6),
            Self::Format12(_) => Some(12),
            Self::Unsupported(format) => Some(*format),
            Self::Malformed => None,
        }
    }

    /// The Macintosh language code, 0 for language independent subtables
    pub fn language(&self) -> u32 {
        match self {
            Self::Format0(table) => u32::from(table.language),
            Self::Format4(table) => u32::from(table.language),
            Self::Format6(table) => u32::from(table.language),
            Self::Format12(table) => table.language,
            Self::Unsupported(_) | Self::Malformed => 0,
        }
    }

    /// Maps a character code to a glyph index, `None` when unmapped
    pub fn glyph_index(&self, code: u32) -> Option<u32> {
        match self {
            Self::Format0(table) => table.glyph_index(code),
            Self::Format4(table) => table.glyph_index(code),
            Self::Format6(table) => table.glyph_index(code),
            Self::Format12(table) => table.glyph_index(code),
            Self::Unsupported(_) | Self::Malformed => None,
        }
    }

    /// Every mapped character code in ascending order
    pub fn codepoints(&self) -> Vec<u32> {
        match self {
            Self::Format0(table) => table.codepoints(),
            Self::Format4(table) => table.codepoints(),
            Self::Format6(table) => table.codepoints(),
            Self::Format12(table) => table.codepoints(),
            Self::Unsupported(_) | Self::Malformed => Vec::new(),
        }
    }
}

/// An encoding record together with the subtable it points at
#[derive(Debug, Clone)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    /// Offset of the subtable from the start of the cmap table
    pub offset: u32,
    subtable: Arc<CmapSubtable>,
}

impl EncodingRecord {
    pub fn platform(&self) -> PlatformId {
        self.platform_id.into()
    }

    pub fn subtable(&self) -> &CmapSubtable {
        &self.subtable
    }
}

/// A representation of the [cmap table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cmap.html)
#[derive(Debug, Clone)]
pub struct CmapTable {
    /// The version of the cmap table
    /// it's almost guaranteed to be set to zero
    version: u16,

    /// The encoding records in file order
    records: Vec<EncodingRecord>,
}

impl CmapTable {
    /// Parses the cmap table described by `metadata` out of the font buffer
    pub fn parse(data: &[u8], metadata: &TableMetadata) -> Result<Self> {
        let table = VeroBufReader::from_buffer(data)
            .slice(metadata.offset as usize, metadata.length as usize)?;
        Self::from_buffer(table)
    }

    /// Parses a cmap table from its raw bytes
    pub fn from_buffer(table: &[u8]) -> Result<Self> {
        let mut reader = VeroBufReader::from_buffer(table);

        let version = reader.read_u16()?;
        if version != 0 {
            log::warn!("cmap table version {version}, expected 0");
        }

        let num_tables = reader.read_u16()?;

        // Several encoding records commonly share one subtable
        let mut parsed: BTreeMap<u32, Arc<CmapSubtable>> = BTreeMap::new();
        let mut records = Vec::with_capacity(usize::from(num_tables));

        for _ in 0..num_tables {
            let platform_id = reader.read_u16()?;
            let encoding_id = reader.read_u16()?;
            let offset = reader.read_u32()?;

            let subtable = match parsed.get(&offset) {
                Some(subtable) => Arc::clone(subtable),
                None => {
                    let mut subtable_reader = reader;
                    let subtable = subtable_reader
                        .seek_to(offset as usize)
                        .map_err(VeroGlyphsError::from)
                        .and_then(|()| CmapSubtable::from_reader(&mut subtable_reader))
                        .unwrap_or_else(|err| {
                            log::warn!(
                                "cmap subtable platform={platform_id} encoding={encoding_id} at offset {offset} is malformed: {err}"
                            );
                            CmapSubtable::Malformed
                        });

                    let subtable = Arc::new(subtable);
                    parsed.insert(offset, Arc::clone(&subtable));
                    subtable
                }
            };

            log::trace!(
                "cmap subtable platform={platform_id} encoding={encoding_id} format={:?}",
                subtable.format()
            );

            records.push(EncodingRecord {
                platform_id,
                encoding_id,
                offset,
                subtable,
            });
        }

        Ok(Self { version, records })
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Number of encoding records
    pub fn subtable_count(&self) -> u16 {
        self.records.len() as u16
    }

    pub fn records(&self) -> &[EncodingRecord] {
        &self.records
    }

    /// `(platform, encoding)` of every encoding record, in file order
    pub fn subtable_keys(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.records
            .iter()
            .map(|record| (record.platform_id, record.encoding_id))
    }

    /// The first subtable registered for `(platform_id, encoding_id)`
    pub fn subtable(&self, platform_id: u16, encoding_id: u16) -> Option<&CmapSubtable> {
        self.records
            .iter()
            .find(|record| record.platform_id == platform_id && record.encoding_id == encoding_id)
            .map(EncodingRecord::subtable)
    }

    /// The first subtable of `platform_id`, whatever its encoding
    pub fn subtable_for_platform(&self, platform_id: u16) -> Option<&CmapSubtable> {
        self.subtables_for_platform(platform_id).next()
    }

    /// Every subtable of `platform_id` in file order, whatever its encoding
    pub fn subtables_for_platform(&self, platform_id: u16) -> impl Iterator<Item = &CmapSubtable> + '_ {
        self.records
            .iter()
            .filter(move |record| record.platform_id == platform_id)
            .map(EncodingRecord::subtable)
    }

    pub fn has_subtable(&self, platform_id: u16, encoding_id: u16) -> bool {
        self.subtable(platform_id, encoding_id).is_some()
    }

    /// Maps `code` through the `(platform_id, encoding_id)` subtable.
    /// Returns `None` both for unmapped codes and missing subtables, use
    /// [`CmapTable::try_lookup`] to tell them apart.
    pub fn lookup(&self, platform_id: u16, encoding_id: u16, code: u32) -> Option<u32> {
        self.subtable(platform_id, encoding_id)?.glyph_index(code)
    }

    /// Like [`CmapTable::lookup`] but a missing subtable is an error
    pub fn try_lookup(&self, platform_id: u16, encoding_id: u16, code: u32) -> Result<Option<u32>> {
        let subtable = self.subtable(platform_id, encoding_id).ok_or(
            VeroGlyphsError::MissingCmapSubtable {
                platform_id,
                encoding_id,
            },
        )?;

        Ok(subtable.glyph_index(code))
    }
}
