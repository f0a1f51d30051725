use crate::{Result, buffer::VeroBufReader};

use super::TableMetadata;

/// Represents the flags field of the 'head' table.
/// Each field corresponds to a specific bit in the 16-bit flags value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadFlags {
    /// Bit 0: a Y coordinate of 0 corresponds to the font's baseline.
    pub y_value_zero_is_baseline: bool,
    /// Bit 1: the x position of the leftmost black bit is the left side bearing.
    pub x_pos_leftmost_black_bit_lsb: bool,
    /// Bit 2: scaled point size and actual point size will differ.
    pub scaled_point_size_differs: bool,
    /// Bit 3: use integer scaling instead of fractional.
    pub use_integer_scaling: bool,
    /// Bit 5: the font is intended to be laid out vertically.
    pub vertical_layout: bool,
    /// Bit 7: the font requires layout for correct linguistic rendering.
    pub requires_linguistic_layout: bool,
    /// Bit 9: the font contains strong right-to-left glyphs.
    pub strong_rtl_glyphs: bool,
    /// Bit 11: font data is lossless compressed.
    pub lossless_font_data: bool,
    /// Bit 14: glyphs are generic symbols for code point ranges (last resort font).
    pub generic_symbol_font: bool,
    /// The raw 16 bits
    pub bits: u16,
}

impl HeadFlags {
    pub fn from_bits(bits: u16) -> Self {
        let bit = |n: u16| bits & (1 << n) != 0;

        HeadFlags {
            y_value_zero_is_baseline: bit(0),
            x_pos_leftmost_black_bit_lsb: bit(1),
            scaled_point_size_differs: bit(2),
            use_integer_scaling: bit(3),
            vertical_layout: bit(5),
            requires_linguistic_layout: bit(7),
            strong_rtl_glyphs: bit(9),
            lossless_font_data: bit(11),
            generic_symbol_font: bit(14),
            bits,
        }
    }
}

/// A representation of the [head table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6head.html)
#[derive(Debug, Clone)]
pub struct Head {
    /// The version of the head table
    /// it's almost guaranteed to be set to version 0x00010000
    version: u32,

    /// Font revision set by the font author/manufacturer
    font_revision: u32,

    /// Check sum adjustment
    /// To compute: set it to 0, calculate the checksum for the 'head'
    /// table and put it in the table directory,
    /// sum the entire font as a uint32_t,
    /// then store 0xB1B0AFBA - sum.
    checksum_adjustment: u32,

    /// Magic number, always set to 0x5F0F3CF5
    magic_number: u32,

    flags: HeadFlags,

    /// Units per em (ranges from 16 to 16384)
    units_per_em: u16,

    /// Seconds since 1904-01-01 00:00 UTC
    created: i64,
    modified: i64,

    x_min: i16,
    y_min: i16,
    x_max: i16,
    y_max: i16,

    mac_style: u16,

    /// Smallest readable size in pixel
    lowest_rec_ppem: u16,

    font_direction_hint: i16,

    /// Index to loc format, 0 for short offsets and 1 for long
    index_to_loc_format: i16,

    /// Glyph data format (0 is for the current format)
    glyph_data_format: i16,
}

impl Head {
    pub const MAGIC_NUMBER: u32 = 0x5F0F_3CF5;

    /// The value the checksum of the whole font plus `checksum_adjustment`
    /// must add up to
    pub const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

    /// Offset of the `checkSumAdjustment` field from the start of the table
    pub const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

    /// Parses the head table described by `metadata` out of the font buffer
    pub fn parse(data: &[u8], metadata: &TableMetadata) -> Result<Self> {
        let table = VeroBufReader::from_buffer(data)
            .slice(metadata.offset as usize, metadata.length as usize)?;
        Self::from_buffer(table)
    }

    pub fn from_buffer(table: &[u8]) -> Result<Self> {
        let mut reader = VeroBufReader::from_buffer(table);

        let head = Self {
            version: reader.read_u32()?,
            font_revision: reader.read_u32()?,
            checksum_adjustment: reader.read_u32()?,
            magic_number: reader.read_u32()?,
            flags: HeadFlags::from_bits(reader.read_u16()?),
            units_per_em: reader.read_u16()?,
            created: reader.read_i64()?,
            modified: reader.read_i64()?,
            x_min: reader.read_i16()?,
            y_min: reader.read_i16()?,
            x_max: reader.read_i16()?,
            y_max: reader.read_i16()?,
            mac_style: reader.read_u16()?,
            lowest_rec_ppem: reader.read_u16()?,
            font_direction_hint: reader.read_i16()?,
            index_to_loc_format: reader.read_i16()?,
            glyph_data_format: reader.read_i16()?,
        };

        if head.magic_number != Self::MAGIC_NUMBER {
            log::warn!(
                "head magic number is 0x{:08x}, expected 0x{:08x}",
                head.magic_number,
                Self::MAGIC_NUMBER
            );
        }

        Ok(head)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Font revision as a 16.16 fixed point number
    pub fn font_revision(&self) -> u32 {
        self.font_revision
    }

    pub fn checksum_adjustment(&self) -> u32 {
        self.checksum_adjustment
    }

    pub fn magic_number(&self) -> u32 {
        self.magic_number
    }

    pub fn flags(&self) -> HeadFlags {
        self.flags
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn modified(&self) -> i64 {
        self.modified
    }

    /// `(x_min, y_min, x_max, y_max)` over all glyph bounding boxes
    pub fn bounding_box(&self) -> (i16, i16, i16, i16) {
        (self.x_min, self.y_min, self.x_max, self.y_max)
    }

    pub fn mac_style(&self) -> u16 {
        self.mac_style
    }

    pub fn lowest_rec_ppem(&self) -> u16 {
        self.lowest_rec_ppem
    }

    pub fn font_direction_hint(&self) -> i16 {
        self.font_direction_hint
    }

    pub fn index_to_loc_format(&self) -> i16 {
        self.index_to_loc_format
    }

    pub fn glyph_data_format(&self) -> i16 {
        self.glyph_data_format
    }
}
