use crate::{Result, VeroGlyphsError, buffer::VeroBufReader};

use super::{TableMetadata, Tag};

/// Limits only present in version 1.0 tables (TrueType outlines)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrueTypeLimits {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

/// A representation of the [maxp table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6maxp.html)
#[derive(Debug, Clone)]
pub struct Maxp {
    /// 0x00005000 for CFF fonts, 0x00010000 for TrueType fonts
    version: u32,
    num_glyphs: u16,
    limits: Option<TrueTypeLimits>,
}

impl Maxp {
    pub const VERSION_0_5: u32 = 0x0000_5000;
    pub const VERSION_1_0: u32 = 0x0001_0000;

    /// Parses the maxp table described by `metadata` out of the font buffer
    pub fn parse(data: &[u8], metadata: &TableMetadata) -> Result<Self> {
        let table = VeroBufReader::from_buffer(data)
            .slice(metadata.offset as usize, metadata.length as usize)?;
        Self::from_buffer(table)
    }

    pub fn from_buffer(table: &[u8]) -> Result<Self> {
        let mut reader = VeroBufReader::from_buffer(table);

        let version = reader.read_u32()?;
        let num_glyphs = reader.read_u16()?;

        let limits = match version {
            Self::VERSION_0_5 => None,
            Self::VERSION_1_0 => Some(TrueTypeLimits {
                max_points: reader.read_u16()?,
                max_contours: reader.read_u16()?,
                max_composite_points: reader.read_u16()?,
                max_composite_contours: reader.read_u16()?,
                max_zones: reader.read_u16()?,
                max_twilight_points: reader.read_u16()?,
                max_storage: reader.read_u16()?,
                max_function_defs: reader.read_u16()?,
                max_instruction_defs: reader.read_u16()?,
                max_stack_elements: reader.read_u16()?,
                max_size_of_instructions: reader.read_u16()?,
                max_component_elements: reader.read_u16()?,
                max_component_depth: reader.read_u16()?,
            }),
            other => {
                return Err(VeroGlyphsError::UnsupportedTableVersion {
                    tag: Tag::MAXP,
                    version: other,
                });
            }
        };

        Ok(Self {
            version,
            num_glyphs,
            limits,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The number of glyphs in the font
    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    pub fn limits(&self) -> Option<&TrueTypeLimits> {
        self.limits.as_ref()
    }
}
