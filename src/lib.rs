use std::sync::Arc;

use buffer::VeroBufReaderError;
use tables::{TableEncodingError, Tag};
use thiserror::Error;

pub mod buffer;
pub mod font;
pub mod tables;

pub use font::{CmapEncoding, FALLBACK_ENCODINGS, FontReader, OpenOptions, ResolvedGlyph};

pub type Result<T, E = VeroGlyphsError> = std::result::Result<T, E>;

/// Every error the reader can report.
///
/// `TableEncodingError` and `VeroBufReaderError` mean the font container
/// itself is malformed (bad header, table outside the buffer, truncated read).
/// The other variants only fail the operation that needed the missing piece.
#[derive(Debug, Error, Clone)]
pub enum VeroGlyphsError {
    #[error(transparent)]
    TableEncodingError(#[from] TableEncodingError),

    #[error(transparent)]
    VeroBufReaderError(#[from] VeroBufReaderError),

    #[error("The font has no '{0}' table")]
    MissingTable(Tag),

    #[error("The cmap table has no subtable for platform {platform_id}, encoding {encoding_id}")]
    MissingCmapSubtable { platform_id: u16, encoding_id: u16 },

    #[error("The name table has no usable record for name id {name_id}")]
    MissingNameRecord { name_id: u16 },

    #[error("Unsupported version 0x{version:08x} of the '{tag}' table")]
    UnsupportedTableVersion { tag: Tag, version: u32 },

    #[error("Failed to read font file: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for VeroGlyphsError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl VeroGlyphsError {
    /// True for errors that make the whole font unreadable
    pub fn is_malformed_container(&self) -> bool {
        matches!(
            self,
            Self::TableEncodingError(_) | Self::VeroBufReaderError(_)
        )
    }

    /// True when the error comes from a table the font does not have
    pub fn is_missing_table(&self) -> bool {
        matches!(self, Self::MissingTable(_))
    }
}
