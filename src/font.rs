//! The [`FontReader`] facade: owns the font bytes and answers metadata and
//! glyph name queries, parsing every table at most once.

use std::{path::Path, sync::OnceLock};

use crate::{
    Result,
    buffer::VeroBufReader,
    tables::{
        CollectionHeader, TableDirectory, TableMetadata, Tag,
        cmap::{CmapSubtable, CmapTable},
        head::Head,
        is_collection,
        maxp::Maxp,
        name::{Name, name_id},
        post::{PostGlyphNames, PostTable},
        table_checksum,
    },
};

/// Knobs for [`FontReader::from_bytes_with_options`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Recompute table checksums while opening, mismatches are only logged
    pub verify_checksums: bool,
    /// Which font of a collection to open, ignored for single fonts
    pub font_index: u32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            font_index: 0,
        }
    }
}

/// Selects cmap subtables during the fallback search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmapEncoding {
    /// Exactly this platform and encoding
    Exact { platform_id: u16, encoding_id: u16 },
    /// The first subtable of the platform, whatever its encoding
    AnyEncoding { platform_id: u16 },
}

/// The order in which [`FontReader::map_char_code_to_glyph_name`] tries
/// subtables: Windows Unicode BMP, Windows symbol, Unicode, Macintosh Roman.
pub const FALLBACK_ENCODINGS: [CmapEncoding; 4] = [
    CmapEncoding::Exact {
        platform_id: 3,
        encoding_id: 1,
    },
    CmapEncoding::Exact {
        platform_id: 3,
        encoding_id: 0,
    },
    CmapEncoding::AnyEncoding { platform_id: 0 },
    CmapEncoding::Exact {
        platform_id: 1,
        encoding_id: 0,
    },
];

/// Windows symbol fonts map their glyphs into the private use area
const SYMBOL_PRIVATE_USE_BASE: u32 = 0xF000;

/// The outcome of mapping a character code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGlyph {
    pub glyph_index: u32,
    /// `None` when the font does not name this glyph
    pub name: Option<String>,
}

/// One parsed font.
///
/// The table directory is parsed when the reader is created, every other table
/// is parsed on first use and memoized, failures included.
#[derive(Debug)]
pub struct FontReader {
    data: Vec<u8>,
    directory: TableDirectory,
    collection_member: bool,
    cmap: OnceLock<Result<CmapTable>>,
    post: OnceLock<Result<PostTable>>,
    name: OnceLock<Result<Name>>,
    head: OnceLock<Result<Head>>,
    maxp: OnceLock<Result<Maxp>>,
}

impl FontReader {
    /// Reads the file at `path` and opens the font in it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        log::debug!("read {} bytes from {}", data.len(), path.as_ref().display());

        Self::from_bytes(data)
    }

    /// Opens a font, or the first font of a collection, held in memory
    pub fn from_bytes<B: Into<Vec<u8>>>(data: B) -> Result<Self> {
        Self::from_bytes_with_options(data, OpenOptions::default())
    }

    pub fn from_bytes_with_options<B: Into<Vec<u8>>>(data: B, options: OpenOptions) -> Result<Self> {
        let data = data.into();

        let collection_member = is_collection(&data);
        let directory_offset = if collection_member {
            let header = CollectionHeader::from_reader(&mut VeroBufReader::from_buffer(&data))?;
            header.font_offset(options.font_index)?
        } else {
            0
        };

        let directory =
            TableDirectory::parse_at(&data, directory_offset as usize, options.verify_checksums)?;

        Ok(Self {
            data,
            directory,
            collection_member,
            cmap: OnceLock::new(),
            post: OnceLock::new(),
            name: OnceLock::new(),
            head: OnceLock::new(),
            maxp: OnceLock::new(),
        })
    }

    /// Number of fonts in `data`, 1 for anything that is not a collection
    pub fn num_fonts(data: &[u8]) -> Result<u32> {
        if !is_collection(data) {
            return Ok(1);
        }

        Ok(CollectionHeader::from_reader(&mut VeroBufReader::from_buffer(data))?.num_fonts())
    }

    /// The raw font bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn table_directory(&self) -> &TableDirectory {
        &self.directory
    }

    fn load<'a, T>(
        &'a self,
        cell: &'a OnceLock<Result<T>>,
        tag: Tag,
        parse: impl FnOnce(&[u8], &TableMetadata) -> Result<T>,
    ) -> Result<&'a T> {
        cell.get_or_init(|| {
            let metadata = self.directory.require(tag)?;
            log::debug!("parsing '{tag}' table");

            parse(&self.data, metadata).inspect_err(|err| {
                log::warn!("failed to parse '{tag}' table: {err}");
            })
        })
        .as_ref()
        .map_err(Clone::clone)
    }

    /// The character to glyph index mapping table
    pub fn cmap(&self) -> Result<&CmapTable> {
        self.load(&self.cmap, Tag::CMAP, CmapTable::parse)
    }

    /// The glyph name table. Unsupported versions fail with
    /// [`UnsupportedTableVersion`](crate::VeroGlyphsError::UnsupportedTableVersion), the glyph name queries
    /// of this reader treat that as a font without names.
    pub fn post(&self) -> Result<&PostTable> {
        self.load(&self.post, Tag::POST, |data, metadata| {
            let post = PostTable::parse(data, metadata)?;
            self.check_post_glyph_count(&post);
            Ok(post)
        })
    }

    pub fn name(&self) -> Result<&Name> {
        self.load(&self.name, Tag::NAME, Name::parse)
    }

    pub fn head(&self) -> Result<&Head> {
        self.load(&self.head, Tag::HEAD, Head::parse)
    }

    pub fn maxp(&self) -> Result<&Maxp> {
        self.load(&self.maxp, Tag::MAXP, Maxp::parse)
    }

    fn check_post_glyph_count(&self, post: &PostTable) {
        let (PostGlyphNames::Indexed { name_indices, .. }, Ok(maxp)) =
            (post.glyph_names(), self.maxp())
        else {
            return;
        };

        if name_indices.len() != usize::from(maxp.num_glyphs()) {
            log::warn!(
                "post names {} glyphs but maxp declares {}",
                name_indices.len(),
                maxp.num_glyphs()
            );
        }
    }

    /// The family name, from the English (US) Windows record when there is one
    pub fn font_family_name(&self) -> Result<String> {
        self.name()?.require(name_id::FAMILY)
    }

    pub fn full_name(&self) -> Result<String> {
        self.name()?.require(name_id::FULL_NAME)
    }

    pub fn postscript_name(&self) -> Result<String> {
        self.name()?.require(name_id::POSTSCRIPT_NAME)
    }

    /// The number of glyphs, as declared by `maxp`
    pub fn number_of_glyphs(&self) -> Result<u32> {
        Ok(u32::from(self.maxp()?.num_glyphs()))
    }

    pub fn units_per_em(&self) -> Result<u16> {
        Ok(self.head()?.units_per_em())
    }

    /// The name of a glyph, `None` when the font has no usable post table or
    /// does not name the glyph
    pub fn glyph_name(&self, glyph_index: u32) -> Option<String> {
        if let Ok(maxp) = self.maxp()
            && glyph_index >= u32::from(maxp.num_glyphs())
        {
            log::debug!("glyph {glyph_index} is past the {} glyphs of the font", maxp.num_glyphs());
            return None;
        }

        self.post().ok()?.name_for(glyph_index).map(str::to_owned)
    }

    fn resolved(&self, glyph_index: u32) -> ResolvedGlyph {
        ResolvedGlyph {
            glyph_index,
            name: self.glyph_name(glyph_index),
        }
    }

    /// Maps `code` through the `(platform_id, encoding_id)` subtable.
    ///
    /// A font without a cmap table or without that subtable is an error, an
    /// unmapped code is `Ok(None)`.
    pub fn resolve(&self, code: u32, platform_id: u16, encoding_id: u16) -> Result<Option<ResolvedGlyph>> {
        let glyph = self.cmap()?.try_lookup(platform_id, encoding_id, code)?;
        Ok(glyph.map(|glyph_index| self.resolved(glyph_index)))
    }

    /// Like [`FontReader::resolve`] but only the glyph name
    pub fn map_char_code_to_glyph_name_for(
        &self,
        code: u32,
        platform_id: u16,
        encoding_id: u16,
    ) -> Result<Option<String>> {
        Ok(self
            .resolve(code, platform_id, encoding_id)?
            .and_then(|glyph| glyph.name))
    }

    /// Glyphs `code` maps to in each subtable of [`FALLBACK_ENCODINGS`]
    /// that exists, in priority order. Each [`CmapEncoding::AnyEncoding`] step
    /// consults every subtable of its platform in file order.
    fn fallback_glyphs(&self, code: u32) -> impl Iterator<Item = u32> + '_ {
        let cmap = self.cmap().ok();

        FALLBACK_ENCODINGS.into_iter().flat_map(move |encoding| {
            let subtables: Vec<&CmapSubtable> = match (cmap, encoding) {
                (None, _) => Vec::new(),
                (
                    Some(cmap),
                    CmapEncoding::Exact {
                        platform_id,
                        encoding_id,
                    },
                ) => cmap.subtable(platform_id, encoding_id).into_iter().collect(),
                (Some(cmap), CmapEncoding::AnyEncoding { platform_id }) => {
                    cmap.subtables_for_platform(platform_id).collect()
                }
            };

            subtables.into_iter().filter_map(move |subtable| {
                let glyph = subtable.glyph_index(code).or_else(|| match encoding {
                    CmapEncoding::Exact {
                        platform_id: 3,
                        encoding_id: 0,
                    } if code < 0x100 => subtable.glyph_index(SYMBOL_PRIVATE_USE_BASE | code),
                    _ => None,
                });

                log::debug!("code {code:#x} via {encoding:?}: {glyph:?}");
                glyph
            })
        })
    }

    /// Maps `code` to a glyph name trying the subtables of
    /// [`FALLBACK_ENCODINGS`] in order, the first name found wins
    pub fn map_char_code_to_glyph_name(&self, code: u32) -> Option<String> {
        self.fallback_glyphs(code)
            .find_map(|glyph_index| self.glyph_name(glyph_index))
    }

    /// The first glyph `code` maps to in the subtables of [`FALLBACK_ENCODINGS`]
    pub fn resolve_any(&self, code: u32) -> Option<ResolvedGlyph> {
        self.fallback_glyphs(code)
            .next()
            .map(|glyph_index| self.resolved(glyph_index))
    }

    /// Checks `head.checkSumAdjustment` against the whole font.
    ///
    /// `None` for collection members, which share tables and have no single
    /// font file to sum, and when there is no usable head table.
    pub fn verify_checksum_adjustment(&self) -> Option<bool> {
        if self.collection_member {
            return None;
        }

        let metadata = self.directory.get(Tag::HEAD)?;
        if metadata.offset % 4 != 0 {
            return None;
        }

        let head = self.head().ok()?;
        let sum = table_checksum(&self.data).wrapping_sub(head.checksum_adjustment());

        Some(Head::CHECKSUM_MAGIC.wrapping_sub(sum) == head.checksum_adjustment())
    }
}
