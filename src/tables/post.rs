//! [post table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6post.html),
//! PostScript glyph names.

use crate::{Result, VeroGlyphsError, buffer::VeroBufReader};

use super::{TableMetadata, Tag};

/// Number of names in the standard Macintosh glyph set
pub const NUM_STANDARD_NAMES: usize = 258;

/// The standard Macintosh glyph names, in glyph order.
/// Format 1.0 tables use it as is, format 2.0 tables index into it.
#[rustfmt::skip]
pub const STANDARD_MAC_GLYPH_NAMES: [&str; NUM_STANDARD_NAMES] = [
    ".notdef", ".null", "nonmarkingreturn", "space", "exclam", "quotedbl",
    "numbersign", "dollar", "percent", "ampersand", "quotesingle", "parenleft",
    "parenright", "asterisk", "plus", "comma", "hyphen", "period", "slash",
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight",
    "nine", "colon", "semicolon", "less", "equal", "greater", "question", "at",
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O",
    "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft",
    "backslash", "bracketright", "asciicircum", "underscore", "grave",
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o",
    "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar",
    "braceright", "asciitilde", "Adieresis", "Aring", "Ccedilla", "Eacute",
    "Ntilde", "Odieresis", "Udieresis", "aacute", "agrave", "acircumflex",
    "adieresis", "atilde", "aring", "ccedilla", "eacute", "egrave",
    "ecircumflex", "edieresis", "iacute", "igrave", "icircumflex", "idieresis",
    "ntilde", "oacute", "ograve", "ocircumflex", "odieresis", "otilde",
    "uacute", "ugrave", "ucircumflex", "udieresis", "dagger", "degree", "cent",
    "sterling", "section", "bullet", "paragraph", "germandbls", "registered",
    "copyright", "trademark", "acute", "dieresis", "notequal", "AE", "Oslash",
    "infinity", "plusminus", "lessequal", "greaterequal", "yen", "mu",
    "partialdiff", "summation", "product", "pi", "integral", "ordfeminine",
    "ordmasculine", "Omega", "ae", "oslash", "questiondown", "exclamdown",
    "logicalnot", "radical", "florin", "approxequal", "Delta", "guillemotleft",
    "guillemotright", "ellipsis", "nonbreakingspace", "Agrave", "Atilde",
    "Otilde", "OE", "oe", "endash", "emdash", "quotedblleft", "quotedblright",
    "quoteleft", "quoteright", "divide", "lozenge", "ydieresis", "Ydieresis",
    "fraction", "currency", "guilsinglleft", "guilsinglright", "fi", "fl",
    "daggerdbl", "periodcentered", "quotesinglbase", "quotedblbase",
    "perthousand", "Acircumflex", "Ecircumflex", "Aacute", "Edieresis",
    "Egrave", "Iacute", "Icircumflex", "Idieresis", "Igrave", "Oacute",
    "Ocircumflex", "apple", "Ograve", "Uacute", "Ucircumflex", "Ugrave",
    "dotlessi", "circumflex", "tilde", "macron", "breve", "dotaccent", "ring",
    "cedilla", "hungarumlaut", "ogonek", "caron", "Lslash", "lslash", "Scaron",
    "scaron", "Zcaron", "zcaron", "brokenbar", "Eth", "eth", "Yacute",
    "yacute", "Thorn", "thorn", "minus", "multiply", "onesuperior",
    "twosuperior", "threesuperior", "onehalf", "onequarter", "threequarters",
    "franc", "Gbreve", "gbreve", "Idotaccent", "Scedilla", "scedilla",
    "Cacute", "cacute", "Ccaron", "ccaron", "dcroat",
];

/// The fixed point versions of the post table
pub mod version {
    pub const VERSION_1_0: u32 = 0x0001_0000;
    pub const VERSION_2_0: u32 = 0x0002_0000;
    pub const VERSION_3_0: u32 = 0x0003_0000;
}

/// Where the glyph names of a post table come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostGlyphNames {
    /// Version 1.0, glyph `n` is named `STANDARD_MAC_GLYPH_NAMES[n]`
    Standard,
    /// Version 2.0, every glyph has an index into the standard names
    /// followed by the custom names stored in the table
    Indexed {
        name_indices: Vec<u16>,
        custom_names: Vec<String>,
    },
    /// Version 3.0, the font carries no glyph names
    Unavailable,
}

/// A representation of the [post table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6post.html)
#[derive(Debug, Clone)]
pub struct PostTable {
    /// Fixed point version, 0x00020000 is 2.0
    version: u32,

    /// Italic angle in counter-clockwise degrees from the vertical, 16.16 fixed
    italic_angle: i32,

    /// Suggested distance of the top of the underline from the baseline
    underline_position: i16,

    /// Suggested thickness of the underline
    underline_thickness: i16,

    /// Non zero when the font is monospaced
    is_fixed_pitch: u32,

    names: PostGlyphNames,
}

impl PostTable {
    /// Size of the header shared by all versions
    pub const HEADER_SIZE: usize = 32;

    /// Parses the post table described by `metadata` out of the font buffer
    pub fn parse(data: &[u8], metadata: &TableMetadata) -> Result<Self> {
        let table = VeroBufReader::from_buffer(data)
            .slice(metadata.offset as usize, metadata.length as usize)?;
        Self::from_buffer(table)
    }

    /// Parses a post table from its raw bytes.
    ///
    /// Versions other than 1.0, 2.0 and 3.0 fail with
    /// [`VeroGlyphsError::UnsupportedTableVersion`].
    pub fn from_buffer(table: &[u8]) -> Result<Self> {
        let mut reader = VeroBufReader::from_buffer(table);

        let version = reader.read_u32()?;
        let italic_angle = reader.read_i32()?;
        let underline_position = reader.read_i16()?;
        let underline_thickness = reader.read_i16()?;
        let is_fixed_pitch = reader.read_u32()?;
        // memory usage hints for PostScript printers
        reader.skip(16)?;

        let names = match version {
            version::VERSION_1_0 => PostGlyphNames::Standard,
            version::VERSION_2_0 => Self::read_indexed_names(&mut reader)?,
            version::VERSION_3_0 => PostGlyphNames::Unavailable,
            other => {
                return Err(VeroGlyphsError::UnsupportedTableVersion {
                    tag: Tag::POST,
                    version: other,
                });
            }
        };

        Ok(Self {
            version,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            names,
        })
    }

    fn read_indexed_names(reader: &mut VeroBufReader<'_>) -> Result<PostGlyphNames> {
        let num_glyphs = reader.read_u16()?;
        let name_indices = (0..num_glyphs)
            .map(|_| reader.read_u16())
            .collect::<Result<Vec<_>, _>>()?;

        // Pascal strings until the table ends, there can't be more custom
        // names than glyphs.
        let mut custom_names = Vec::new();
        while reader.remaining() > 0 && custom_names.len() < usize::from(num_glyphs) {
            let length = usize::from(reader.read_u8()?);
            let Ok(bytes) = reader.read_bytes(length) else {
                log::warn!(
                    "post string pool truncated after {} names",
                    custom_names.len()
                );
                break;
            };

            custom_names.push(String::from_utf8_lossy(bytes).into_owned());
        }

        Ok(PostGlyphNames::Indexed {
            name_indices,
            custom_names,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Italic angle in degrees
    pub fn italic_angle(&self) -> f32 {
        self.italic_angle as f32 / 65536.0
    }

    pub fn underline_position(&self) -> i16 {
        self.underline_position
    }

    pub fn underline_thickness(&self) -> i16 {
        self.underline_thickness
    }

    pub fn is_fixed_pitch(&self) -> bool {
        self.is_fixed_pitch != 0
    }

    pub fn glyph_names(&self) -> &PostGlyphNames {
        &self.names
    }

    /// Number of glyphs this table can name
    pub fn num_names(&self) -> usize {
        match &self.names {
            PostGlyphNames::Standard => NUM_STANDARD_NAMES,
            PostGlyphNames::Indexed { name_indices, .. } => name_indices.len(),
            PostGlyphNames::Unavailable => 0,
        }
    }

    /// The name of `glyph_index`, `None` when the table does not name it
    pub fn name_for(&self, glyph_index: u32) -> Option<&str> {
        let glyph_index = usize::try_from(glyph_index).ok()?;

        match &self.names {
            PostGlyphNames::Standard => STANDARD_MAC_GLYPH_NAMES.get(glyph_index).copied(),
            PostGlyphNames::Indexed {
                name_indices,
                custom_names,
            } => {
                let name_index = usize::from(*name_indices.get(glyph_index)?);
                match name_index.checked_sub(NUM_STANDARD_NAMES) {
                    None => Some(STANDARD_MAC_GLYPH_NAMES[name_index]),
                    Some(custom) => custom_names.get(custom).map(String::as_str),
                }
            }
            PostGlyphNames::Unavailable => None,
        }
    }

    /// The first glyph named `name`
    pub fn glyph_index_for_name(&self, name: &str) -> Option<u32> {
        (0..self.num_names() as u32).find(|&glyph| self.name_for(glyph) == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(&(-12i32 * 65536).to_be_bytes());
        out.extend_from_slice(&(-75i16).to_be_bytes());
        out.extend_from_slice(&50i16.to_be_bytes());
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&[0; 16]);
        out
    }

    fn version2(indices: &[u16], names: &[&str]) -> Vec<u8> {
        let mut out = header(version::VERSION_2_0);
        out.extend_from_slice(&(indices.len() as u16).to_be_bytes());
        for index in indices {
            out.extend_from_slice(&index.to_be_bytes());
        }
        for name in names {
            out.push(name.len() as u8);
            out.extend_from_slice(name.as_bytes());
        }
        out
    }

    #[test]
    fn standard_names() {
        assert_eq!(STANDARD_MAC_GLYPH_NAMES[0], ".notdef");
        assert_eq!(STANDARD_MAC_GLYPH_NAMES[3], "space");
        assert_eq!(STANDARD_MAC_GLYPH_NAMES[36], "A");
        assert_eq!(STANDARD_MAC_GLYPH_NAMES[192], "fi");
        assert_eq!(STANDARD_MAC_GLYPH_NAMES[257], "dcroat");
    }

    #[test]
    fn version1() {
        let post = PostTable::from_buffer(&header(version::VERSION_1_0)).unwrap();

        assert_eq!(post.name_for(0), Some(".notdef"));
        assert_eq!(post.name_for(36), Some("A"));
        assert_eq!(post.name_for(258), None);
        assert_eq!(post.num_names(), 258);
        assert_eq!(post.italic_angle(), -12.0);
        assert_eq!(post.underline_position(), -75);
        assert_eq!(post.underline_thickness(), 50);
        assert!(post.is_fixed_pitch());
    }

    #[test]
    fn version2_standard_and_custom() {
        let table = version2(&[0, 3, 258, 259, 36, 300], &["fi", "mu1"]);
        let post = PostTable::from_buffer(&table).unwrap();

        assert_eq!(post.name_for(0), Some(".notdef"));
        assert_eq!(post.name_for(1), Some("space"));
        assert_eq!(post.name_for(2), Some("fi"));
        assert_eq!(post.name_for(3), Some("mu1"));
        assert_eq!(post.name_for(4), Some("A"));
        // points past the pool
        assert_eq!(post.name_for(5), None);
        assert_eq!(post.name_for(6), None);
        assert_eq!(post.glyph_index_for_name("mu1"), Some(3));
        assert_eq!(post.glyph_index_for_name("B"), None);
    }

    #[test]
    fn version2_standard_indices_match_version1() {
        let indices: Vec<u16> = (0..258).collect();
        let v2 = PostTable::from_buffer(&version2(&indices, &[])).unwrap();
        let v1 = PostTable::from_buffer(&header(version::VERSION_1_0)).unwrap();

        for glyph in 0..258 {
            assert_eq!(v2.name_for(glyph), v1.name_for(glyph));
        }
    }

    #[test]
    fn version2_truncated_pool_keeps_complete_names() {
        let mut table = version2(&[258, 259], &["alpha"]);
        table.push(10);
        table.extend_from_slice(b"bet");

        let post = PostTable::from_buffer(&table).unwrap();
        assert_eq!(post.name_for(0), Some("alpha"));
        assert_eq!(post.name_for(1), None);
    }

    #[test]
    fn version2_truncated_indices_is_an_error() {
        let table = version2(&[1, 2, 3], &[]);
        assert!(PostTable::from_buffer(&table[..table.len() - 1]).is_err());
    }

    #[test]
    fn version3_has_no_names() {
        let post = PostTable::from_buffer(&header(version::VERSION_3_0)).unwrap();
        assert_eq!(post.name_for(0), None);
        assert_eq!(post.glyph_names(), &PostGlyphNames::Unavailable);
    }

    #[test]
    fn unsupported_version() {
        assert!(matches!(
            PostTable::from_buffer(&header(0x0002_5000)),
            Err(VeroGlyphsError::UnsupportedTableVersion {
                version: 0x0002_5000,
                ..
            })
        ));
    }
}
