//! Builders for synthetic fonts used by the integration tests.

#![allow(dead_code)]

use vero_glyphs::tables::{expected_checksum, table_checksum, Tag};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn push16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Assembles an sfnt from raw tables. Tables are written in tag order, each
/// padded to 4 bytes except the last so that the font ends exactly where its
/// last table does.
#[derive(Default)]
pub struct FontBuilder {
    tables: Vec<([u8; 4], Vec<u8>)>,
    corrupt_checksums: Vec<[u8; 4]>,
}

impl FontBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, tag: &[u8; 4], data: Vec<u8>) -> Self {
        self.tables.retain(|(existing, _)| existing != tag);
        self.tables.push((*tag, data));
        self
    }

    /// Writes a wrong checksum into the record of `tag`
    pub fn corrupt_checksum(mut self, tag: &[u8; 4]) -> Self {
        self.corrupt_checksums.push(*tag);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_at(0)
    }

    /// Builds the font as if its offset table started `base` bytes into a
    /// larger file, table offsets include `base`
    pub fn build_at(&self, base: usize) -> Vec<u8> {
        let mut tables = self.tables.clone();
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Vec::new();
        push32(&mut out, 0x0001_0000);
        push16(&mut out, tables.len() as u16);
        push16(&mut out, 0);
        push16(&mut out, 0);
        push16(&mut out, 0);

        let mut offset = base + 12 + 16 * tables.len();
        let mut body = Vec::new();
        for (index, (tag, data)) in tables.iter().enumerate() {
            let mut checksum = expected_checksum(Tag::new(tag), data);
            if self.corrupt_checksums.contains(tag) {
                checksum = checksum.wrapping_add(1);
            }

            out.extend_from_slice(tag);
            push32(&mut out, checksum);
            push32(&mut out, offset as u32);
            push32(&mut out, data.len() as u32);

            body.extend_from_slice(data);
            offset += data.len();
            if index + 1 < tables.len() {
                let padding = (4 - data.len() % 4) % 4;
                body.extend(std::iter::repeat_n(0, padding));
                offset += padding;
            }
        }
        out.extend_from_slice(&body);

        if base == 0 {
            set_checksum_adjustment(&mut out, &tables);
        }
        out
    }
}

fn set_checksum_adjustment(font: &mut [u8], tables: &[([u8; 4], Vec<u8>)]) {
    let Some(index) = tables.iter().position(|(tag, _)| tag == b"head") else {
        return;
    };

    let record = 12 + 16 * index;
    let offset = u32::from_be_bytes(font[record + 8..record + 12].try_into().unwrap()) as usize;
    let adjustment = 0xB1B0_AFBAu32.wrapping_sub(table_checksum(font));
    font[offset + 8..offset + 12].copy_from_slice(&adjustment.to_be_bytes());
}

/// Wraps fonts built with [`FontBuilder::build_at`] into a `ttcf` collection
pub fn collection(fonts: &[FontBuilder]) -> Vec<u8> {
    let header_size = 12 + 4 * fonts.len();
    let mut offsets = Vec::new();
    let mut body = Vec::new();
    for font in fonts {
        let offset = header_size + body.len();
        offsets.push(offset as u32);
        let mut bytes = font.build_at(offset);
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        body.extend_from_slice(&bytes);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"ttcf");
    push16(&mut out, 1);
    push16(&mut out, 0);
    push32(&mut out, fonts.len() as u32);
    for offset in offsets {
        push32(&mut out, offset);
    }
    out.extend_from_slice(&body);
    out
}

pub fn head(units_per_em: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push32(&mut out, 0x0001_0000);
    push32(&mut out, 0x0001_0000);
    push32(&mut out, 0);
    push32(&mut out, 0x5F0F_3CF5);
    push16(&mut out, 0b1011);
    push16(&mut out, units_per_em);
    out.extend_from_slice(&[0; 16]);
    for value in [-50i16, -200, 1000, 800] {
        out.extend_from_slice(&value.to_be_bytes());
    }
    push16(&mut out, 0);
    push16(&mut out, 8);
    push16(&mut out, 2);
    push16(&mut out, 0);
    push16(&mut out, 0);
    out
}

pub fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push32(&mut out, 0x0000_5000);
    push16(&mut out, num_glyphs);
    out
}

/// A name table holding English (US) Windows records and Macintosh Roman
/// records, `(name id, text)` each
pub fn name(windows: &[(u16, &str)], macintosh: &[(u16, &str)]) -> Vec<u8> {
    let mut records = Vec::new();
    let mut storage = Vec::new();
    for (name_id, text) in windows {
        let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        records.push((3u16, 1u16, 0x0409u16, *name_id, bytes.len(), storage.len()));
        storage.extend_from_slice(&bytes);
    }
    for (name_id, text) in macintosh {
        records.push((1, 0, 0, *name_id, text.len(), storage.len()));
        storage.extend_from_slice(text.as_bytes());
    }

    let mut out = Vec::new();
    push16(&mut out, 0);
    push16(&mut out, records.len() as u16);
    push16(&mut out, (6 + 12 * records.len()) as u16);
    for (platform, encoding, language, name_id, length, offset) in records {
        for value in [platform, encoding, language, name_id, length as u16, offset as u16] {
            push16(&mut out, value);
        }
    }
    out.extend_from_slice(&storage);
    out
}

fn post_header(version: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push32(&mut out, version);
    push32(&mut out, 0);
    out.extend_from_slice(&(-100i16).to_be_bytes());
    push16(&mut out, 50);
    push32(&mut out, 0);
    out.extend_from_slice(&[0; 16]);
    out
}

pub fn post_v1() -> Vec<u8> {
    post_header(0x0001_0000)
}

pub fn post_v3() -> Vec<u8> {
    post_header(0x0003_0000)
}

pub fn post_with_version(version: u32) -> Vec<u8> {
    post_header(version)
}

/// A version 2.0 post table naming every glyph. Standard names are referenced
/// by their index, anything else goes to the custom pool.
pub fn post_v2(names: &[&str]) -> Vec<u8> {
    let standard = &vero_glyphs::tables::post::STANDARD_MAC_GLYPH_NAMES;

    let mut out = post_header(0x0002_0000);
    push16(&mut out, names.len() as u16);

    let mut pool: Vec<&str> = Vec::new();
    for &name in names {
        let index = match standard.iter().position(|&standard| standard == name) {
            Some(index) => index,
            None => match pool.iter().position(|&custom| custom == name) {
                Some(index) => 258 + index,
                None => {
                    pool.push(name);
                    258 + pool.len() - 1
                }
            },
        };
        push16(&mut out, index as u16);
    }
    for name in pool {
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
    }
    out
}

/// A cmap subtable in format 4. Consecutive codes mapping to consecutive
/// glyphs share a delta segment, when `use_glyph_array` is set every
/// segment goes through the glyph id array instead.
pub fn cmap_format4(mapping: &[(u16, u16)], use_glyph_array: bool) -> Vec<u8> {
    let mut mapping = mapping.to_vec();
    mapping.sort();

    // (start, end, first glyph)
    let mut runs: Vec<(u16, u16, Vec<u16>)> = Vec::new();
    for (code, glyph) in mapping {
        match runs.last_mut() {
            Some((_, end, glyphs))
                if *end + 1 == code && (use_glyph_array || glyphs[glyphs.len() - 1] + 1 == glyph) =>
            {
                *end = code;
                glyphs.push(glyph);
            }
            _ => runs.push((code, code, vec![glyph])),
        }
    }
    runs.push((0xFFFF, 0xFFFF, vec![0]));

    let seg_count = runs.len();
    let mut deltas = Vec::new();
    let mut range_offsets = Vec::new();
    let mut glyph_array: Vec<u16> = Vec::new();
    for (index, (start, _, glyphs)) in runs.iter().enumerate() {
        if *start == 0xFFFF {
            deltas.push(1u16);
            range_offsets.push(0u16);
        } else if use_glyph_array {
            deltas.push(0);
            range_offsets.push(((seg_count - index + glyph_array.len()) * 2) as u16);
            glyph_array.extend(glyphs);
        } else {
            deltas.push(glyphs[0].wrapping_sub(*start));
            range_offsets.push(0);
        }
    }

    let mut out = Vec::new();
    push16(&mut out, 4);
    push16(&mut out, (16 + 8 * seg_count + 2 * glyph_array.len()) as u16);
    push16(&mut out, 0);
    push16(&mut out, (seg_count * 2) as u16);
    push16(&mut out, 0);
    push16(&mut out, 0);
    push16(&mut out, 0);
    runs.iter().for_each(|(_, end, _)| push16(&mut out, *end));
    push16(&mut out, 0);
    runs.iter().for_each(|(start, _, _)| push16(&mut out, *start));
    deltas.iter().for_each(|delta| push16(&mut out, *delta));
    range_offsets.iter().for_each(|offset| push16(&mut out, *offset));
    glyph_array.iter().for_each(|glyph| push16(&mut out, *glyph));
    out
}

/// A cmap subtable in format 0
pub fn cmap_format0(mapping: &[(u8, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    push16(&mut out, 0);
    push16(&mut out, 262);
    push16(&mut out, 0);
    let mut glyphs = [0u8; 256];
    for (code, glyph) in mapping {
        glyphs[usize::from(*code)] = *glyph;
    }
    out.extend_from_slice(&glyphs);
    out
}

/// A cmap subtable in format 12 from `(start, end, start glyph)` groups
pub fn cmap_format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    push16(&mut out, 12);
    push16(&mut out, 0);
    push32(&mut out, (16 + 12 * groups.len()) as u32);
    push32(&mut out, 0);
    push32(&mut out, groups.len() as u32);
    for (start, end, glyph) in groups {
        push32(&mut out, *start);
        push32(&mut out, *end);
        push32(&mut out, *glyph);
    }
    out
}

/// A cmap table from `(platform, encoding, subtable)` entries
pub fn cmap(subtables: &[(u16, u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    push16(&mut out, 0);
    push16(&mut out, subtables.len() as u16);
    let mut offset = 4 + 8 * subtables.len();
    for (platform, encoding, body) in subtables {
        push16(&mut out, *platform);
        push16(&mut out, *encoding);
        push32(&mut out, offset as u32);
        offset += body.len();
    }
    for (_, _, body) in subtables {
        out.extend_from_slice(body);
    }
    out
}

/// Glyph names for a font of `count` glyphs: the first 258 follow the
/// standard Macintosh order, the rest are `glyphNNN`
pub fn standard_then_custom_names(count: usize) -> Vec<String> {
    let standard = &vero_glyphs::tables::post::STANDARD_MAC_GLYPH_NAMES;
    (0..count)
        .map(|glyph| match standard.get(glyph) {
            Some(name) => name.to_string(),
            None => format!("glyph{glyph}"),
        })
        .collect()
}

/// A Garamond style font: 662 glyphs, Windows Unicode cmap in format 4 and
/// a Macintosh Roman cmap, version 2.0 post table.
pub fn garamond() -> FontBuilder {
    let names = standard_then_custom_names(662);
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut unicode: Vec<(u16, u16)> = vec![(0x20, 3)];
    unicode.extend((0x41..=0x5A).map(|code| (code, code - 0x41 + 36)));
    unicode.extend((0x61..=0x7A).map(|code| (code, code - 0x61 + 68)));
    unicode.extend([(0xB5, 151), (0x100, 300), (0x101, 301), (0xFB01, 192), (0xFB02, 193)]);

    let mac = cmap_format0(&[(0x20, 3), (0x41, 36), (0xB5, 151)]);

    FontBuilder::new()
        .table(b"head", head(1000))
        .table(b"maxp", maxp(662))
        .table(b"name", name(&[(1, "Garamond"), (4, "Garamond Regular")], &[(1, "Garamond")]))
        .table(b"post", post_v2(&names))
        .table(b"cmap", cmap(&[(1, 0, mac), (3, 1, cmap_format4(&unicode, false))]))
}

/// A Latin Modern style font whose micro sign glyph uses the standard name
/// `mu`, mapped through the glyph id array of a format 4 subtable
pub fn latin_modern() -> FontBuilder {
    let names = [".notdef", "space", "A", "mu", "fi", "ff"];
    let unicode = [(0x20, 1), (0x41, 2), (0xB5, 3), (0xFB00, 5), (0xFB01, 4)];

    FontBuilder::new()
        .table(b"head", head(1000))
        .table(b"maxp", maxp(names.len() as u16))
        .table(b"name", name(&[(1, "LM Roman 10")], &[]))
        .table(b"post", post_v2(&names))
        .table(b"cmap", cmap(&[(3, 1, cmap_format4(&unicode, true))]))
}

/// A Macintosh style font with only a Macintosh Roman cmap and a custom
/// `mu1` glyph
pub fn macintosh() -> FontBuilder {
    let names = [".notdef", "space", "A", "mu1", "fi"];

    FontBuilder::new()
        .table(b"head", head(2048))
        .table(b"maxp", maxp(names.len() as u16))
        .table(b"name", name(&[], &[(1, "Mac Sans")]))
        .table(b"post", post_v2(&names))
        .table(b"cmap", cmap(&[(1, 0, cmap_format0(&[(0x20, 1), (0x41, 2), (0xB5, 3), (0xDE, 4)]))]))
}
