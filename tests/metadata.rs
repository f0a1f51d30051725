mod common;

use common::*;
use vero_glyphs::{FontReader, VeroGlyphsError, tables::Tag};

#[test]
fn garamond_metadata() {
    init_logging();
    let font = FontReader::from_bytes(garamond().build()).unwrap();

    assert_eq!(font.number_of_glyphs().unwrap(), 662);
    assert_eq!(font.font_family_name().unwrap(), "Garamond");
    assert_eq!(font.full_name().unwrap(), "Garamond Regular");
    assert_eq!(font.units_per_em().unwrap(), 1000);
    assert_eq!(font.head().unwrap().bounding_box(), (-50, -200, 1000, 800));
    assert!(matches!(
        font.postscript_name(),
        Err(VeroGlyphsError::MissingNameRecord { name_id: 6 })
    ));
}

#[test]
fn family_name_falls_back_to_macintosh() {
    let font = FontReader::from_bytes(macintosh().build()).unwrap();

    assert_eq!(font.font_family_name().unwrap(), "Mac Sans");
    assert_eq!(font.units_per_em().unwrap(), 2048);
    assert_eq!(font.number_of_glyphs().unwrap(), 5);
}

#[test]
fn missing_metadata_tables() {
    let font = FontReader::from_bytes(
        FontBuilder::new()
            .table(b"cmap", cmap(&[(3, 1, cmap_format4(&[(0x41, 1)], false))]))
            .build(),
    )
    .unwrap();

    assert!(matches!(
        font.font_family_name(),
        Err(VeroGlyphsError::MissingTable(Tag::NAME))
    ));
    assert!(matches!(font.units_per_em(), Err(VeroGlyphsError::MissingTable(Tag::HEAD))));
    assert_eq!(font.verify_checksum_adjustment(), None);
    assert_eq!(font.cmap().unwrap().lookup(3, 1, 0x41), Some(1));
}

#[test]
fn truncated_table_fails_only_its_queries() {
    let font = FontReader::from_bytes(
        FontBuilder::new()
            .table(b"cmap", cmap(&[(3, 1, cmap_format4(&[(0x41, 1)], false))]))
            .table(b"maxp", vec![0, 0, 0x50])
            .build(),
    )
    .unwrap();

    let err = font.number_of_glyphs().unwrap_err();
    assert!(matches!(err, VeroGlyphsError::VeroBufReaderError(_)));
    // the failure is memoized
    assert!(font.maxp().is_err());
    assert_eq!(font.cmap().unwrap().lookup(3, 1, 0x41), Some(1));
}
