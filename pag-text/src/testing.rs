//! Font-file-free typefaces shared by the unit tests.

use kurbo::BezPath;

use crate::typeface::{FileTypeface, FontMetrics, GlyphImage, PathTypefaceBuilder, TypefaceRef};

/// Rectangle sitting on the baseline.
pub(crate) fn glyph_box(width: f64, height: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((0.0, -height));
    path.line_to((width, -height));
    path.line_to((width, 0.0));
    path.line_to((0.0, 0.0));
    path.close_path();
    path
}

fn metrics() -> FontMetrics {
    FontMetrics {
        ascent: -8.0,
        descent: 2.0,
        leading: 0.0,
        x_height: 5.0,
        cap_height: 7.0,
    }
}

/// Family "Test", style "Regular", 10 units per em, so at size 10 one
/// font unit is one pixel. 'A' advances 8, 'B' 9, 'C' and 'W' 10,
/// ' ' 3 (no outline), '中' 10.
pub(crate) fn test_typeface() -> TypefaceRef {
    test_typeface_named("Test", "Regular")
}

pub(crate) fn test_typeface_named(family: &str, style: &str) -> TypefaceRef {
    let mut builder = PathTypefaceBuilder::new(family, style, 10);
    builder.set_metrics(metrics());
    builder.add_char('A', glyph_box(6.0, 7.0), 8.0);
    builder.add_char('B', glyph_box(7.0, 7.0), 9.0);
    builder.add_char('C', glyph_box(8.0, 7.0), 10.0);
    builder.add_char('W', glyph_box(8.0, 7.0), 10.0);
    builder.add_char(' ', BezPath::new(), 3.0);
    builder.add_char('中', glyph_box(9.0, 9.0), 10.0);
    builder.build()
}

/// Family "Fallback": only maps 'Z' (advance 7) and 'Ω' (advance 6).
pub(crate) fn fallback_typeface() -> TypefaceRef {
    let mut builder = PathTypefaceBuilder::new("Fallback", "Regular", 10);
    builder.set_metrics(metrics());
    builder.add_char('Z', glyph_box(5.0, 7.0), 7.0);
    builder.add_char('Ω', glyph_box(5.0, 7.0), 6.0);
    builder.build()
}

/// Family "Emoji": a color typeface whose '☺' is a 10×10 red image.
pub(crate) fn emoji_typeface() -> TypefaceRef {
    let mut builder = PathTypefaceBuilder::new("Emoji", "Regular", 10);
    builder.set_metrics(metrics());
    let image = GlyphImage {
        width: 10,
        height: 10,
        left: 0.0,
        top: -8.0,
        pixels_per_em: 10.0,
        pixels: [255u8, 0, 0, 255].repeat(100),
    };
    let id = builder.add_image_glyph(image, 10.0);
    builder.map_char('☺', id);
    builder.build()
}

pub(crate) const DEJAVU_SANS: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/DejaVuSans.ttf"));
pub(crate) const DEJAVU_SANS_MONO: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/DejaVuSansMono.ttf"));

/// DejaVu Sans: Latin, combining marks and Hebrew.
pub(crate) fn dejavu_sans() -> TypefaceRef {
    FileTypeface::make_from_bytes(DEJAVU_SANS, 0).unwrap()
}

/// DejaVu Sans Mono: Latin and combining marks, no Hebrew.
pub(crate) fn dejavu_sans_mono() -> TypefaceRef {
    FileTypeface::make_from_bytes(DEJAVU_SANS_MONO, 0).unwrap()
}
