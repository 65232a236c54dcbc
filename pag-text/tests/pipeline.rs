//! End-to-end checks across shaping, layout, atlases and embedding,
//! using only the public API.

use std::sync::Arc;

use kurbo::BezPath;
use pag_core::{Document, Element, Group, Layer, Text, TextDocument};
use pag_text::{
    collect_glyph_instances, layout_text, AtlasOptions, CpuTextureBackend, EmbeddedDocument, FontEmbedder,
    FontMetrics, FontRegistry, GlyphImage, PaintStyle, PathTypefaceBuilder, PrimitiveShaper, Shaper, TextAtlas,
    TextAtlasCache, TypefaceRef, Typesetter,
};

fn glyph_box(width: f64, height: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((0.0, -height));
    path.line_to((width, -height));
    path.line_to((width, 0.0));
    path.line_to((0.0, 0.0));
    path.close_path();
    path
}

fn builder(family: &str) -> PathTypefaceBuilder {
    let mut builder = PathTypefaceBuilder::new(family, "Regular", 10);
    builder.set_metrics(FontMetrics {
        ascent: -8.0,
        descent: 2.0,
        leading: 0.0,
        x_height: 5.0,
        cap_height: 7.0,
    });
    builder
}

/// Boxes for 'A'..='H' (advance 8) plus a space.
fn latin() -> TypefaceRef {
    let mut builder = builder("Latin");
    for (i, unichar) in ('A'..='H').enumerate() {
        builder.add_char(unichar, glyph_box(4.0 + i as f64 % 3.0, 7.0), 8.0);
    }
    builder.add_char(' ', BezPath::new(), 3.0);
    builder.build()
}

fn greek() -> TypefaceRef {
    let mut builder = builder("Greek");
    builder.add_char('Ω', glyph_box(5.0, 7.0), 6.0);
    builder.add_char('A', glyph_box(9.0, 9.0), 11.0);
    builder.build()
}

fn emoji() -> TypefaceRef {
    let mut builder = builder("Emoji");
    let image = GlyphImage {
        width: 10,
        height: 10,
        left: 0.0,
        top: -8.0,
        pixels_per_em: 10.0,
        pixels: [0u8, 0, 255, 255].repeat(100),
    };
    let id = builder.add_image_glyph(image, 10.0);
    builder.map_char('☺', id);
    builder.build()
}

struct Fixture {
    latin: TypefaceRef,
    greek: TypefaceRef,
    emoji: TypefaceRef,
    shaper: Shaper,
}

fn fixture() -> Fixture {
    let (latin, greek, emoji) = (latin(), greek(), emoji());
    let registry = FontRegistry::new();
    registry.register_typeface(latin.clone());
    registry.set_fallback_typefaces(vec![greek.clone(), emoji.clone()]);
    let shaper = Shaper::with_backend(Arc::new(PrimitiveShaper), Arc::new(registry));
    Fixture {
        latin,
        greek,
        emoji,
        shaper,
    }
}

fn same(a: &TypefaceRef, b: &TypefaceRef) -> bool {
    a.unique_id() == b.unique_id()
}

// ── Shaping ─────────────────────────────────────────────────────────

#[test]
fn test_clusters_partition_text_and_follow_fallback_order() {
    let f = fixture();
    let text = "AΩ☺?B";
    let glyphs = f.shaper.shape(text, Some(&f.latin));

    let starts: Vec<usize> = glyphs.iter().map(|g| g.string_index).collect();
    let expected: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    assert_eq!(starts, expected);

    let owner = |i: usize| glyphs[i].typeface.as_ref();
    assert!(same(owner(0).unwrap(), &f.latin));
    assert!(same(owner(1).unwrap(), &f.greek));
    assert!(same(owner(2).unwrap(), &f.emoji));
    assert!(owner(3).is_none());
    assert_eq!(glyphs[3].glyph_id(), 0);
    assert!(same(owner(4).unwrap(), &f.latin));
}

#[test]
fn test_primary_typeface_wins_over_fallback_for_shared_characters() {
    let f = fixture();
    // 'A' exists in both; the primary typeface maps it first.
    let glyphs = f.shaper.shape("A", Some(&f.latin));
    assert!(same(glyphs[0].typeface.as_ref().unwrap(), &f.latin));

    // Without a primary, fallbacks are tried in order.
    let glyphs = f.shaper.shape("A", None);
    assert!(same(glyphs[0].typeface.as_ref().unwrap(), &f.greek));
}

#[test]
fn test_registry_resolution_order() {
    let f = fixture();
    let registry = f.shaper.registry();
    let mut bold = builder("Latin");
    bold.add_char('A', glyph_box(6.0, 7.0), 9.0);
    let bold = bold.build();
    registry.register_typeface_as(bold.clone(), "Latin", "Bold");

    assert!(same(&registry.find_typeface("Latin", "Bold").unwrap(), &bold));
    assert!(same(&registry.find_typeface("Latin", "").unwrap(), &f.latin));
    assert!(registry.find_typeface("Latin", "Italic").is_some());
    assert!(same(&registry.find_typeface("Emoji", "Regular").unwrap(), &f.emoji));
    assert!(same(&registry.find_typeface("Nope", "Regular").unwrap(), &f.greek));
    assert!(registry.typeface_without_fallback("Nope", "Regular").is_none());
}

// ── Layout and atlas ────────────────────────────────────────────────

#[test]
fn test_atlas_holds_every_drawable_glyph() {
    let f = fixture();
    let document = TextDocument {
        apply_stroke: true,
        ..TextDocument::new("ABC DEF\nGHA Ω☺", "Latin", 20.0)
    };
    let text = layout_text(&document, &f.shaper);
    let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.5, &AtlasOptions::default()).unwrap();

    let drawable: Vec<_> = text.glyphs().filter(|glyph| !glyph.is_blank()).collect();
    assert!(text.glyphs().any(|glyph| glyph.is_blank()));
    for glyph in &drawable {
        if glyph.font().typeface().has_color() {
            let locator = atlas.glyph_locator(glyph, glyph.style()).unwrap();
            assert!(atlas.is_color_page(locator.image_index));
            continue;
        }
        for style in [PaintStyle::Fill, PaintStyle::Stroke] {
            let locator = atlas.glyph_locator(glyph, style).unwrap();
            assert!(!atlas.is_color_page(locator.image_index));
        }
    }
}

#[test]
fn test_atlas_regions_stay_in_bounds_without_overlap() {
    let f = fixture();
    let options = AtlasOptions {
        max_texture_size: 64,
        ..AtlasOptions::default()
    };
    let document = TextDocument::new("ABCDEFGH", "Latin", 40.0);
    let text = layout_text(&document, &f.shaper);
    let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &options).unwrap();
    assert!(atlas.page_count() > 1);

    let locators: Vec<_> = text
        .glyphs()
        .filter_map(|glyph| atlas.glyph_locator(glyph, PaintStyle::Fill))
        .collect();
    assert_eq!(locators.len(), 8);
    for (i, a) in locators.iter().enumerate() {
        let page = atlas.atlas_page(a.image_index).unwrap();
        assert!(page.width <= 64 && page.height <= 64);
        assert!(a.location.x0 >= 0.0 && a.location.y0 >= 0.0);
        assert!(a.location.x1 <= page.width as f64 && a.location.y1 <= page.height as f64);
        for b in &locators[i + 1..] {
            if a.image_index == b.image_index {
                assert!(a.location.intersect(b.location).area() <= 0.0);
            }
        }
    }
}

#[test]
fn test_draw_instances_cover_drawable_glyphs() {
    let f = fixture();
    let text = layout_text(&TextDocument::new("AB ☺\nC", "Latin", 12.0), &f.shaper);
    let atlas = TextAtlas::make(&text, &CpuTextureBackend, 2.0, &AtlasOptions::default()).unwrap();
    let instances = collect_glyph_instances(&atlas, &text);

    assert_eq!(instances.len(), 4);
    assert_eq!(instances.iter().filter(|instance| instance.is_color == 1).count(), 1);
    for instance in &instances {
        assert!(instance.uv.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((instance.texture_index as usize) < atlas.page_count());
    }
}

#[test]
fn test_atlas_cache_follows_layout() {
    let f = fixture();
    let mut cache = TextAtlasCache::new(CpuTextureBackend);
    let node = Text::new("ABC", "Latin", 12.0);
    let first = layout_text(&TextDocument::new("ABC", "Latin", 12.0), &f.shaper);
    let second = layout_text(&TextDocument::new("ABCD", "Latin", 12.0), &f.shaper);

    let id = cache.get(node.id, &first, 1.0).map(|atlas| atlas.text_glyphs_id());
    assert_eq!(id, Some(first.id()));
    let id = cache.get(node.id, &second, 1.0).map(|atlas| atlas.text_glyphs_id());
    assert_eq!(id, Some(second.id()));
    assert_eq!(cache.len(), 1);
}

// ── Typesetting and embedding ───────────────────────────────────────

fn document() -> Document {
    let mut document = Document::new(400.0, 300.0);
    let mut spaced = Text::new("BAD Ω", "Latin", 20.0);
    spaced.letter_spacing = 4.0;
    document.add_layer(Layer::new("Title").with_contents(vec![
        Element::Text(Text::new("ABC☺", "Latin", 10.0)),
        Element::Group(Group::new(vec![Element::Text(spaced)])),
    ]));
    document
}

fn typesetter(f: &Fixture) -> Typesetter {
    Typesetter::with_shaper(f.shaper.clone())
}

#[test]
fn test_typesetting_is_idempotent() {
    let f = fixture();
    let typesetter = typesetter(&f);
    let document = document();
    let first = typesetter.create_text_glyphs(&document);
    let second = typesetter.create_text_glyphs(&document);

    assert_eq!(first.len(), 2);
    for (a, b) in first.texts().iter().zip(second.texts()) {
        assert_eq!(a.text_id, b.text_id);
        assert_eq!(a.width, b.width);
        assert_eq!(a.runs.len(), b.runs.len());
        for (run_a, run_b) in a.runs.iter().zip(&b.runs) {
            assert_eq!(run_a.glyph_ids, run_b.glyph_ids);
            assert_eq!(run_a.x_positions, run_b.x_positions);
            assert_eq!(run_a.y, run_b.y);
        }
    }
}

#[test]
fn test_embedded_document_reproduces_positions() {
    let f = fixture();
    let typeset = typesetter(&f).create_text_glyphs(&document());
    let embedded = FontEmbedder::embed(&typeset);

    let json = serde_json::to_string(&embedded).unwrap();
    let restored: EmbeddedDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, embedded);

    let typefaces = restored.typefaces().unwrap();
    assert_eq!(typefaces.len(), restored.fonts.len());
    assert!(typefaces.iter().any(|typeface| typeface.has_color()));

    for text in typeset.texts() {
        let embedded_text = restored.text(text.text_id).unwrap();
        let mut expected: Vec<f32> = text.runs.iter().flat_map(|run| run.x_positions.clone()).collect();
        let mut actual: Vec<f32> = embedded_text
            .runs
            .iter()
            .flat_map(|run| run.x_positions(&restored.fonts[run.font_index]))
            .collect();
        expected.sort_by(f32::total_cmp);
        actual.sort_by(f32::total_cmp);
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(&actual) {
            assert!((e - a).abs() < 0.01, "{e} vs {a}");
        }
    }
}
