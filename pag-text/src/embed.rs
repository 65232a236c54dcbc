//! FontEmbedder: rewrites typeset runs against fonts built from the
//! glyphs they actually use, so the result renders without the original
//! font files.
//!
//! ```text
//! TypesetDocument
//!   ├── pass 1: largest size of every outline glyph, per (typeface, glyph)
//!   ├── pass 2: collect glyphs
//!   │     ├── outline ──► one vector font, 1000 units/em, SVG path data
//!   │     └── image   ──► one bitmap font per typeface, units/em = strike ppem, PNG
//!   └── pass 3: remap runs to 1-based embedded glyph ids
//! ```
//!
//! Vector glyphs are captured at the largest size they are used at so that
//! the rounded path data loses as little precision as possible.

use std::collections::HashMap;
use std::io::Cursor;

use kurbo::{Affine, BezPath, PathEl};
use pag_core::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EmbedError;
use crate::font::Font;
use crate::typeface::{GlyphId, GlyphImage, PathTypefaceBuilder, TypefaceRef};
use crate::typesetter::{GlyphRun, TypesetDocument};

pub const VECTOR_FONT_UNITS_PER_EM: u16 = 1000;

const NEARLY_ZERO: f32 = 1.0 / 4096.0;
const MAX_GLYPHS: usize = (u16::MAX - 1) as usize;

/// (typeface unique id, glyph id in that typeface)
type GlyphKey = (u32, GlyphId);

// ── Embedded model ──────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EmbeddedGlyphContent {
    /// SVG path data in font units, y-down, integer coordinates.
    Path(String),
    /// PNG bytes. `offset` places the top-left pixel relative to the
    /// glyph origin, in font units.
    Image { png: Vec<u8>, offset: Point },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedGlyph {
    pub content: EmbeddedGlyphContent,
    /// Horizontal advance in font units.
    pub advance: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedFont {
    /// "font1", "font2", ... in document order.
    pub id: String,
    pub units_per_em: u16,
    pub glyphs: Vec<EmbeddedGlyph>,
}

impl EmbeddedFont {
    fn new(units_per_em: u16) -> Self {
        Self {
            id: String::new(),
            units_per_em: units_per_em.max(1),
            glyphs: Vec::new(),
        }
    }

    /// Appends a glyph and returns its 1-based id, or `None` once the
    /// glyph table is full.
    fn push(&mut self, glyph: EmbeddedGlyph) -> Option<GlyphId> {
        if self.glyphs.len() >= MAX_GLYPHS {
            log::warn!("FontEmbedder: font {} is full, glyph dropped", self.id);
            return None;
        }
        self.glyphs.push(glyph);
        Some(self.glyphs.len() as GlyphId)
    }

    pub fn advance(&self, glyph_id: GlyphId) -> Option<f32> {
        let index = (glyph_id as usize).checked_sub(1)?;
        self.glyphs.get(index).map(|glyph| glyph.advance)
    }

    /// Rebuilds a typeface with the same 1-based glyph ids.
    pub fn to_typeface(&self) -> Result<TypefaceRef, EmbedError> {
        let mut builder = PathTypefaceBuilder::new(&self.id, "Regular", self.units_per_em);
        for glyph in &self.glyphs {
            match &glyph.content {
                EmbeddedGlyphContent::Path(data) => {
                    builder.add_glyph(BezPath::from_svg(data)?, glyph.advance);
                }
                EmbeddedGlyphContent::Image { png, offset } => {
                    let image = decode_png(png, *offset, self.units_per_em)?;
                    builder.add_image_glyph(image, glyph.advance);
                }
            }
        }
        Ok(builder.build())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RunPositioning {
    /// Glyphs start at `x` and follow each other by their own advances.
    Default { x: f32, y: f32 },
    /// Explicit baseline x per glyph.
    Horizontal { y: f32, x_offsets: Vec<f32> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedRun {
    /// Index into [`EmbeddedDocument::fonts`].
    pub font_index: usize,
    pub font_size: f32,
    pub glyph_ids: Vec<GlyphId>,
    pub positioning: RunPositioning,
}

impl EmbeddedRun {
    pub fn y(&self) -> f32 {
        match self.positioning {
            RunPositioning::Default { y, .. } | RunPositioning::Horizontal { y, .. } => y,
        }
    }

    /// Baseline x of every glyph, resolving default positioning through
    /// the advances of `font`.
    pub fn x_positions(&self, font: &EmbeddedFont) -> Vec<f32> {
        match &self.positioning {
            RunPositioning::Horizontal { x_offsets, .. } => x_offsets.clone(),
            RunPositioning::Default { x, .. } => {
                let scale = self.font_size / font.units_per_em as f32;
                let mut current = *x;
                self.glyph_ids
                    .iter()
                    .map(|&id| {
                        let position = current;
                        current += font.advance(id).unwrap_or(0.0) * scale;
                        position
                    })
                    .collect()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedText {
    pub text_id: Uuid,
    pub runs: Vec<EmbeddedRun>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDocument {
    pub fonts: Vec<EmbeddedFont>,
    pub texts: Vec<EmbeddedText>,
}

impl EmbeddedDocument {
    pub fn text(&self, text_id: Uuid) -> Option<&EmbeddedText> {
        self.texts.iter().find(|text| text.text_id == text_id)
    }

    /// One typeface per embedded font, in font order.
    pub fn typefaces(&self) -> Result<Vec<TypefaceRef>, EmbedError> {
        self.fonts.iter().map(EmbeddedFont::to_typeface).collect()
    }
}

// ── Embedder ────────────────────────────────────────────────────────

struct BitmapFontBuilder {
    font: EmbeddedFont,
    mapping: HashMap<GlyphId, GlyphId>,
}

#[derive(Default)]
pub struct FontEmbedder {
    max_sizes: HashMap<GlyphKey, f32>,
    vector_font: Option<EmbeddedFont>,
    vector_mapping: HashMap<GlyphKey, GlyphId>,
    bitmap_fonts: Vec<BitmapFontBuilder>,
    bitmap_index: HashMap<u32, usize>,
}

impl FontEmbedder {
    pub fn embed(typeset: &TypesetDocument) -> EmbeddedDocument {
        let mut embedder = FontEmbedder::default();
        let runs = || typeset.texts().iter().flat_map(|text| &text.runs);

        for run in runs() {
            for &glyph_id in &run.glyph_ids {
                if is_vector_glyph(&run.font, glyph_id) {
                    embedder.collect_max_size(&run.font, glyph_id);
                }
            }
        }
        for run in runs() {
            for &glyph_id in &run.glyph_ids {
                if is_vector_glyph(&run.font, glyph_id) {
                    embedder.collect_vector_glyph(&run.font, glyph_id);
                } else {
                    embedder.collect_bitmap_glyph(&run.font, glyph_id);
                }
            }
        }

        let mut font_index = 1;
        if let Some(font) = &mut embedder.vector_font {
            font.id = format!("font{font_index}");
            font_index += 1;
        }
        for builder in &mut embedder.bitmap_fonts {
            builder.font.id = format!("font{font_index}");
            font_index += 1;
        }

        let texts = typeset
            .texts()
            .iter()
            .map(|text| EmbeddedText {
                text_id: text.text_id,
                runs: text
                    .runs
                    .iter()
                    .flat_map(|run| embedder.remap_run(run))
                    .collect(),
            })
            .collect();

        let bitmap_offset = usize::from(embedder.vector_font.is_some());
        let mut fonts: Vec<EmbeddedFont> = embedder.vector_font.into_iter().collect();
        fonts.extend(embedder.bitmap_fonts.into_iter().map(|builder| builder.font));
        log::debug!(
            "FontEmbedder: {} fonts, {} glyphs ({} bitmap fonts)",
            fonts.len(),
            fonts.iter().map(|font| font.glyphs.len()).sum::<usize>(),
            fonts.len() - bitmap_offset
        );
        EmbeddedDocument { fonts, texts }
    }

    fn collect_max_size(&mut self, font: &Font, glyph_id: GlyphId) {
        let key = (font.typeface().unique_id(), glyph_id);
        let size = self.max_sizes.entry(key).or_insert(font.size());
        *size = size.max(font.size());
    }

    fn collect_vector_glyph(&mut self, font: &Font, glyph_id: GlyphId) {
        let key = (font.typeface().unique_id(), glyph_id);
        if self.vector_mapping.contains_key(&key) {
            return;
        }
        let Some(&max_size) = self.max_sizes.get(&key) else {
            return;
        };
        if (font.size() - max_size).abs() > 0.001 {
            return;
        }
        let Some(mut path) = font.path(glyph_id) else {
            return;
        };
        let scale = VECTOR_FONT_UNITS_PER_EM as f32 / font.size();
        path.apply_affine(Affine::scale(scale as f64));
        let glyph = EmbeddedGlyph {
            content: EmbeddedGlyphContent::Path(path_to_svg(&path)),
            advance: font.advance(glyph_id, false) * scale,
        };
        let vector_font = self
            .vector_font
            .get_or_insert_with(|| EmbeddedFont::new(VECTOR_FONT_UNITS_PER_EM));
        if let Some(id) = vector_font.push(glyph) {
            self.vector_mapping.insert(key, id);
        }
    }

    fn collect_bitmap_glyph(&mut self, font: &Font, glyph_id: GlyphId) {
        let typeface_id = font.typeface().unique_id();
        if let Some(&index) = self.bitmap_index.get(&typeface_id) {
            if self.bitmap_fonts[index].mapping.contains_key(&glyph_id) {
                return;
            }
        }
        let Some(image) = font.typeface().image(glyph_id, font.size()) else {
            return;
        };
        if image.width == 0 || image.height == 0 || image.pixels_per_em < 0.001 {
            return;
        }
        let index = match self.bitmap_index.get(&typeface_id) {
            Some(&index) => index,
            None => {
                // The first strike seen fixes the font's resolution.
                let backing_size = image.pixels_per_em.round().clamp(1.0, u16::MAX as f32) as u16;
                self.bitmap_fonts.push(BitmapFontBuilder {
                    font: EmbeddedFont::new(backing_size),
                    mapping: HashMap::new(),
                });
                let index = self.bitmap_fonts.len() - 1;
                self.bitmap_index.insert(typeface_id, index);
                index
            }
        };
        let builder = &mut self.bitmap_fonts[index];
        let backing_size = builder.font.units_per_em as f32;
        let image = if (image.pixels_per_em - backing_size).abs() > 0.5 {
            match image.scaled_to(backing_size) {
                Some(image) => image,
                None => return,
            }
        } else {
            image
        };
        let png = match encode_png(&image) {
            Ok(png) => png,
            Err(err) => {
                log::warn!("FontEmbedder: failed to encode image of glyph {glyph_id}: {err}");
                return;
            }
        };
        let glyph = EmbeddedGlyph {
            content: EmbeddedGlyphContent::Image {
                png,
                offset: Point::new(image.left, image.top),
            },
            advance: font.advance(glyph_id, false) / font.size() * backing_size,
        };
        if let Some(id) = builder.font.push(glyph) {
            builder.mapping.insert(glyph_id, id);
        }
    }

    /// Splits a typeset run into a vector part and a bitmap part, each
    /// with remapped glyph ids. Glyphs that were not embedded are dropped.
    fn remap_run(&self, run: &GlyphRun) -> Vec<EmbeddedRun> {
        let typeface_id = run.font.typeface().unique_id();
        let bitmap = self
            .bitmap_index
            .get(&typeface_id)
            .map(|&index| (index, &self.bitmap_fonts[index]));

        let mut vector_glyphs = Vec::new();
        let mut bitmap_glyphs = Vec::new();
        for (i, &glyph_id) in run.glyph_ids.iter().enumerate() {
            if let Some(&id) = self.vector_mapping.get(&(typeface_id, glyph_id)) {
                vector_glyphs.push((id, run.x_positions[i]));
            } else if let Some(&id) = bitmap.and_then(|(_, b)| b.mapping.get(&glyph_id)) {
                bitmap_glyphs.push((id, run.x_positions[i]));
            }
        }

        let mut runs = Vec::new();
        if let Some(font) = &self.vector_font {
            if !vector_glyphs.is_empty() {
                runs.push(make_run(run, &vector_glyphs, 0, font));
            }
        }
        if let Some((index, builder)) = bitmap {
            if !bitmap_glyphs.is_empty() {
                let font_index = index + usize::from(self.vector_font.is_some());
                runs.push(make_run(run, &bitmap_glyphs, font_index, &builder.font));
            }
        }
        runs
    }
}

fn is_vector_glyph(font: &Font, glyph_id: GlyphId) -> bool {
    font.path(glyph_id)
        .is_some_and(|path| !path.elements().is_empty())
}

fn make_run(
    run: &GlyphRun,
    glyphs: &[(GlyphId, f32)],
    font_index: usize,
    font: &EmbeddedFont,
) -> EmbeddedRun {
    let glyph_ids: Vec<GlyphId> = glyphs.iter().map(|&(id, _)| id).collect();
    let x_offsets: Vec<f32> = glyphs.iter().map(|&(_, x)| x).collect();
    let font_size = run.font.size();
    let positioning = if follows_advances(&glyph_ids, &x_offsets, font, font_size) {
        RunPositioning::Default {
            x: x_offsets[0],
            y: run.y,
        }
    } else {
        RunPositioning::Horizontal {
            y: run.y,
            x_offsets,
        }
    };
    EmbeddedRun {
        font_index,
        font_size,
        glyph_ids,
        positioning,
    }
}

/// True when every glyph sits exactly where the previous one's advance
/// ends.
fn follows_advances(glyph_ids: &[GlyphId], x_offsets: &[f32], font: &EmbeddedFont, font_size: f32) -> bool {
    let Some(&start) = x_offsets.first() else {
        return false;
    };
    let scale = font_size / font.units_per_em as f32;
    let mut expected = start;
    for (&id, &x) in glyph_ids.iter().zip(x_offsets) {
        if (x - expected).abs() > NEARLY_ZERO {
            return false;
        }
        let Some(advance) = font.advance(id) else {
            return false;
        };
        expected += advance * scale;
    }
    true
}

fn path_to_svg(path: &BezPath) -> String {
    let mut svg = String::with_capacity(256);
    for element in path.elements() {
        if !svg.is_empty() {
            svg.push(' ');
        }
        let command = match element {
            PathEl::MoveTo(p) => format!("M{} {}", round(p.x), round(p.y)),
            PathEl::LineTo(p) => format!("L{} {}", round(p.x), round(p.y)),
            PathEl::QuadTo(c, p) => {
                format!("Q{} {} {} {}", round(c.x), round(c.y), round(p.x), round(p.y))
            }
            PathEl::CurveTo(c1, c2, p) => format!(
                "C{} {} {} {} {} {}",
                round(c1.x),
                round(c1.y),
                round(c2.x),
                round(c2.y),
                round(p.x),
                round(p.y)
            ),
            PathEl::ClosePath => "Z".to_string(),
        };
        svg.push_str(&command);
    }
    svg
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

fn encode_png(image: &GlyphImage) -> Result<Vec<u8>, EmbedError> {
    let expected = image.width as usize * image.height as usize * 4;
    let buffer = image::RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
        .ok_or(EmbedError::ImageSize {
            expected,
            actual: image.pixels.len(),
        })?;
    let mut png = Vec::new();
    buffer.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}

fn decode_png(png: &[u8], offset: Point, units_per_em: u16) -> Result<GlyphImage, EmbedError> {
    let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)?.into_rgba8();
    Ok(GlyphImage {
        width: decoded.width(),
        height: decoded.height(),
        left: offset.x,
        top: offset.y,
        pixels_per_em: units_per_em as f32,
        pixels: decoded.into_raw(),
    })
}
