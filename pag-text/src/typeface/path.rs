//! Typeface built from in-memory outlines and images.
//!
//! Glyph IDs are assigned 1-based in insertion order so that 0 keeps its
//! "no glyph" meaning. This is the shape embedded fonts take after
//! export, and it is what the tests use in place of font files.

use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{BezPath, Rect, Shape};

use super::{next_unique_id, FontMetrics, GlyphId, GlyphImage, Typeface, TypefaceRef};

#[derive(Clone, Debug)]
enum GlyphContent {
    Path(BezPath),
    Image(GlyphImage),
}

#[derive(Clone, Debug)]
struct PathGlyph {
    content: GlyphContent,
    advance: f32,
}

/// Incrementally assembles a [`PathTypeface`].
#[derive(Clone, Debug)]
pub struct PathTypefaceBuilder {
    family: String,
    style: String,
    units_per_em: u16,
    metrics: FontMetrics,
    glyphs: Vec<PathGlyph>,
    char_map: HashMap<char, GlyphId>,
}

impl PathTypefaceBuilder {
    pub fn new(family: &str, style: &str, units_per_em: u16) -> Self {
        let upem = units_per_em.max(1) as f32;
        Self {
            family: family.to_string(),
            style: style.to_string(),
            units_per_em: units_per_em.max(1),
            metrics: FontMetrics {
                ascent: -0.8 * upem,
                descent: 0.2 * upem,
                leading: 0.0,
                x_height: 0.5 * upem,
                cap_height: 0.7 * upem,
            },
            glyphs: Vec::new(),
            char_map: HashMap::new(),
        }
    }

    pub fn set_metrics(&mut self, metrics: FontMetrics) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// Adds an outline glyph. Returns 0 once the glyph table is full.
    pub fn add_glyph(&mut self, path: BezPath, advance: f32) -> GlyphId {
        self.push(GlyphContent::Path(path), advance)
    }

    /// Adds a color image glyph. Returns 0 once the glyph table is full.
    pub fn add_image_glyph(&mut self, image: GlyphImage, advance: f32) -> GlyphId {
        self.push(GlyphContent::Image(image), advance)
    }

    pub fn map_char(&mut self, unichar: char, glyph_id: GlyphId) -> &mut Self {
        if glyph_id != 0 && (glyph_id as usize) <= self.glyphs.len() {
            self.char_map.insert(unichar, glyph_id);
        }
        self
    }

    /// Adds an outline glyph and maps `unichar` to it.
    pub fn add_char(&mut self, unichar: char, path: BezPath, advance: f32) -> GlyphId {
        let id = self.add_glyph(path, advance);
        self.map_char(unichar, id);
        id
    }

    pub fn glyphs_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn build(&self) -> TypefaceRef {
        Arc::new(PathTypeface {
            unique_id: next_unique_id(),
            family: self.family.clone(),
            style: self.style.clone(),
            units_per_em: self.units_per_em,
            metrics: self.metrics,
            has_color: self
                .glyphs
                .iter()
                .any(|g| matches!(g.content, GlyphContent::Image(_))),
            glyphs: self.glyphs.clone(),
            char_map: self.char_map.clone(),
        })
    }

    fn push(&mut self, content: GlyphContent, advance: f32) -> GlyphId {
        if self.glyphs.len() >= (u16::MAX - 1) as usize {
            return 0;
        }
        self.glyphs.push(PathGlyph { content, advance });
        self.glyphs.len() as GlyphId
    }
}

#[derive(Debug)]
pub struct PathTypeface {
    unique_id: u32,
    family: String,
    style: String,
    units_per_em: u16,
    metrics: FontMetrics,
    has_color: bool,
    glyphs: Vec<PathGlyph>,
    char_map: HashMap<char, GlyphId>,
}

impl PathTypeface {
    fn glyph(&self, glyph_id: GlyphId) -> Option<&PathGlyph> {
        if glyph_id == 0 {
            return None;
        }
        self.glyphs.get(glyph_id as usize - 1)
    }
}

impl Typeface for PathTypeface {
    fn unique_id(&self) -> u32 {
        self.unique_id
    }

    fn font_family(&self) -> &str {
        &self.family
    }

    fn font_style(&self) -> &str {
        &self.style
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn has_color(&self) -> bool {
        self.has_color
    }

    fn glyphs_count(&self) -> usize {
        self.glyphs.len()
    }

    fn glyph_id(&self, unichar: char) -> GlyphId {
        self.char_map.get(&unichar).copied().unwrap_or(0)
    }

    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn advance(&self, glyph_id: GlyphId, vertical: bool) -> f32 {
        if vertical {
            // No vertical metrics; callers fall back to the horizontal advance.
            return 0.0;
        }
        self.glyph(glyph_id).map(|g| g.advance).unwrap_or(0.0)
    }

    fn bounds(&self, glyph_id: GlyphId) -> Option<Rect> {
        match &self.glyph(glyph_id)?.content {
            GlyphContent::Path(path) if path.elements().is_empty() => None,
            GlyphContent::Path(path) => Some(path.bounding_box()),
            GlyphContent::Image(image) => {
                let scale = self.units_per_em as f64 / image.pixels_per_em.max(1.0) as f64;
                Some(image.bounds().scale_from_origin(scale))
            }
        }
    }

    fn outline(&self, glyph_id: GlyphId) -> Option<BezPath> {
        match &self.glyph(glyph_id)?.content {
            GlyphContent::Path(path) => Some(path.clone()),
            GlyphContent::Image(_) => None,
        }
    }

    fn image(&self, glyph_id: GlyphId, _size: f32) -> Option<GlyphImage> {
        match &self.glyph(glyph_id)?.content {
            GlyphContent::Image(image) => Some(image.clone()),
            GlyphContent::Path(_) => None,
        }
    }
}
