//! Glyph: one renderable, styled cluster of text.
//!
//! A glyph always carries its horizontal layout info. Glyphs of vertical
//! text additionally carry a vertical copy with orientation-specific
//! offsets, and [`GlyphInfo`] records which one is current.
//!
//! ```text
//! Glyph
//!   ├── glyph_ids / name / font / paint
//!   ├── horizontal: LayoutInfo
//!   ├── info: GlyphInfo::Horizontal | GlyphInfo::Vertical(LayoutInfo)
//!   └── scale, matrix            set by layout, applied at draw time
//! ```

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use kurbo::{Affine, Point, Rect, Vec2};
use pag_core::{Color, TextDocument};
use smallvec::SmallVec;

use crate::bytes_key::BytesKey;
use crate::font::Font;
use crate::shaper::{cluster_range, Shaper};
use crate::typeface::GlyphId;

// ── Paint ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
    StrokeAndFill,
}

/// How a glyph is painted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextPaint {
    pub style: PaintStyle,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub stroke_over_fill: bool,
}

impl Default for TextPaint {
    fn default() -> Self {
        Self {
            style: PaintStyle::Fill,
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            stroke_width: 0.0,
            stroke_over_fill: true,
        }
    }
}

impl TextPaint {
    pub fn from_document(document: &TextDocument) -> Self {
        let style = match (document.apply_fill, document.apply_stroke) {
            (true, true) => PaintStyle::StrokeAndFill,
            (false, true) => PaintStyle::Stroke,
            _ => PaintStyle::Fill,
        };
        Self {
            style,
            fill_color: document.fill_color,
            stroke_color: document.stroke_color,
            stroke_width: if style == PaintStyle::Fill {
                0.0
            } else {
                document.stroke_width
            },
            stroke_over_fill: document.stroke_over_fill,
        }
    }
}

// ── Layout info ─────────────────────────────────────────────────────

/// Metrics of a glyph in one orientation.
///
/// `bounds` already include `extra_matrix`; `origin` is that matrix's
/// translation.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutInfo {
    pub advance: f32,
    pub origin: Point,
    pub bounds: Rect,
    pub ascent: f32,
    pub descent: f32,
    pub extra_matrix: Affine,
}

/// Which layout info is current.
#[derive(Clone, Debug, PartialEq)]
pub enum GlyphInfo {
    Horizontal,
    Vertical(LayoutInfo),
}

// ── Glyph ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Glyph {
    glyph_ids: SmallVec<[GlyphId; 1]>,
    name: Arc<str>,
    font: Font,
    horizontal: LayoutInfo,
    info: GlyphInfo,
    paint: TextPaint,
    scale: f32,
    matrix: Affine,
}

impl Glyph {
    pub fn new(
        glyph_ids: SmallVec<[GlyphId; 1]>,
        name: &str,
        font: Font,
        paint: TextPaint,
        vertical: bool,
    ) -> Self {
        let name: Arc<str> = Arc::from(name);
        let horizontal = horizontal_info(&font, &glyph_ids);
        let info = if vertical {
            GlyphInfo::Vertical(vertical_info(&horizontal, &font, &glyph_ids, &name))
        } else {
            GlyphInfo::Horizontal
        };
        Self {
            glyph_ids,
            name,
            font,
            horizontal,
            info,
            paint,
            scale: 1.0,
            matrix: Affine::IDENTITY,
        }
    }

    /// Shapes `text` and creates one glyph per cluster. Repeated clusters
    /// share the first instance's data.
    pub fn build_from_text(
        text: &str,
        font: &Font,
        paint: TextPaint,
        vertical: bool,
        shaper: &Shaper,
    ) -> Vec<Glyph> {
        let shaped = shaper.shape(text, Some(font.typeface()));
        let mut by_name: HashMap<&str, Glyph> = HashMap::new();
        let mut glyphs = Vec::with_capacity(shaped.len());
        for index in 0..shaped.len() {
            let name = &text[cluster_range(&shaped, index, text)];
            if let Some(glyph) = by_name.get(name) {
                glyphs.push(glyph.clone());
                continue;
            }
            let glyph_font = match &shaped[index].typeface {
                Some(typeface) => font.with_typeface(typeface.clone()),
                None => font.clone(),
            };
            let glyph = Glyph::new(
                shaped[index].glyph_ids.clone(),
                name,
                glyph_font,
                paint,
                vertical,
            );
            by_name.insert(name, glyph.clone());
            glyphs.push(glyph);
        }
        glyphs
    }

    pub fn glyph_ids(&self) -> &[GlyphId] {
        &self.glyph_ids
    }

    pub fn glyph_id(&self) -> GlyphId {
        self.glyph_ids.first().copied().unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn paint(&self) -> &TextPaint {
        &self.paint
    }

    pub fn style(&self) -> PaintStyle {
        self.paint.style
    }

    pub fn stroke_width(&self) -> f32 {
        self.paint.stroke_width
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self.info, GlyphInfo::Vertical(_))
    }

    /// Zero-footprint glyphs that never go into an atlas.
    pub fn is_blank(&self) -> bool {
        &*self.name == " " || &*self.name == "\n"
    }

    pub fn is_line_break(&self) -> bool {
        self.name.starts_with('\n')
    }

    /// The current layout info.
    pub fn info(&self) -> &LayoutInfo {
        match &self.info {
            GlyphInfo::Horizontal => &self.horizontal,
            GlyphInfo::Vertical(info) => info,
        }
    }

    pub fn horizontal_info(&self) -> &LayoutInfo {
        &self.horizontal
    }

    pub fn advance(&self) -> f32 {
        self.info().advance
    }

    pub fn bounds(&self) -> Rect {
        self.info().bounds
    }

    pub fn ascent(&self) -> f32 {
        self.info().ascent
    }

    pub fn descent(&self) -> f32 {
        self.info().descent
    }

    pub fn extra_matrix(&self) -> Affine {
        self.info().extra_matrix
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    pub fn set_matrix(&mut self, matrix: Affine) {
        self.matrix = matrix;
    }

    /// Glyph space → text space: extra matrix, then scale, then matrix.
    pub fn total_matrix(&self) -> Affine {
        self.matrix * Affine::scale(self.scale as f64) * self.extra_matrix()
    }

    /// Same glyph with horizontal info current; keeps scale and matrix.
    pub fn make_horizontal_glyph(&self) -> Glyph {
        Glyph {
            info: GlyphInfo::Horizontal,
            ..self.clone()
        }
    }

    /// Same glyph at `scale` × its font size, with identity transform.
    pub fn make_scaled_glyph(&self, scale: f32) -> Glyph {
        let font = self.font.with_size(self.font.size() * scale);
        let paint = TextPaint {
            stroke_width: self.paint.stroke_width * scale,
            ..self.paint
        };
        Glyph::new(
            self.glyph_ids.clone(),
            &self.name,
            font,
            paint,
            self.is_vertical(),
        )
    }

    /// Same glyph painted with a single style.
    pub fn make_styled_glyph(&self, style: PaintStyle) -> Glyph {
        let mut glyph = self.clone();
        glyph.paint.style = style;
        glyph
    }

    /// Glyphs with equal style keys can be drawn in one batch.
    pub fn style_key(&self) -> BytesKey {
        let mut key = BytesKey::new();
        key.write_u32(self.paint.style as u32);
        key.write_f32(stroke_width_for_key(self.paint.style, self.paint.stroke_width));
        key.write_u32(self.font.typeface().unique_id());
        key.write_f32(self.font.size());
        key.write_bool(self.font.is_faux_bold());
        key.write_bool(self.font.is_faux_italic());
        key
    }

    /// Identifies the rasterized image of this glyph in an atlas.
    pub fn atlas_key(&self) -> BytesKey {
        self.scaled_atlas_key(1.0, self.paint.style)
    }

    /// The atlas key `make_scaled_glyph(scale).make_styled_glyph(style)`
    /// would have, without building that glyph.
    pub fn scaled_atlas_key(&self, scale: f32, style: PaintStyle) -> BytesKey {
        let mut key = BytesKey::new();
        key.write_u32(self.glyph_ids.len() as u32);
        for &id in &self.glyph_ids {
            key.write_u32(id as u32);
        }
        key.write_u32(style as u32);
        key.write_f32(stroke_width_for_key(style, self.paint.stroke_width * scale));
        key.write_u32(self.font.typeface().unique_id());
        key.write_f32(self.font.size() * scale);
        key.write_bool(self.font.is_faux_bold());
        key.write_bool(self.font.is_faux_italic());
        key
    }
}

fn stroke_width_for_key(style: PaintStyle, stroke_width: f32) -> f32 {
    if style == PaintStyle::Fill {
        0.0
    } else {
        stroke_width
    }
}

fn horizontal_info(font: &Font, glyph_ids: &[GlyphId]) -> LayoutInfo {
    let metrics = font.metrics();
    let mut info = LayoutInfo {
        advance: 0.0,
        origin: Point::ZERO,
        bounds: Rect::ZERO,
        ascent: metrics.ascent,
        descent: metrics.descent,
        extra_matrix: Affine::IDENTITY,
    };
    if glyph_ids.iter().all(|&id| id == 0) {
        // Placeholder blank for characters no typeface can render.
        info.advance = font.size() * 0.5;
        return info;
    }
    let mut bounds: Option<Rect> = None;
    for &id in glyph_ids {
        let glyph_bounds = font.bounds(id);
        if glyph_bounds.area() > 0.0 {
            let glyph_bounds = glyph_bounds + Vec2::new(info.advance as f64, 0.0);
            bounds = Some(bounds.map_or(glyph_bounds, |b| b.union(glyph_bounds)));
        }
        info.advance += font.advance(id, false);
    }
    info.bounds = bounds.unwrap_or(Rect::ZERO);
    info
}

fn vertical_info(horizontal: &LayoutInfo, font: &Font, glyph_ids: &[GlyphId], name: &str) -> LayoutInfo {
    let mut info = horizontal.clone();
    if name.len() == 1 {
        // Latin letters, digits and punctuation lie on their side.
        let metrics = font.metrics();
        let offset_x = (metrics.cap_height + metrics.x_height) * 0.25;
        info.extra_matrix = Affine::translate((-offset_x as f64, 0.0)) * Affine::rotate(FRAC_PI_2);
        info.ascent += offset_x;
        info.descent += offset_x;
    } else {
        let first = glyph_ids.first().copied().unwrap_or(0);
        let offset = if first == 0 {
            Vec2::new(-(horizontal.advance as f64) * 0.5, -(font.metrics().ascent as f64))
        } else {
            font.vertical_offset(first)
        };
        info.extra_matrix = Affine::translate(offset);
        let width = info.advance;
        let vertical_advance: f32 = glyph_ids.iter().map(|&id| font.advance(id, true)).sum();
        info.advance = if vertical_advance > 0.0 {
            vertical_advance
        } else {
            width
        };
        info.ascent = -width * 0.5;
        info.descent = width * 0.5;
    }
    info.origin = info.extra_matrix * Point::ZERO;
    if info.bounds.area() > 0.0 {
        info.bounds = info.extra_matrix.transform_rect_bbox(info.bounds);
    }
    info
}
