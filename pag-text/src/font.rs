//! Font: a typeface at a given size, with synthetic bold/italic.
//!
//! All accessors return values scaled from font units to the font size.

use std::fmt;

use kurbo::{Affine, BezPath, Rect, Vec2};

use crate::typeface::{FontMetrics, GlyphId, GlyphImage, TypefaceRef};

pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Outset applied to glyph bounds (and stroke width used when
/// rasterizing) for synthetic bold, relative to the font size.
const FAUX_BOLD_SCALE: f32 = 1.0 / 24.0;
/// Horizontal shear for synthetic italic (y-down).
const FAUX_ITALIC_SKEW: f64 = -0.25;

#[derive(Clone)]
pub struct Font {
    typeface: TypefaceRef,
    size: f32,
    faux_bold: bool,
    faux_italic: bool,
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("typeface", &self.typeface.unique_id())
            .field("family", &self.typeface.font_family())
            .field("size", &self.size)
            .field("faux_bold", &self.faux_bold)
            .field("faux_italic", &self.faux_italic)
            .finish()
    }
}

impl Font {
    /// Non-positive sizes fall back to [`DEFAULT_FONT_SIZE`].
    pub fn new(typeface: TypefaceRef, size: f32) -> Self {
        Self {
            typeface,
            size: if size > 0.0 { size } else { DEFAULT_FONT_SIZE },
            faux_bold: false,
            faux_italic: false,
        }
    }

    pub fn typeface(&self) -> &TypefaceRef {
        &self.typeface
    }

    pub fn with_typeface(&self, typeface: TypefaceRef) -> Self {
        Self {
            typeface,
            ..self.clone()
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Ignores non-positive sizes.
    pub fn set_size(&mut self, size: f32) {
        if size > 0.0 {
            self.size = size;
        }
    }

    pub fn with_size(&self, size: f32) -> Self {
        let mut font = self.clone();
        font.set_size(size);
        font
    }

    pub fn is_faux_bold(&self) -> bool {
        self.faux_bold
    }

    pub fn set_faux_bold(&mut self, faux_bold: bool) {
        self.faux_bold = faux_bold;
    }

    pub fn is_faux_italic(&self) -> bool {
        self.faux_italic
    }

    pub fn set_faux_italic(&mut self, faux_italic: bool) {
        self.faux_italic = faux_italic;
    }

    /// Font units → size.
    fn scale(&self) -> f64 {
        self.size as f64 / self.typeface.units_per_em().max(1) as f64
    }

    fn glyph_matrix(&self) -> Affine {
        let scale = Affine::scale(self.scale());
        if self.faux_italic {
            Affine::skew(FAUX_ITALIC_SKEW, 0.0) * scale
        } else {
            scale
        }
    }

    /// Stroke width that thickens outlines for synthetic bold, 0 otherwise.
    pub fn faux_bold_width(&self) -> f32 {
        if self.faux_bold {
            self.size * FAUX_BOLD_SCALE
        } else {
            0.0
        }
    }

    pub fn glyph_id(&self, unichar: char) -> GlyphId {
        self.typeface.glyph_id(unichar)
    }

    /// Looks up the first character of a UTF-8 name; 0 when unmapped.
    pub fn glyph_id_for_name(&self, name: &str) -> GlyphId {
        name.chars().next().map(|c| self.glyph_id(c)).unwrap_or(0)
    }

    pub fn metrics(&self) -> FontMetrics {
        self.typeface.metrics().scaled(self.scale() as f32)
    }

    pub fn advance(&self, glyph_id: GlyphId, vertical: bool) -> f32 {
        self.typeface.advance(glyph_id, vertical) * self.scale() as f32
    }

    /// Tight bounds relative to the glyph origin; zero when the glyph has
    /// no visible content.
    pub fn bounds(&self, glyph_id: GlyphId) -> Rect {
        let Some(bounds) = self.typeface.bounds(glyph_id) else {
            return Rect::ZERO;
        };
        let bounds = self.glyph_matrix().transform_rect_bbox(bounds);
        let outset = self.faux_bold_width() as f64 * 0.5;
        if outset > 0.0 {
            bounds.inflate(outset, outset)
        } else {
            bounds
        }
    }

    pub fn path(&self, glyph_id: GlyphId) -> Option<BezPath> {
        let mut path = self.typeface.outline(glyph_id)?;
        path.apply_affine(self.glyph_matrix());
        Some(path)
    }

    /// Color image resampled to the font size.
    pub fn image(&self, glyph_id: GlyphId) -> Option<GlyphImage> {
        self.typeface.image(glyph_id, self.size)?.scaled_to(self.size)
    }

    /// True when the glyph draws something: a non-empty outline or an image.
    pub fn has_renderable_content(&self, glyph_id: GlyphId) -> bool {
        if glyph_id == 0 {
            return false;
        }
        let has_path = self
            .typeface
            .outline(glyph_id)
            .is_some_and(|path| !path.elements().is_empty());
        has_path || self.typeface.has_color() && self.typeface.image(glyph_id, self.size).is_some()
    }

    /// Offset that moves a glyph from its horizontal origin to the
    /// top-center origin used in vertical text.
    pub fn vertical_offset(&self, glyph_id: GlyphId) -> Vec2 {
        let scale = self.scale() as f32;
        let origin_y = self
            .typeface
            .vertical_origin(glyph_id)
            .map(|y| y * scale)
            .unwrap_or_else(|| -self.metrics().ascent);
        Vec2::new(
            (-self.advance(glyph_id, false) * 0.5) as f64,
            origin_y as f64,
        )
    }
}
