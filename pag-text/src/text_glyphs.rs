//! TextGlyphs: the laid-out lines of one paragraph, and the glyph sets
//! an atlas is built from.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use kurbo::{Affine, Rect};

use crate::glyph::{Glyph, PaintStyle};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
pub struct TextGlyphs {
    id: u64,
    lines: Vec<Vec<Glyph>>,
    bounds: Rect,
}

impl TextGlyphs {
    /// Every instance gets a fresh id, so atlases built for an older
    /// layout are never reused.
    pub fn new(lines: Vec<Vec<Glyph>>, bounds: Rect) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            lines,
            bounds,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn lines(&self) -> &[Vec<Glyph>] {
        &self.lines
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.lines.iter().flatten()
    }

    pub fn glyph_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.glyph_count() == 0
    }

    /// Union of glyph and empty-line bounds in text space.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Largest scale any glyph is drawn at, 1 when there are no glyphs.
    pub fn max_scale(&self) -> f32 {
        self.glyphs()
            .map(|glyph| glyph.scale() * max_axis_scale(glyph.matrix()))
            .fold(None, |max: Option<f32>, scale| Some(max.map_or(scale, |m| m.max(scale))))
            .unwrap_or(1.0)
    }

    /// Unique outline glyphs rendered at `scale`, horizontal and split
    /// into single-style entries.
    pub fn mask_atlas_glyphs(&self, scale: f32) -> Vec<Glyph> {
        let mut seen = HashSet::new();
        let mut glyphs = Vec::new();
        for glyph in self.glyphs() {
            if glyph.is_blank() || glyph.font().typeface().has_color() {
                continue;
            }
            let styles: &[PaintStyle] = match glyph.style() {
                PaintStyle::StrokeAndFill => &[PaintStyle::Fill, PaintStyle::Stroke],
                PaintStyle::Fill => &[PaintStyle::Fill],
                PaintStyle::Stroke => &[PaintStyle::Stroke],
            };
            for &style in styles {
                if seen.insert(glyph.scaled_atlas_key(scale, style)) {
                    glyphs.push(
                        glyph
                            .make_scaled_glyph(scale)
                            .make_horizontal_glyph()
                            .make_styled_glyph(style),
                    );
                }
            }
        }
        glyphs
    }

    /// Unique color (image) glyphs rendered at `scale`, horizontal.
    pub fn color_atlas_glyphs(&self, scale: f32) -> Vec<Glyph> {
        let mut seen = HashSet::new();
        let mut glyphs = Vec::new();
        for glyph in self.glyphs() {
            if glyph.is_blank() || !glyph.font().typeface().has_color() {
                continue;
            }
            if seen.insert(glyph.scaled_atlas_key(scale, glyph.style())) {
                glyphs.push(glyph.make_scaled_glyph(scale).make_horizontal_glyph());
            }
        }
        glyphs
    }
}

/// Largest length a unit vector can have after `matrix`, ignoring
/// translation.
pub(crate) fn max_axis_scale(matrix: Affine) -> f32 {
    let [a, b, c, d, _, _] = matrix.as_coeffs();
    let x = (a * a + b * b).sqrt();
    let y = (c * c + d * d).sqrt();
    x.max(y) as f32
}
