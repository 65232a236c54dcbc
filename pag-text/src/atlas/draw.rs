//! Instanced draw data for atlas-cached text.
//!
//! Each instance is one textured quad: the glyph's rect in atlas pixels,
//! the UVs of its page region and the transform that places it in text
//! space.

use bytemuck::{Pod, Zeroable};
use kurbo::Affine;
use pag_core::Color;
use smallvec::SmallVec;

use super::TextAtlas;
use crate::glyph::PaintStyle;
use crate::text_glyphs::TextGlyphs;

/// 80 bytes per instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    /// Atlas pixels → text space, as `[a, b, c, d, e, f]`.
    pub transform: [f32; 6],
    /// Quad in atlas pixels relative to the glyph origin: x0, y0, x1, y1.
    pub rect: [f32; 4],
    /// Normalized page coordinates: u0, v0, u1, v1.
    pub uv: [f32; 4],
    /// RGBA multiplied with mask coverage; white for color pages.
    pub color: [f32; 4],
    pub texture_index: u32,
    /// 1 when the page holds RGBA pixels.
    pub is_color: u32,
}

/// Builds the quads for every glyph of `text_glyphs` that `atlas` holds.
/// Stroke-and-fill glyphs produce two quads, ordered by `stroke_over_fill`.
pub fn collect_glyph_instances<T>(atlas: &TextAtlas<T>, text_glyphs: &TextGlyphs) -> Vec<GlyphInstance> {
    let inverse_scale = 1.0 / atlas.max_scale() as f64;
    let mut instances = Vec::with_capacity(text_glyphs.glyph_count());
    for glyph in text_glyphs.glyphs() {
        if glyph.is_blank() {
            continue;
        }
        let transform = glyph.total_matrix() * Affine::scale(inverse_scale);
        let paint = glyph.paint();
        let passes: SmallVec<[(PaintStyle, Color); 2]> = if glyph.font().typeface().has_color() {
            SmallVec::from_slice(&[(glyph.style(), Color::WHITE)])
        } else {
            let fill = (PaintStyle::Fill, paint.fill_color);
            let stroke = (PaintStyle::Stroke, paint.stroke_color);
            match paint.style {
                PaintStyle::Fill => SmallVec::from_slice(&[fill]),
                PaintStyle::Stroke => SmallVec::from_slice(&[stroke]),
                PaintStyle::StrokeAndFill if paint.stroke_over_fill => SmallVec::from_slice(&[fill, stroke]),
                PaintStyle::StrokeAndFill => SmallVec::from_slice(&[stroke, fill]),
            }
        };
        for (style, color) in passes {
            let Some(locator) = atlas.glyph_locator(glyph, style) else {
                continue;
            };
            let bounds = locator.glyph_bounds;
            let uv = locator.uv;
            instances.push(GlyphInstance {
                transform: transform.as_coeffs().map(|v| v as f32),
                rect: [bounds.x0 as f32, bounds.y0 as f32, bounds.x1 as f32, bounds.y1 as f32],
                uv: [uv.x0 as f32, uv.y0 as f32, uv.x1 as f32, uv.y1 as f32],
                color: color.to_rgba_f32(),
                texture_index: locator.image_index as u32,
                is_color: atlas.is_color_page(locator.image_index) as u32,
            });
        }
    }
    instances
}
