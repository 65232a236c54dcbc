//! Software rasterization of atlas pages.
//!
//! Mask pages hold one coverage byte per pixel and are drawn with
//! `swash::zeno`. Color pages are straight-alpha RGBA: color glyph images
//! are composited as they are, outlines are filled with the run's color.

use kurbo::{Affine, BezPath, PathEl, Vec2};
use smallvec::SmallVec;
use swash::zeno::{Command, Fill, Mask, Placement, Stroke, Vector};

use crate::font::Font;
use crate::glyph::{PaintStyle, TextPaint};
use crate::typeface::GlyphId;

/// Glyphs of one page drawn with the same font and paint.
#[derive(Clone, Debug)]
pub(crate) struct TextRun {
    pub font: Font,
    pub paint: TextPaint,
    pub glyphs: Vec<RunGlyph>,
}

#[derive(Clone, Debug)]
pub(crate) struct RunGlyph {
    pub glyph_ids: SmallVec<[GlyphId; 1]>,
    /// Glyph origin in page pixels.
    pub origin: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Coverage {
    Fill,
    Stroke(f32),
}

/// Outline of a cluster, glyphs placed one after another.
pub(crate) fn cluster_outline(font: &Font, glyph_ids: &[GlyphId]) -> BezPath {
    let mut outline = BezPath::new();
    let mut advance = 0.0f32;
    for &id in glyph_ids {
        if let Some(mut path) = font.path(id) {
            path.apply_affine(Affine::translate((advance as f64, 0.0)));
            outline.extend(path.elements().iter().copied());
        }
        advance += font.advance(id, false);
    }
    outline
}

pub(crate) fn draw_mask_page(width: u32, height: u32, runs: &[TextRun]) -> Vec<u8> {
    let mut pixels = vec![0u8; width as usize * height as usize];
    for run in runs {
        let coverages = coverages_for(&run.font, &run.paint);
        for glyph in &run.glyphs {
            let mut path = cluster_outline(&run.font, &glyph.glyph_ids);
            path.apply_affine(Affine::translate(glyph.origin));
            for &coverage in &coverages {
                if let Some((mask, placement)) = render_coverage(&path, coverage) {
                    blit(&mask, placement, width, height, |index, value| {
                        pixels[index] = pixels[index].max(value);
                    });
                }
            }
        }
    }
    pixels
}

pub(crate) fn draw_color_page(width: u32, height: u32, runs: &[TextRun]) -> Vec<u8> {
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    for run in runs {
        for glyph in &run.glyphs {
            if run.font.typeface().has_color() {
                draw_images(&mut pixels, width, height, &run.font, glyph);
            } else {
                draw_colored_outline(&mut pixels, width, height, run, glyph);
            }
        }
    }
    pixels
}

fn draw_images(pixels: &mut [u8], width: u32, height: u32, font: &Font, glyph: &RunGlyph) {
    let mut advance = 0.0f32;
    for &id in &glyph.glyph_ids {
        if let Some(image) = font.image(id) {
            let left = (glyph.origin.x as f32 + advance + image.left).round() as i32;
            let top = (glyph.origin.y as f32 + image.top).round() as i32;
            let placement = Placement {
                left,
                top,
                width: image.width,
                height: image.height,
            };
            for_each_pixel(placement, width, height, |source, target| {
                let offset = source * 4;
                if let Some(src) = image.pixels.get(offset..offset + 4) {
                    blend(&mut pixels[target * 4..target * 4 + 4], [src[0], src[1], src[2], src[3]]);
                }
            });
        }
        advance += font.advance(id, false);
    }
}

fn draw_colored_outline(pixels: &mut [u8], width: u32, height: u32, run: &TextRun, glyph: &RunGlyph) {
    let color = if run.paint.style == PaintStyle::Stroke {
        run.paint.stroke_color
    } else {
        run.paint.fill_color
    };
    let mut path = cluster_outline(&run.font, &glyph.glyph_ids);
    path.apply_affine(Affine::translate(glyph.origin));
    for coverage in coverages_for(&run.font, &run.paint) {
        if let Some((mask, placement)) = render_coverage(&path, coverage) {
            blit(&mask, placement, width, height, |index, value| {
                blend(
                    &mut pixels[index * 4..index * 4 + 4],
                    [color.red, color.green, color.blue, value],
                );
            });
        }
    }
}

/// Faux bold thickens outlines with an extra stroke.
fn coverages_for(font: &Font, paint: &TextPaint) -> SmallVec<[Coverage; 2]> {
    let faux_bold = font.faux_bold_width();
    let mut coverages = SmallVec::new();
    if paint.style == PaintStyle::Stroke {
        coverages.push(Coverage::Stroke(paint.stroke_width + faux_bold));
    } else {
        coverages.push(Coverage::Fill);
        if faux_bold > 0.0 {
            coverages.push(Coverage::Stroke(faux_bold));
        }
    }
    coverages
}

fn render_coverage(path: &BezPath, coverage: Coverage) -> Option<(Vec<u8>, Placement)> {
    if path.elements().is_empty() {
        return None;
    }
    let commands = to_commands(path);
    let commands: &[Command] = &commands;
    let mut mask = Mask::new(&commands);
    match coverage {
        Coverage::Fill => mask.style(Fill::NonZero),
        Coverage::Stroke(width) if width > 0.0 => mask.style(Stroke::new(width)),
        Coverage::Stroke(_) => return None,
    };
    let (data, placement) = mask.render();
    if placement.width == 0 || placement.height == 0 {
        return None;
    }
    Some((data, placement))
}

fn to_commands(path: &BezPath) -> Vec<Command> {
    let vector = |p: kurbo::Point| Vector::new(p.x as f32, p.y as f32);
    path.elements()
        .iter()
        .map(|element| match *element {
            PathEl::MoveTo(p) => Command::MoveTo(vector(p)),
            PathEl::LineTo(p) => Command::LineTo(vector(p)),
            PathEl::QuadTo(c, p) => Command::QuadTo(vector(c), vector(p)),
            PathEl::CurveTo(c1, c2, p) => Command::CurveTo(vector(c1), vector(c2), vector(p)),
            PathEl::ClosePath => Command::Close,
        })
        .collect()
}

/// Copies non-zero coverage into a `width` × `height` page.
fn blit(mask: &[u8], placement: Placement, width: u32, height: u32, mut write: impl FnMut(usize, u8)) {
    for_each_pixel(placement, width, height, |source, target| {
        let value = mask.get(source).copied().unwrap_or(0);
        if value > 0 {
            write(target, value);
        }
    });
}

/// Visits the pixels of `placement` that land inside the page, passing
/// (index in placement, index in page).
fn for_each_pixel(placement: Placement, width: u32, height: u32, mut visit: impl FnMut(usize, usize)) {
    for row in 0..placement.height {
        let y = placement.top + row as i32;
        if y < 0 || y >= height as i32 {
            continue;
        }
        for column in 0..placement.width {
            let x = placement.left + column as i32;
            if x < 0 || x >= width as i32 {
                continue;
            }
            let source = (row * placement.width + column) as usize;
            let target = y as usize * width as usize + x as usize;
            visit(source, target);
        }
    }
}

/// Source-over in straight alpha.
fn blend(dst: &mut [u8], src: [u8; 4]) {
    let src_alpha = src[3] as f32 / 255.0;
    if src_alpha <= 0.0 {
        return;
    }
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    for c in 0..3 {
        let value = (src[c] as f32 * src_alpha + dst[c] as f32 * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}
