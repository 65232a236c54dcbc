//! Paragraph layout: positions the glyphs of a [`TextDocument`].
//!
//! ```text
//! TextDocument
//!     │ create_glyphs            shape + style; vertical bounds rotated
//!     ▼                          into the horizontal frame
//! Vec<Glyph> + Vec<GlyphLayout>
//!     │ create_text_layout       box, first baseline, line gap, tracking
//!     │ adjust_to_fit_box        shrink or center inside the box
//!     │ apply_layout_to_glyphs   line breaks, alignment, justification
//!     │ apply_matrix_to_glyphs   horizontal frame → text space
//!     ▼
//! TextGlyphs
//! ```
//!
//! Every direction is laid out as horizontal lines from (0, 0). Vertical
//! text is turned into columns by the coordinate matrix at the end.

mod lines;

use std::f64::consts::FRAC_PI_2;

use kurbo::{Affine, Point, Rect};
use pag_core::{ParagraphJustification, TextDocument};

use crate::font::Font;
use crate::glyph::{Glyph, TextPaint};
use crate::shaper::Shaper;
use crate::text_glyphs::TextGlyphs;
use crate::typeface::{PathTypefaceBuilder, TypefaceRef};

pub use lines::{calculate_draw_x, calculate_letter_spacing, calculate_next_line_index};

/// Automatic line gap as a multiple of the font size.
pub const LINE_GAP_FACTOR: f32 = 1.2;
/// Width given to empty lines in the text bounds.
pub const EMPTY_LINE_WIDTH: f32 = 1.0;

/// Layout state of one glyph in the horizontal frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphLayout {
    /// Index into the paragraph's glyph list.
    pub glyph_index: usize,
    pub advance: f32,
    /// Baseline origin, set when the glyph is placed on a line.
    pub position: Point,
    /// Relative to the origin before placement, absolute after.
    pub bounds: Rect,
    pub line_break: bool,
}

/// Paragraph-wide layout parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ParagraphLayout {
    pub font_top: f32,
    pub font_bottom: f32,
    pub line_gap: f32,
    pub tracking: f32,
    pub first_baseline: f32,
    pub baseline_shift: f32,
    pub justification: ParagraphJustification,
    /// Text box in the horizontal frame, `None` for point text.
    pub box_rect: Option<Rect>,
    pub glyph_scale: f32,
    /// Horizontal frame → text space.
    pub coordinate_matrix: Affine,
}

impl Default for ParagraphLayout {
    fn default() -> Self {
        Self {
            font_top: 0.0,
            font_bottom: 0.0,
            line_gap: 0.0,
            tracking: 0.0,
            first_baseline: 0.0,
            baseline_shift: 0.0,
            justification: ParagraphJustification::LeftJustify,
            box_rect: None,
            glyph_scale: 1.0,
            coordinate_matrix: Affine::IDENTITY,
        }
    }
}

fn box_rect(width: f32, height: f32) -> Option<Rect> {
    (width > 0.0 && height > 0.0).then(|| Rect::new(0.0, 0.0, width as f64, height as f64))
}

// ── Glyph creation ──────────────────────────────────────────────────

/// Typeface for a paragraph: registered or exact system match, then the
/// first fallback. With neither, an empty typeface so every character
/// becomes a blank.
fn paragraph_typeface(document: &TextDocument, shaper: &Shaper) -> TypefaceRef {
    let registry = shaper.registry();
    registry
        .typeface_without_fallback(&document.font_family, &document.font_style)
        .or_else(|| registry.fallback_typefaces().into_iter().next())
        .unwrap_or_else(|| {
            PathTypefaceBuilder::new(&document.font_family, &document.font_style, 1000).build()
        })
}

/// Shapes and styles the document text.
pub fn build_glyphs(document: &TextDocument, shaper: &Shaper) -> Vec<Glyph> {
    let mut font = Font::new(paragraph_typeface(document, shaper), document.font_size);
    font.set_faux_bold(document.faux_bold);
    font.set_faux_italic(document.faux_italic);
    Glyph::build_from_text(
        &document.text,
        &font,
        TextPaint::from_document(document),
        document.is_vertical(),
        shaper,
    )
}

/// Layout state for each glyph. Bounds of vertical glyphs are rotated
/// back into the horizontal frame.
pub fn create_glyph_layouts(glyphs: &[Glyph]) -> Vec<GlyphLayout> {
    glyphs
        .iter()
        .enumerate()
        .map(|(glyph_index, glyph)| {
            let mut bounds = glyph.bounds();
            if glyph.is_vertical() && bounds.area() > 0.0 {
                bounds = Affine::rotate(-FRAC_PI_2).transform_rect_bbox(bounds);
            }
            GlyphLayout {
                glyph_index,
                advance: glyph.advance(),
                position: Point::ZERO,
                bounds,
                line_break: glyph.is_line_break(),
            }
        })
        .collect()
}

pub fn create_text_layout(document: &TextDocument, glyphs: &[Glyph]) -> ParagraphLayout {
    let mut layout = ParagraphLayout::default();
    let vertical = document.is_vertical();
    if document.box_text {
        let position = document.box_text_pos;
        let size = document.box_text_size;
        if vertical {
            let box_right = position.x + size.x;
            layout.box_rect = box_rect(size.y, size.x);
            layout.first_baseline = box_right - document.first_baseline;
            layout.coordinate_matrix = Affine::translate((box_right as f64, position.y as f64))
                * Affine::rotate(FRAC_PI_2);
        } else {
            layout.box_rect = box_rect(size.x, size.y);
            layout.first_baseline = document.first_baseline - position.y;
            layout.coordinate_matrix = Affine::translate((position.x as f64, position.y as f64));
        }
    } else if vertical {
        layout.coordinate_matrix = Affine::rotate(FRAC_PI_2);
    }
    layout.line_gap = if document.leading == 0.0 {
        (document.font_size * LINE_GAP_FACTOR).round()
    } else {
        document.leading
    };
    layout.tracking = (document.tracking * document.font_size * 0.001).round();
    layout.baseline_shift = document.baseline_shift;
    layout.justification = document.justification;

    let (min_ascent, max_descent) = ascent_and_descent(glyphs);
    // The line box is split above and below the baseline in the
    // ascent : descent ratio.
    let line_height = document.font_size * LINE_GAP_FACTOR;
    let extent = max_descent - min_ascent;
    layout.font_bottom = if extent > 0.0 {
        max_descent / extent * line_height
    } else {
        0.0
    };
    layout.font_top = layout.font_bottom - line_height;
    layout
}

fn ascent_and_descent(glyphs: &[Glyph]) -> (f32, f32) {
    glyphs.iter().fold((0.0f32, 0.0f32), |(ascent, descent), glyph| {
        (ascent.min(glyph.ascent()), descent.max(glyph.descent()))
    })
}

/// Places glyphs at their text-space positions and drops the line breaks.
fn apply_matrix_to_glyphs(
    layout: &ParagraphLayout,
    lines: &[Vec<usize>],
    glyph_layouts: &[GlyphLayout],
    glyphs: &[Glyph],
) -> Vec<Vec<Glyph>> {
    lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|&i| {
                    let info = &glyph_layouts[i];
                    let mut glyph = glyphs[info.glyph_index].clone();
                    let position = layout.coordinate_matrix * info.position;
                    glyph.set_scale(layout.glyph_scale);
                    glyph.set_matrix(Affine::translate(position.to_vec2()));
                    glyph
                })
                .collect()
        })
        .filter(|line: &Vec<Glyph>| !line.is_empty())
        .collect()
}

// ── Entry points ────────────────────────────────────────────────────

/// Lays out a paragraph as point or box text.
pub fn layout_text(document: &TextDocument, shaper: &Shaper) -> TextGlyphs {
    layout(document, shaper, false)
}

/// Lays out a paragraph to be bent along a path. Horizontal lines keep
/// their relative offsets with the first baseline on the path; box text
/// is shifted down so the top of its first line touches the path.
pub fn layout_text_on_path(document: &TextDocument, shaper: &Shaper) -> TextGlyphs {
    layout(document, shaper, true)
}

fn layout(document: &TextDocument, shaper: &Shaper, on_path: bool) -> TextGlyphs {
    let glyphs = build_glyphs(document, shaper);
    let mut glyph_layouts = create_glyph_layouts(&glyphs);
    let mut layout = create_text_layout(document, &glyphs);
    if document.box_text {
        lines::adjust_to_fit_box(&mut layout, &mut glyph_layouts, document.font_size);
    }
    let path_text = on_path && !document.is_vertical();
    if path_text {
        layout.first_baseline = 0.0;
    }
    let laid_out = lines::apply_layout_to_glyphs(&layout, &mut glyph_layouts);
    if path_text {
        layout.coordinate_matrix = if layout.box_rect.is_some() {
            Affine::translate((0.0, -laid_out.first_line_min_ascent as f64))
        } else {
            Affine::IDENTITY
        };
    }
    let lines = apply_matrix_to_glyphs(&layout, &laid_out.lines, &glyph_layouts, &glyphs);
    let bounds = laid_out
        .bounds
        .map(|bounds| layout.coordinate_matrix.transform_rect_bbox(bounds))
        .unwrap_or(Rect::ZERO);
    TextGlyphs::new(lines, bounds)
}

/// Smallest ascent (≤ 0) and largest descent (≥ 0) over the paragraph's
/// glyphs.
pub fn text_ascent_and_descent(document: &TextDocument, shaper: &Shaper) -> (f32, f32) {
    ascent_and_descent(&build_glyphs(document, shaper))
}
