//! Line breaking, box fitting and justification in the horizontal frame.

use kurbo::{Point, Rect, Vec2};
use pag_core::ParagraphJustification;

use super::{GlyphLayout, ParagraphLayout, EMPTY_LINE_WIDTH};

/// Smallest font size box fitting shrinks to.
const MIN_FIT_FONT_SIZE: f32 = 5.0;

/// Returns the index after the last glyph of the line starting at `index`
/// and that line's width. A line break glyph ends the line and is
/// consumed without adding width.
pub fn calculate_next_line_index(
    glyphs: &[GlyphLayout],
    mut index: usize,
    scale: f32,
    max_width: f32,
    tracking: f32,
) -> (usize, f32) {
    let mut line_width = 0.0;
    let mut has_previous = false;
    while index < glyphs.len() {
        let glyph = &glyphs[index];
        index += 1;
        if glyph.line_break {
            break;
        }
        line_width += glyph.advance * scale;
        if has_previous {
            line_width += tracking;
        }
        has_previous = true;
        let next_width = glyphs.get(index).map_or(0.0, |next| next.advance * scale);
        if line_width + tracking + next_width > max_width {
            break;
        }
    }
    (index, line_width)
}

/// Largest scale, in whole-point font size steps, at which every line
/// fits between `visible_top` and `visible_bottom`. Returns the scale and
/// the number of lines counted by the last attempt.
pub(crate) fn calculate_glyph_scale(
    layout: &ParagraphLayout,
    box_rect: Rect,
    glyphs: &[GlyphLayout],
    font_size: f32,
    visible_top: f32,
    visible_bottom: f32,
) -> (f32, usize) {
    let max_width = box_rect.width() as f32;
    let mut size = font_size;
    loop {
        let scale = size / font_size;
        let tracking = layout.tracking * scale;
        let line_gap = layout.line_gap * scale;
        let mut baseline = visible_top - layout.font_top * scale;
        let mut fits = true;
        let mut index = 0;
        let mut total_lines = 0;
        while index < glyphs.len() {
            index = calculate_next_line_index(glyphs, index, scale, max_width, tracking).0;
            // The baseline itself may fall below the box even when the
            // descent still fits.
            if baseline + layout.font_bottom * scale > visible_bottom
                || baseline > box_rect.y1 as f32
            {
                fits = false;
                break;
            }
            baseline += line_gap;
            total_lines += 1;
        }
        if fits || size <= MIN_FIT_FONT_SIZE {
            if !fits && size < font_size {
                log::debug!("Text box fit clamped at {}pt (from {}pt)", size, font_size);
            }
            return (scale, total_lines);
        }
        size = (size - 1.0).max(MIN_FIT_FONT_SIZE);
    }
}

/// Shrinks text that overflows the box, or centers the lines vertically
/// when the box has room to spare.
pub(crate) fn adjust_to_fit_box(
    layout: &mut ParagraphLayout,
    glyphs: &mut [GlyphLayout],
    font_size: f32,
) {
    let Some(box_rect) = layout.box_rect else {
        return;
    };
    if layout.line_gap <= 0.0 {
        return;
    }
    let box_y_offset = layout.first_baseline - box_rect.y0 as f32;
    let box_lines = ((box_rect.height() as f32 - box_y_offset) / layout.line_gap).floor() + 1.0;
    let visible_top = layout.first_baseline + layout.font_top;
    let visible_bottom =
        layout.first_baseline + layout.line_gap * (box_lines - 1.0) + layout.font_bottom;
    let (scale, total_lines) =
        calculate_glyph_scale(layout, box_rect, glyphs, font_size, visible_top, visible_bottom);
    if scale != 1.0 {
        layout.glyph_scale = scale;
        layout.first_baseline = visible_top - layout.font_top * scale;
        if total_lines == 1 {
            layout.first_baseline += (1.0 - scale) * 0.5 * layout.line_gap;
        }
        layout.font_top *= scale;
        layout.font_bottom *= scale;
        layout.tracking *= scale;
        layout.line_gap *= scale;
        for glyph in glyphs.iter_mut() {
            glyph.advance *= scale;
            glyph.bounds = glyph.bounds.scale_from_origin(scale as f64);
        }
    } else if (total_lines as f32) < box_lines {
        layout.first_baseline += (box_lines - total_lines as f32) * layout.line_gap * 0.5;
    }
}

/// Start x of a line.
pub fn calculate_draw_x(
    justification: ParagraphJustification,
    line_width: f32,
    is_last_line: bool,
    box_rect: Option<Rect>,
) -> f32 {
    use ParagraphJustification::*;
    let Some(box_rect) = box_rect else {
        return match justification {
            CenterJustify => -line_width * 0.5,
            RightJustify => -line_width,
            _ => 0.0,
        };
    };
    let left = box_rect.x0 as f32;
    let center = box_rect.center().x as f32;
    let right = box_rect.x1 as f32;
    match justification {
        CenterJustify => center - line_width * 0.5,
        RightJustify => right - line_width,
        FullJustifyLastLineCenter if is_last_line => center - line_width * 0.5,
        FullJustifyLastLineRight if is_last_line => right - line_width,
        _ => left,
    }
}

/// Spacing added after each glyph of a line. Full justification spreads
/// the free box width over the gaps between glyphs.
pub fn calculate_letter_spacing(
    justification: ParagraphJustification,
    tracking: f32,
    line_width: f32,
    line_glyph_count: usize,
    is_last_line: bool,
    box_rect: Option<Rect>,
) -> f32 {
    use ParagraphJustification::*;
    let Some(box_rect) = box_rect else {
        return tracking;
    };
    if line_glyph_count < 2 {
        return tracking;
    }
    let gaps = (line_glyph_count - 1) as f32;
    let justify = (box_rect.width() as f32 - line_width + gaps * tracking) / gaps;
    match justification {
        FullJustifyLastLineLeft | FullJustifyLastLineCenter | FullJustifyLastLineRight => {
            if is_last_line {
                tracking
            } else {
                justify
            }
        }
        FullJustifyLastLineFull => justify,
        _ => tracking,
    }
}

/// Result of [`apply_layout_to_glyphs`].
pub(crate) struct LaidOutLines {
    /// Indices into the glyph layouts, one list per non-empty line.
    pub lines: Vec<Vec<usize>>,
    pub bounds: Option<Rect>,
    /// Topmost glyph edge of the first line (≤ 0 relative to its baseline
    /// at 0), or the font top when that line is empty.
    pub first_line_min_ascent: f32,
}

/// Breaks glyphs into lines and positions them. Lines whose baseline
/// falls below the box are dropped.
pub(crate) fn apply_layout_to_glyphs(
    layout: &ParagraphLayout,
    glyphs: &mut [GlyphLayout],
) -> LaidOutLines {
    let (max_width, max_y) = match layout.box_rect {
        Some(box_rect) => (box_rect.width() as f32, box_rect.y1 as f32),
        None => (f32::INFINITY, f32::INFINITY),
    };
    let mut result = LaidOutLines {
        lines: Vec::new(),
        bounds: None,
        first_line_min_ascent: 0.0,
    };
    let mut index = 0;
    let mut line_index = 0;
    let mut baseline = layout.first_baseline;
    while index < glyphs.len() {
        if baseline > max_y {
            break;
        }
        let line_start = index;
        let (next_index, line_width) =
            calculate_next_line_index(glyphs, index, 1.0, max_width, layout.tracking);
        let has_line_break = glyphs[next_index - 1].line_break;
        let line_end = next_index - usize::from(has_line_break);
        index = next_index;
        let is_last_line = index == glyphs.len() || has_line_break;
        let mut draw_x =
            calculate_draw_x(layout.justification, line_width, is_last_line, layout.box_rect);
        let draw_y = baseline - layout.baseline_shift;
        let letter_spacing = calculate_letter_spacing(
            layout.justification,
            layout.tracking,
            line_width,
            line_end - line_start,
            is_last_line,
            layout.box_rect,
        );

        let mut line = Vec::with_capacity(line_end - line_start);
        for (i, glyph) in glyphs.iter_mut().enumerate().take(line_end).skip(line_start) {
            glyph.position = Point::new(draw_x as f64, draw_y as f64);
            glyph.bounds = glyph.bounds + Vec2::new(draw_x as f64, draw_y as f64);
            result.bounds = join(result.bounds, glyph.bounds);
            line.push(i);
            draw_x += glyph.advance + letter_spacing;
        }

        if line_index == 0 {
            result.first_line_min_ascent = if line.is_empty() {
                layout.font_top
            } else {
                line.iter()
                    .map(|&i| glyphs[i].bounds.y0 as f32)
                    .fold(0.0, f32::min)
            };
        }
        if line.is_empty() {
            let empty_line = Rect::new(
                draw_x as f64,
                (draw_y + layout.font_top) as f64,
                (draw_x + EMPTY_LINE_WIDTH) as f64,
                (draw_y + layout.font_bottom) as f64,
            );
            result.bounds = join(result.bounds, empty_line);
        } else {
            result.lines.push(line);
        }
        baseline += layout.line_gap;
        line_index += 1;
    }
    result
}

/// Union that ignores rects without area.
fn join(bounds: Option<Rect>, rect: Rect) -> Option<Rect> {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return bounds;
    }
    Some(bounds.map_or(rect, |b| b.union(rect)))
}
