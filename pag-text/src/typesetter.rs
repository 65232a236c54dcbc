//! Typesetter: turns the Text nodes of a document into glyph runs.
//!
//! ## Architecture
//!
//! ```text
//! Document
//!   ├── layers ──► contents ──► scope: Text siblings + last TextLayout
//!   │                │              ├── shape each Text (FontRegistry + Shaper)
//!   │                │              ├── per-line alignment offset (TextAlign)
//!   │                │              └── TypesetText { runs, width }
//!   │                └── groups ──► nested scopes
//!   ├── child layers (recursive)
//!   └── compositions ──► layers (same walk)
//! ```
//!
//! The scene graph is only read. Results are returned keyed by the Text
//! node id, so typesetting the same document twice with the same fonts
//! yields identical runs.

use std::sync::Arc;
use std::time::Instant;

use pag_core::{Document, Element, Layer, Text, TextAlign, TextDocument, TextLayout};
use uuid::Uuid;

use crate::font::Font;
use crate::layout::{self, LINE_GAP_FACTOR};
use crate::registry::FontRegistry;
use crate::shaper::Shaper;
use crate::text_glyphs::TextGlyphs;
use crate::typeface::{same_typeface, GlyphId, TypefaceRef};

// ── Output ──────────────────────────────────────────────────────────

/// Consecutive glyphs of one line drawn with the same font.
#[derive(Clone, Debug)]
pub struct GlyphRun {
    pub font: Font,
    pub glyph_ids: Vec<GlyphId>,
    /// Baseline x of each glyph, relative to the Text position.
    pub x_positions: Vec<f32>,
    /// Baseline y, relative to the Text position.
    pub y: f32,
}

impl GlyphRun {
    fn new(font: Font, y: f32) -> Self {
        Self {
            font,
            glyph_ids: Vec::new(),
            x_positions: Vec::new(),
            y,
        }
    }
}

/// Typeset form of one Text node.
#[derive(Clone, Debug)]
pub struct TypesetText {
    pub text_id: Uuid,
    pub runs: Vec<GlyphRun>,
    /// Width of the widest line, without trailing letter spacing.
    pub width: f32,
}

impl TypesetText {
    pub fn glyph_count(&self) -> usize {
        self.runs.iter().map(|run| run.glyph_ids.len()).sum()
    }
}

/// Every typeset Text node of a document, in document order.
#[derive(Clone, Debug, Default)]
pub struct TypesetDocument {
    texts: Vec<TypesetText>,
}

impl TypesetDocument {
    pub fn texts(&self) -> &[TypesetText] {
        &self.texts
    }

    pub fn get(&self, text_id: Uuid) -> Option<&TypesetText> {
        self.texts.iter().find(|text| text.text_id == text_id)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Horizontal offset applied to a line of `width` for `align`. Justify
/// needs a box, so it behaves like Start here.
pub fn calculate_layout_offset(align: TextAlign, width: f32) -> f32 {
    match align {
        TextAlign::Start | TextAlign::Justify => 0.0,
        TextAlign::Center => -0.5 * width,
        TextAlign::End => -width,
    }
}

struct ShapedLine {
    runs: Vec<GlyphRun>,
    width: f32,
}

// ── Typesetter ──────────────────────────────────────────────────────

pub struct Typesetter {
    shaper: Shaper,
}

impl Typesetter {
    pub fn new(registry: Arc<FontRegistry>) -> Self {
        Self::with_shaper(Shaper::new(registry))
    }

    pub fn with_shaper(shaper: Shaper) -> Self {
        Self { shaper }
    }

    pub fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    pub fn registry(&self) -> &Arc<FontRegistry> {
        self.shaper.registry()
    }

    pub fn register_typeface(&self, typeface: TypefaceRef) {
        self.registry().register_typeface(typeface);
    }

    pub fn set_fallback_typefaces(&self, typefaces: Vec<TypefaceRef>) {
        self.registry().set_fallback_typefaces(typefaces);
    }

    /// Unregisters a typeface and drops shaping state prepared for it.
    pub fn unregister_typeface(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        let removed = self.registry().unregister_typeface(family, style)?;
        self.shaper.purge_caches();
        Some(removed)
    }

    /// Typesets every Text node of `document`. Nodes that produce no
    /// glyphs are left out.
    pub fn create_text_glyphs(&self, document: &Document) -> TypesetDocument {
        let start = Instant::now();
        let mut result = TypesetDocument::default();
        self.typeset_layers(&document.layers, &mut result);
        for composition in &document.compositions {
            self.typeset_layers(&composition.layers, &mut result);
        }
        log::debug!(
            "Typesetter: {} text nodes in {:.2}ms",
            result.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        result
    }

    /// Lays out a paragraph with box, justification and vertical support.
    pub fn layout_paragraph(&self, document: &TextDocument) -> TextGlyphs {
        layout::layout_text(document, &self.shaper)
    }

    fn typeset_layers(&self, layers: &[Layer], result: &mut TypesetDocument) {
        for layer in layers {
            self.typeset_scope(&layer.contents, result);
            self.typeset_layers(&layer.children, result);
        }
    }

    fn typeset_scope(&self, elements: &[Element], result: &mut TypesetDocument) {
        let mut texts = Vec::new();
        let mut groups = Vec::new();
        let mut text_layout = None;
        for element in elements {
            match element {
                Element::Text(text) => texts.push(text),
                Element::TextLayout(layout) => text_layout = Some(layout),
                Element::Group(group) => groups.push(group),
            }
        }
        for text in texts {
            if let Some(typeset) = self.typeset_text(text, text_layout) {
                result.texts.push(typeset);
            }
        }
        for group in groups {
            self.typeset_scope(&group.elements, result);
        }
    }

    /// Typesets one Text node under an optional TextLayout modifier.
    pub fn typeset_text(&self, text: &Text, text_layout: Option<&TextLayout>) -> Option<TypesetText> {
        if text.text.is_empty() {
            return None;
        }
        let lines = self.shape_text(text);
        let (align, offset_x, offset_y) = match text_layout {
            Some(layout) if !layout.position.is_zero() => (
                layout.text_align,
                layout.position.x - text.position.x,
                layout.position.y - text.position.y,
            ),
            Some(layout) => (layout.text_align, 0.0, 0.0),
            None => (TextAlign::Start, 0.0, 0.0),
        };

        let mut runs = Vec::new();
        let mut width = 0.0f32;
        for line in lines {
            width = width.max(line.width);
            let x = calculate_layout_offset(align, line.width) + offset_x;
            for mut run in line.runs {
                for position in &mut run.x_positions {
                    *position += x;
                }
                run.y += offset_y;
                runs.push(run);
            }
        }
        if runs.is_empty() {
            return None;
        }
        Some(TypesetText {
            text_id: text.id,
            runs,
            width,
        })
    }

    fn shape_text(&self, text: &Text) -> Vec<ShapedLine> {
        let Some(typeface) = self
            .registry()
            .find_typeface(&text.font_family, &text.font_style)
        else {
            log::debug!("Typesetter: no typeface for \"{}\"", text.font_family);
            return Vec::new();
        };
        let font = Font::new(typeface, text.font_size);
        let line_height = (font.size() * LINE_GAP_FACTOR).round();
        text.text
            .split('\n')
            .enumerate()
            .map(|(index, line)| {
                self.shape_line(line, &font, text.letter_spacing, index as f32 * line_height)
            })
            .collect()
    }

    /// Unmapped clusters take no space. Mapped glyphs without an outline
    /// or image (spaces) take space but are left out of the runs.
    fn shape_line(&self, line: &str, primary: &Font, letter_spacing: f32, y: f32) -> ShapedLine {
        let mut runs: Vec<GlyphRun> = Vec::new();
        let mut current_x = 0.0;
        let mut has_glyph = false;
        for shaped in self.shaper.shape(line, Some(primary.typeface())) {
            let Some(typeface) = shaped.typeface else {
                continue;
            };
            let font = primary.with_typeface(typeface);
            for &glyph_id in &shaped.glyph_ids {
                if font.has_renderable_content(glyph_id) {
                    let new_run = runs
                        .last()
                        .map_or(true, |run| !same_typeface(run.font.typeface(), font.typeface()));
                    if new_run {
                        runs.push(GlyphRun::new(font.clone(), y));
                    }
                    if let Some(run) = runs.last_mut() {
                        run.glyph_ids.push(glyph_id);
                        run.x_positions.push(current_x);
                    }
                }
                current_x += font.advance(glyph_id, false);
            }
            current_x += letter_spacing;
            has_glyph = true;
        }
        let width = if has_glyph {
            current_x - letter_spacing
        } else {
            0.0
        };
        ShapedLine { runs, width }
    }
}
