//! Paragraph text model: the per-layer text properties that drive
//! paragraph layout (box text, justification, vertical direction).

use serde::{Deserialize, Serialize};

use crate::Point;

// ── Color ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Normalized RGBA with full opacity.
    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
            1.0,
        ]
    }
}

// ── Justification ───────────────────────────────────────────────────

/// How lines are placed horizontally. The `FullJustify*` variants only
/// stretch lines inside a text box; the suffix names the last-line policy.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParagraphJustification {
    #[default]
    LeftJustify,
    CenterJustify,
    RightJustify,
    FullJustifyLastLineLeft,
    FullJustifyLastLineRight,
    FullJustifyLastLineCenter,
    FullJustifyLastLineFull,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    #[default]
    Horizontal,
    Vertical,
}

// ── Text document ───────────────────────────────────────────────────

/// All properties of one paragraph of text.
///
/// `tracking` is in 1/1000 em. A `leading` of zero means automatic
/// (1.2 × font size). `box_text_pos`/`box_text_size` are only used when
/// `box_text` is set.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct TextDocument {
    pub text: String,
    pub font_family: String,
    pub font_style: String,
    pub font_size: f32,
    pub faux_bold: bool,
    pub faux_italic: bool,
    pub tracking: f32,
    pub leading: f32,
    pub baseline_shift: f32,
    pub first_baseline: f32,
    pub justification: ParagraphJustification,
    pub direction: TextDirection,
    pub box_text: bool,
    pub box_text_pos: Point,
    pub box_text_size: Point,
    pub apply_fill: bool,
    pub apply_stroke: bool,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub stroke_over_fill: bool,
}

impl Default for TextDocument {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: String::new(),
            font_style: String::new(),
            font_size: 24.0,
            faux_bold: false,
            faux_italic: false,
            tracking: 0.0,
            leading: 0.0,
            baseline_shift: 0.0,
            first_baseline: 0.0,
            justification: ParagraphJustification::LeftJustify,
            direction: TextDirection::Horizontal,
            box_text: false,
            box_text_pos: Point::default(),
            box_text_size: Point::default(),
            apply_fill: true,
            apply_stroke: false,
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            stroke_width: 1.0,
            stroke_over_fill: true,
        }
    }
}

impl TextDocument {
    pub fn new(text: &str, font_family: &str, font_size: f32) -> Self {
        Self {
            text: text.to_string(),
            font_family: font_family.to_string(),
            font_size,
            ..Default::default()
        }
    }

    pub fn is_vertical(&self) -> bool {
        self.direction == TextDirection::Vertical
    }
}
