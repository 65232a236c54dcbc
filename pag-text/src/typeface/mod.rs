//! Typeface capability and its backends.
//!
//! A [`Typeface`] is an immutable, shared font resource. Every backend
//! reports geometry in font units with a y-down coordinate system so the
//! layout code never has to care where the glyphs came from.
//!
//! ```text
//! Typeface (trait, Arc<dyn Typeface>)
//!   ├── FileTypeface   ttf-parser over owned font bytes
//!   ├── PathTypeface   outlines/images added at runtime (embedded fonts)
//!   └── SystemFonts    cosmic-text font database → FileTypeface
//! ```

mod file;
mod image;
mod path;
mod system;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use kurbo::{BezPath, Rect};

pub use file::FileTypeface;
pub use self::image::GlyphImage;
pub use path::{PathTypeface, PathTypefaceBuilder};
pub use system::{parse_font_style, FontSource, SystemFonts};

/// Index into a typeface's glyph table. 0 means "no glyph".
pub type GlyphId = u16;

/// Shared handle to a typeface.
pub type TypefaceRef = Arc<dyn Typeface>;

/// Vertical metrics in font units, y-down: `ascent` is negative,
/// `descent` positive.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub leading: f32,
    pub x_height: f32,
    pub cap_height: f32,
}

impl FontMetrics {
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            ascent: self.ascent * scale,
            descent: self.descent * scale,
            leading: self.leading * scale,
            x_height: self.x_height * scale,
            cap_height: self.cap_height * scale,
        }
    }
}

/// Raw font file bytes handed to a shaping engine.
#[derive(Clone, Debug)]
pub struct FontData {
    pub bytes: Arc<[u8]>,
    pub index: u32,
}

pub trait Typeface: Send + Sync + fmt::Debug {
    /// Process-wide identifier, distinct per font resource.
    fn unique_id(&self) -> u32;

    fn font_family(&self) -> &str;

    fn font_style(&self) -> &str;

    fn units_per_em(&self) -> u16;

    /// True when glyphs are drawn from color images rather than outlines.
    fn has_color(&self) -> bool;

    fn glyphs_count(&self) -> usize;

    /// Returns 0 when the character is not mapped.
    fn glyph_id(&self, unichar: char) -> GlyphId;

    fn metrics(&self) -> FontMetrics;

    fn advance(&self, glyph_id: GlyphId, vertical: bool) -> f32;

    fn bounds(&self, glyph_id: GlyphId) -> Option<Rect>;

    fn outline(&self, glyph_id: GlyphId) -> Option<BezPath>;

    /// Color image for `glyph_id` from the strike best suited to `size`.
    fn image(&self, glyph_id: GlyphId, size: f32) -> Option<GlyphImage>;

    /// Y offset from the baseline to the top of the vertical origin.
    fn vertical_origin(&self, _glyph_id: GlyphId) -> Option<f32> {
        None
    }

    fn font_data(&self) -> Option<FontData> {
        None
    }
}

static NEXT_UNIQUE_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates a new typeface unique ID.
pub fn next_unique_id() -> u32 {
    NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Two handles refer to the same font resource.
pub fn same_typeface(a: &TypefaceRef, b: &TypefaceRef) -> bool {
    a.unique_id() == b.unique_id()
}
