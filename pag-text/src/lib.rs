//! # pag-text
//!
//! Text pipeline for PAG documents: typeface resolution, shaping with
//! fallback fonts, paragraph layout, glyph atlases and font embedding.
//!
//! ## Architecture
//!
//! ```text
//! FontRegistry (registered ─► fallback ─► system fonts)
//!     │
//!     ▼
//! Shaper::shape(text, typeface) ──► ShapedGlyph clusters
//!     │
//!     ├── Typesetter::create_text_glyphs(Document) ──► TypesetText { GlyphRun }
//!     │                                                    │
//!     │                                                    ▼
//!     │                                  FontEmbedder ──► EmbeddedDocument
//!     │
//!     └── layout::layout_text(TextDocument) ──► TextGlyphs { lines of Glyph }
//!                                                    │
//!                                                    ▼
//!                         TextAtlas (RectanglePack pages, AtlasLocator lookup)
//!                                                    │
//!                                                    ▼
//!                              collect_glyph_instances ──► GPU quads
//! ```
//!
//! - **`typeface`** / **`font`** - font resources and sized fonts.
//! - **`shaper`** - glyph clusters with fallback fonts.
//! - **`glyph`** - styled glyphs with horizontal and vertical metrics.
//! - **`layout`** - line breaking, box fitting, justification, vertical text.
//! - **`typesetter`** - glyph runs for the Text nodes of a document.
//! - **`atlas`** - glyph texture atlases and their cache.
//! - **`embed`** - fonts rebuilt from the glyphs a document uses.

pub mod atlas;
pub mod bytes_key;
pub mod embed;
pub mod error;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod registry;
pub mod shaper;
pub mod text_glyphs;
pub mod typeface;
pub mod typesetter;

#[cfg(test)]
mod testing;

// Re-exports for ergonomic use.
pub use atlas::{
    collect_glyph_instances, Atlas, AtlasBackend, AtlasLocator, AtlasOptions, CpuTextureBackend,
    GlyphInstance, RectanglePack, TextAtlas, TextAtlasCache,
};
pub use bytes_key::BytesKey;
pub use embed::{EmbeddedDocument, EmbeddedFont, FontEmbedder};
pub use error::{EmbedError, TypefaceError};
pub use font::Font;
pub use glyph::{Glyph, GlyphInfo, LayoutInfo, PaintStyle, TextPaint};
pub use layout::{layout_text, layout_text_on_path};
pub use registry::FontRegistry;
pub use shaper::{PrimitiveShaper, ShapedGlyph, Shaper, ShapingBackend};
pub use text_glyphs::TextGlyphs;
pub use typeface::{
    FileTypeface, FontMetrics, GlyphId, GlyphImage, PathTypeface, PathTypefaceBuilder, SystemFonts, Typeface,
    TypefaceRef,
};
pub use typesetter::{GlyphRun, TypesetDocument, TypesetText, Typesetter};
