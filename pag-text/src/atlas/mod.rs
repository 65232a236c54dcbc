//! Glyph atlases: rasterized glyphs packed into texture pages.
//!
//! ## Architecture
//!
//! ```text
//! TextGlyphs ──max_scale──► mask glyphs (outlines, fill/stroke split)
//!                       └─► color glyphs (image typefaces)
//!                               │
//!                Atlas::make    ▼
//!   ┌──────────────────────────────────────────────────────┐
//!   │ for each glyph (blanks skipped):                     │
//!   │   bounds (+ stroke outset) ─► RectanglePack          │
//!   │   page full? ─► close page, reset, place again       │
//!   │   style key ─► text run of the page                  │
//!   │   atlas key ─► AtlasLocator                          │
//!   └──────────────────────────────────────────────────────┘
//!                               │ raster (zeno mask / RGBA)
//!                               ▼
//!                AtlasBackend::make_alpha_texture / make_rgba_texture
//!
//! TextAtlas = mask Atlas + color Atlas, color pages indexed after mask pages
//! ```

mod backend;
mod cache;
mod draw;
mod pack;
mod raster;

use std::collections::HashMap;
use std::mem;

use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::bytes_key::BytesKey;
use crate::glyph::{Glyph, PaintStyle};
use crate::text_glyphs::TextGlyphs;
use raster::{RunGlyph, TextRun};

pub use backend::{AtlasBackend, CpuTexture, CpuTextureBackend, TextureFormat};
pub use cache::{TextAtlasCache, SCALE_FACTOR_PRECISION};
pub use draw::{collect_glyph_instances, GlyphInstance};
pub use pack::{RectanglePack, DEFAULT_PADDING};

/// Glyphs drawn larger than this are rendered directly, not cached.
pub const MAX_ATLAS_FONT_SIZE: f32 = 256.0;

// ── Options ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasOptions {
    /// Largest page edge in pixels.
    pub max_texture_size: u32,
    pub padding: u32,
    pub max_font_size: f32,
}

impl Default for AtlasOptions {
    fn default() -> Self {
        Self {
            max_texture_size: 2048,
            padding: DEFAULT_PADDING,
            max_font_size: MAX_ATLAS_FONT_SIZE,
        }
    }
}

// ── Locator ─────────────────────────────────────────────────────────

/// Where a rasterized glyph lives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasLocator {
    pub image_index: usize,
    /// Pixel rect inside the page.
    pub location: Rect,
    /// `location` normalized to the page size.
    pub uv: Rect,
    /// Rounded-out glyph bounds relative to its origin, in atlas pixels.
    pub glyph_bounds: Rect,
}

// ── Atlas ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct AtlasPage<T> {
    pub width: u32,
    pub height: u32,
    pub texture: T,
}

pub struct Atlas<T> {
    format: TextureFormat,
    pages: Vec<AtlasPage<T>>,
    locators: HashMap<BytesKey, AtlasLocator>,
}

#[derive(Default)]
struct PageLayout {
    width: u32,
    height: u32,
    runs: Vec<TextRun>,
    run_index: HashMap<BytesKey, usize>,
    locators: Vec<(BytesKey, AtlasLocator)>,
}

impl PageLayout {
    fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    fn add(&mut self, glyph: &Glyph, image_index: usize, point: (u32, u32), bounds: Rect) {
        let style_key = glyph.style_key();
        let index = match self.run_index.get(&style_key) {
            Some(&index) => index,
            None => {
                self.runs.push(TextRun {
                    font: glyph.font().clone(),
                    paint: *glyph.paint(),
                    glyphs: Vec::new(),
                });
                self.run_index.insert(style_key, self.runs.len() - 1);
                self.runs.len() - 1
            }
        };
        let (x, y) = (point.0 as f64, point.1 as f64);
        self.runs[index].glyphs.push(RunGlyph {
            glyph_ids: glyph.glyph_ids().into(),
            origin: Vec2::new(x - bounds.x0, y - bounds.y0),
        });
        self.locators.push((
            glyph.atlas_key(),
            AtlasLocator {
                image_index,
                location: Rect::new(x, y, x + bounds.width(), y + bounds.height()),
                uv: Rect::ZERO,
                glyph_bounds: bounds,
            },
        ));
    }
}

/// Bounds a glyph occupies in the atlas, in whole pixels.
fn atlas_bounds(glyph: &Glyph) -> Rect {
    let outset = if glyph.style() == PaintStyle::Stroke {
        glyph.stroke_width() as f64
    } else {
        0.0
    };
    let bounds = glyph.bounds();
    if bounds.area() <= 0.0 {
        return Rect::ZERO;
    }
    bounds.inflate(outset, outset).expand()
}

fn create_pages(glyphs: &[Glyph], max_page_size: u32, padding: u32) -> Vec<PageLayout> {
    let mut pages = Vec::new();
    let mut pack = RectanglePack::new(padding);
    let mut page = PageLayout::default();
    for glyph in glyphs {
        if glyph.is_blank() {
            continue;
        }
        let bounds = atlas_bounds(glyph);
        let (width, height) = (bounds.width() as u32, bounds.height() as u32);
        if width == 0 || height == 0 {
            continue;
        }
        // A glyph that overflows an empty page is dropped without closing
        // the current one.
        if width + 2 * padding > max_page_size || height + 2 * padding > max_page_size {
            log::debug!("Atlas: {width}x{height} glyph \"{}\" exceeds the page size", glyph.name());
            continue;
        }
        let (packed_width, packed_height) = (pack.width(), pack.height());
        let mut point = pack.add_rect(width, height);
        if pack.width() > max_page_size || pack.height() > max_page_size {
            if !page.is_empty() {
                page.width = packed_width;
                page.height = packed_height;
                pages.push(mem::take(&mut page));
            }
            pack.reset();
            point = pack.add_rect(width, height);
        }
        page.add(glyph, pages.len(), point, bounds);
    }
    if !page.is_empty() {
        page.width = pack.width();
        page.height = pack.height();
        pages.push(page);
    }
    pages
}

impl<T> Atlas<T> {
    /// Packs and rasterizes `glyphs`. Returns `None` when nothing was
    /// packed or a page texture could not be created.
    pub fn make<B>(backend: &B, glyphs: &[Glyph], alpha_only: bool, options: &AtlasOptions) -> Option<Self>
    where
        B: AtlasBackend<Texture = T>,
    {
        let layouts = create_pages(glyphs, options.max_texture_size, options.padding);
        if layouts.is_empty() {
            return None;
        }
        let mut pages = Vec::with_capacity(layouts.len());
        let mut locators = HashMap::new();
        for layout in layouts {
            let (width, height) = (layout.width, layout.height);
            let texture = if alpha_only {
                let pixels = raster::draw_mask_page(width, height, &layout.runs);
                backend.make_alpha_texture(width, height, pixels)
            } else {
                let pixels = raster::draw_color_page(width, height, &layout.runs);
                backend.make_rgba_texture(width, height, pixels)
            };
            let Some(texture) = texture else {
                log::warn!("Atlas: failed to create a {width}x{height} page texture");
                return None;
            };
            for (key, mut locator) in layout.locators {
                let (w, h) = (width as f64, height as f64);
                let location = locator.location;
                locator.uv = Rect::new(location.x0 / w, location.y0 / h, location.x1 / w, location.y1 / h);
                locators.insert(key, locator);
            }
            pages.push(AtlasPage {
                width,
                height,
                texture,
            });
        }
        log::debug!(
            "Atlas: {} glyphs on {} {} pages",
            locators.len(),
            pages.len(),
            if alpha_only { "mask" } else { "color" }
        );
        Some(Self {
            format: if alpha_only {
                TextureFormat::Alpha8
            } else {
                TextureFormat::Rgba8
            },
            pages,
            locators,
        })
    }

    pub fn locator(&self, key: &BytesKey) -> Option<&AtlasLocator> {
        self.locators.get(key)
    }

    pub fn locator_count(&self) -> usize {
        self.locators.len()
    }

    pub fn pages(&self) -> &[AtlasPage<T>] {
        &self.pages
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Bytes held by the page textures.
    pub fn memory_usage(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.width as usize * page.height as usize)
            .sum::<usize>()
            * self.format.bytes_per_pixel()
    }
}

// ── TextAtlas ───────────────────────────────────────────────────────

/// Mask and color atlases for one [`TextGlyphs`] at one render scale.
pub struct TextAtlas<T> {
    text_glyphs_id: u64,
    scale: f32,
    max_scale: f32,
    mask_atlas: Option<Atlas<T>>,
    color_atlas: Option<Atlas<T>>,
}

impl<T> TextAtlas<T> {
    /// Builds the atlases for `text_glyphs` drawn at `scale`. Returns
    /// `None` when there is nothing to cache or the glyphs are too large
    /// to be worth caching.
    pub fn make<B>(text_glyphs: &TextGlyphs, backend: &B, scale: f32, options: &AtlasOptions) -> Option<Self>
    where
        B: AtlasBackend<Texture = T>,
    {
        if scale <= 0.0 {
            return None;
        }
        let max_scale = scale * text_glyphs.max_scale();
        let mask_glyphs = text_glyphs.mask_atlas_glyphs(max_scale);
        let color_glyphs = text_glyphs.color_atlas_glyphs(max_scale);
        if let Some(glyph) = mask_glyphs
            .iter()
            .chain(&color_glyphs)
            .find(|glyph| glyph.font().size() > options.max_font_size)
        {
            log::debug!(
                "TextAtlas: font size {} is above {}, glyphs are drawn directly",
                glyph.font().size(),
                options.max_font_size
            );
            return None;
        }
        let mask_atlas = Atlas::make(backend, &mask_glyphs, true, options);
        let color_atlas = Atlas::make(backend, &color_glyphs, false, options);
        if mask_atlas.is_none() && color_atlas.is_none() {
            return None;
        }
        Some(Self {
            text_glyphs_id: text_glyphs.id(),
            scale,
            max_scale,
            mask_atlas,
            color_atlas,
        })
    }

    pub fn text_glyphs_id(&self) -> u64 {
        self.text_glyphs_id
    }

    /// Render scale the atlas was requested for.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Scale the glyphs were rasterized at: the render scale times the
    /// largest glyph scale of the text.
    pub fn max_scale(&self) -> f32 {
        self.max_scale
    }

    fn mask_page_count(&self) -> usize {
        self.mask_atlas.as_ref().map_or(0, |atlas| atlas.pages.len())
    }

    pub fn page_count(&self) -> usize {
        self.mask_page_count() + self.color_atlas.as_ref().map_or(0, |atlas| atlas.pages.len())
    }

    /// Looks a glyph up by atlas key. Color pages follow mask pages in
    /// the combined index space.
    pub fn get_locator(&self, key: &BytesKey) -> Option<AtlasLocator> {
        if let Some(locator) = self.color_atlas.as_ref().and_then(|atlas| atlas.locator(key)) {
            return Some(AtlasLocator {
                image_index: locator.image_index + self.mask_page_count(),
                ..*locator
            });
        }
        self.mask_atlas.as_ref()?.locator(key).copied()
    }

    /// Locator of `glyph` (as laid out, unscaled) painted with `style`.
    pub fn glyph_locator(&self, glyph: &Glyph, style: PaintStyle) -> Option<AtlasLocator> {
        self.get_locator(&glyph.scaled_atlas_key(self.max_scale, style))
    }

    pub fn atlas_page(&self, image_index: usize) -> Option<&AtlasPage<T>> {
        let mask_pages = self.mask_page_count();
        if image_index < mask_pages {
            return self.mask_atlas.as_ref()?.pages.get(image_index);
        }
        self.color_atlas.as_ref()?.pages.get(image_index - mask_pages)
    }

    pub fn atlas_texture(&self, image_index: usize) -> Option<&T> {
        self.atlas_page(image_index).map(|page| &page.texture)
    }

    pub fn is_color_page(&self, image_index: usize) -> bool {
        image_index >= self.mask_page_count() && image_index < self.page_count()
    }

    pub fn memory_usage(&self) -> usize {
        self.mask_atlas.as_ref().map_or(0, Atlas::memory_usage)
            + self.color_atlas.as_ref().map_or(0, Atlas::memory_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layout_text;
    use crate::registry::FontRegistry;
    use crate::shaper::{PrimitiveShaper, Shaper};
    use crate::testing::{emoji_typeface, test_typeface};
    use pag_core::TextDocument;
    use std::sync::Arc;

    fn shaper() -> Shaper {
        let registry = FontRegistry::new();
        registry.register_typeface(test_typeface());
        registry.set_fallback_typefaces(vec![emoji_typeface()]);
        Shaper::with_backend(Arc::new(PrimitiveShaper), Arc::new(registry))
    }

    fn text_glyphs(text: &str, size: f32) -> TextGlyphs {
        layout_text(&TextDocument::new(text, "Test", size), &shaper())
    }

    fn locator_of(atlas: &TextAtlas<CpuTexture>, text: &TextGlyphs, name: &str, style: PaintStyle) -> Option<AtlasLocator> {
        let glyph = text.glyphs().find(|glyph| glyph.name() == name)?;
        atlas.glyph_locator(glyph, style)
    }

    #[test]
    fn test_options_default() {
        let options = AtlasOptions::default();
        assert_eq!(options.padding, 3);
        assert_eq!(options.max_font_size, 256.0);
        let parsed: AtlasOptions = serde_json::from_str(r#"{"max_texture_size": 512}"#).unwrap();
        assert_eq!(parsed.max_texture_size, 512);
        assert_eq!(parsed.padding, 3);
    }

    #[test]
    fn test_every_packed_glyph_is_found() {
        let text = text_glyphs("AAB C\nW", 10.0);
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).unwrap();
        for name in ["A", "B", "C", "W"] {
            let locator = locator_of(&atlas, &text, name, PaintStyle::Fill).unwrap();
            assert_eq!(locator.image_index, 0);
        }
        assert!(locator_of(&atlas, &text, " ", PaintStyle::Fill).is_none());
        assert_eq!(atlas.page_count(), 1);
        assert!(!atlas.is_color_page(0));
    }

    #[test]
    fn test_locator_geometry() {
        let text = text_glyphs("A", 10.0);
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).unwrap();
        let locator = locator_of(&atlas, &text, "A", PaintStyle::Fill).unwrap();
        assert_eq!(locator.location, Rect::new(3.0, 3.0, 9.0, 10.0));
        assert_eq!(locator.glyph_bounds, Rect::new(0.0, -7.0, 6.0, 0.0));
        let page = atlas.atlas_page(0).unwrap();
        assert_eq!((page.width, page.height), (12, 13));
        assert_eq!(locator.uv, Rect::new(3.0 / 12.0, 3.0 / 13.0, 9.0 / 12.0, 10.0 / 13.0));
        let texture = atlas.atlas_texture(0).unwrap();
        assert_eq!(texture.alpha_at(5, 6), 255);
        assert_eq!(texture.alpha_at(1, 1), 0);
        assert_eq!(atlas.memory_usage(), 12 * 13);
    }

    #[test]
    fn test_scale_is_applied() {
        let text = text_glyphs("A", 10.0);
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 2.0, &AtlasOptions::default()).unwrap();
        assert_eq!(atlas.scale(), 2.0);
        assert_eq!(atlas.max_scale(), 2.0);
        let locator = locator_of(&atlas, &text, "A", PaintStyle::Fill).unwrap();
        assert_eq!(locator.glyph_bounds, Rect::new(0.0, -14.0, 12.0, 0.0));
        assert_eq!(atlas.text_glyphs_id(), text.id());
    }

    #[test]
    fn test_stroke_and_fill_entries() {
        let document = TextDocument {
            apply_stroke: true,
            stroke_width: 2.0,
            ..TextDocument::new("A", "Test", 10.0)
        };
        let text = layout_text(&document, &shaper());
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).unwrap();
        let fill = locator_of(&atlas, &text, "A", PaintStyle::Fill).unwrap();
        let stroke = locator_of(&atlas, &text, "A", PaintStyle::Stroke).unwrap();
        assert_eq!(stroke.glyph_bounds, Rect::new(-2.0, -9.0, 8.0, 2.0));
        assert_ne!(fill.location, stroke.location);
        assert!(locator_of(&atlas, &text, "A", PaintStyle::StrokeAndFill).is_none());
    }

    #[test]
    fn test_color_pages_follow_mask_pages() {
        let text = text_glyphs("A☺", 10.0);
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).unwrap();
        assert_eq!(atlas.page_count(), 2);
        let emoji = locator_of(&atlas, &text, "☺", PaintStyle::Fill).unwrap();
        assert_eq!(emoji.image_index, 1);
        assert!(atlas.is_color_page(1));
        let texture = atlas.atlas_texture(1).unwrap();
        assert_eq!(texture.format, TextureFormat::Rgba8);
        let (x, y) = (emoji.location.x0 as u32 + 1, emoji.location.y0 as u32 + 1);
        assert_eq!(texture.alpha_at(x, y), 255);
        let mask_bytes = atlas.atlas_page(0).map(|p| (p.width * p.height) as usize).unwrap();
        let color_bytes = atlas.atlas_page(1).map(|p| (p.width * p.height * 4) as usize).unwrap();
        assert_eq!(atlas.memory_usage(), mask_bytes + color_bytes);
    }

    #[test]
    fn test_color_only_text() {
        let text = text_glyphs("☺", 10.0);
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).unwrap();
        let emoji = locator_of(&atlas, &text, "☺", PaintStyle::Fill).unwrap();
        assert_eq!(emoji.image_index, 0);
        assert!(atlas.is_color_page(0));
    }

    #[test]
    fn test_large_glyphs_are_not_cached() {
        let text = text_glyphs("A", 200.0);
        assert!(TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).is_some());
        assert!(TextAtlas::make(&text, &CpuTextureBackend, 2.0, &AtlasOptions::default()).is_none());
        assert!(TextAtlas::make(&text, &CpuTextureBackend, 0.0, &AtlasOptions::default()).is_none());
    }

    #[test]
    fn test_blank_text_has_no_atlas() {
        let text = text_glyphs("  \n ", 10.0);
        assert!(TextAtlas::make(&text, &CpuTextureBackend, 1.0, &AtlasOptions::default()).is_none());
    }

    #[test]
    fn test_pages_split_at_max_size() {
        let text = text_glyphs("ABCW中", 10.0);
        let options = AtlasOptions {
            max_texture_size: 24,
            ..AtlasOptions::default()
        };
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &options).unwrap();
        assert!(atlas.page_count() > 1);
        for name in ["A", "B", "C", "W", "中"] {
            let locator = locator_of(&atlas, &text, name, PaintStyle::Fill).unwrap();
            let page = atlas.atlas_page(locator.image_index).unwrap();
            assert!(page.width <= 24 && page.height <= 24);
            assert!(locator.location.x1 <= page.width as f64);
            assert!(locator.location.y1 <= page.height as f64);
        }
    }

    #[test]
    fn test_oversized_glyph_is_skipped() {
        let text = text_glyphs("A中", 10.0);
        // '中' is 9 × 9; with padding it needs 15 pixels.
        let options = AtlasOptions {
            max_texture_size: 14,
            ..AtlasOptions::default()
        };
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &options).unwrap();
        assert!(locator_of(&atlas, &text, "A", PaintStyle::Fill).is_some());
        assert!(locator_of(&atlas, &text, "中", PaintStyle::Fill).is_none());
    }

    #[test]
    fn test_oversized_glyph_keeps_current_page() {
        // Stroke entries grow by 8 on each side and no longer fit; the fill
        // entries of 'A' and 'B' pack together into 22 × 13.
        let document = TextDocument {
            apply_stroke: true,
            stroke_width: 8.0,
            ..TextDocument::new("AB", "Test", 10.0)
        };
        let text = layout_text(&document, &shaper());
        let options = AtlasOptions {
            max_texture_size: 24,
            ..AtlasOptions::default()
        };
        let atlas = TextAtlas::make(&text, &CpuTextureBackend, 1.0, &options).unwrap();
        let a = locator_of(&atlas, &text, "A", PaintStyle::Fill).unwrap();
        let b = locator_of(&atlas, &text, "B", PaintStyle::Fill).unwrap();
        assert_eq!(a.image_index, 0);
        assert_eq!(b.image_index, 0);
        assert_eq!(atlas.page_count(), 1);
        assert!(locator_of(&atlas, &text, "A", PaintStyle::Stroke).is_none());
        assert!(locator_of(&atlas, &text, "B", PaintStyle::Stroke).is_none());
    }

    struct FailingBackend;

    impl AtlasBackend for FailingBackend {
        type Texture = ();

        fn make_alpha_texture(&self, _: u32, _: u32, _: Vec<u8>) -> Option<()> {
            None
        }

        fn make_rgba_texture(&self, _: u32, _: u32, _: Vec<u8>) -> Option<()> {
            None
        }
    }

    #[test]
    fn test_texture_failure() {
        let text = text_glyphs("A", 10.0);
        assert!(TextAtlas::make(&text, &FailingBackend, 1.0, &AtlasOptions::default()).is_none());
    }
}
