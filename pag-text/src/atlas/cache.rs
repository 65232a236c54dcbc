//! Per-text atlas cache with memory accounting.

use std::collections::HashMap;

use uuid::Uuid;

use super::{AtlasBackend, AtlasOptions, TextAtlas};
use crate::text_glyphs::TextGlyphs;

/// Scale changes smaller than this reuse the existing atlas.
pub const SCALE_FACTOR_PRECISION: f32 = 0.001;

/// Keeps one [`TextAtlas`] per text node and rebuilds it when the laid
/// out glyphs or the render scale change.
pub struct TextAtlasCache<B: AtlasBackend> {
    backend: B,
    options: AtlasOptions,
    atlases: HashMap<Uuid, TextAtlas<B::Texture>>,
    memory_usage: usize,
}

impl<B: AtlasBackend> TextAtlasCache<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, AtlasOptions::default())
    }

    pub fn with_options(backend: B, options: AtlasOptions) -> Self {
        Self {
            backend,
            options,
            atlases: HashMap::new(),
            memory_usage: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &AtlasOptions {
        &self.options
    }

    /// Atlas for `text_id`, built on first use and rebuilt when
    /// `text_glyphs` is a different layout or `scale` moved.
    pub fn get(&mut self, text_id: Uuid, text_glyphs: &TextGlyphs, scale: f32) -> Option<&TextAtlas<B::Texture>> {
        let stale = self.atlases.get(&text_id).is_some_and(|atlas| {
            atlas.text_glyphs_id() != text_glyphs.id()
                || (atlas.scale() - scale).abs() > SCALE_FACTOR_PRECISION
        });
        if stale {
            self.remove(text_id);
        }
        if !self.atlases.contains_key(&text_id) {
            if scale < SCALE_FACTOR_PRECISION {
                return None;
            }
            let atlas = TextAtlas::make(text_glyphs, &self.backend, scale, &self.options)?;
            self.memory_usage += atlas.memory_usage();
            log::debug!(
                "TextAtlasCache: built {} pages for {text_id}, {} bytes cached",
                atlas.page_count(),
                self.memory_usage
            );
            self.atlases.insert(text_id, atlas);
        }
        self.atlases.get(&text_id)
    }

    pub fn remove(&mut self, text_id: Uuid) -> bool {
        match self.atlases.remove(&text_id) {
            Some(atlas) => {
                self.memory_usage -= atlas.memory_usage();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.atlases.clear();
        self.memory_usage = 0;
    }

    /// Bytes held by every cached atlas.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::CpuTextureBackend;
    use crate::layout::layout_text;
    use crate::registry::FontRegistry;
    use crate::shaper::{PrimitiveShaper, Shaper};
    use crate::testing::test_typeface;
    use pag_core::TextDocument;
    use std::sync::Arc;

    fn text_glyphs(text: &str) -> TextGlyphs {
        let registry = FontRegistry::new();
        registry.register_typeface(test_typeface());
        let shaper = Shaper::with_backend(Arc::new(PrimitiveShaper), Arc::new(registry));
        layout_text(&TextDocument::new(text, "Test", 10.0), &shaper)
    }

    #[test]
    fn test_reuse_and_rebuild() {
        let mut cache = TextAtlasCache::new(CpuTextureBackend);
        let id = Uuid::new_v4();
        let text = text_glyphs("AB");

        let first = cache.get(id, &text, 1.0).map(|atlas| atlas.memory_usage()).unwrap();
        assert_eq!(cache.memory_usage(), first);

        // Within the precision the same atlas is kept.
        let scale = cache.get(id, &text, 1.0005).map(|atlas| atlas.scale()).unwrap();
        assert_eq!(scale, 1.0);

        let scale = cache.get(id, &text, 2.0).map(|atlas| atlas.scale()).unwrap();
        assert_eq!(scale, 2.0);
        assert_eq!(cache.len(), 1);
        assert!(cache.memory_usage() > first);

        let relaid = text_glyphs("AB");
        let rebuilt = cache.get(id, &relaid, 2.0).map(|atlas| atlas.text_glyphs_id()).unwrap();
        assert_eq!(rebuilt, relaid.id());
    }

    #[test]
    fn test_memory_accounting() {
        let mut cache = TextAtlasCache::new(CpuTextureBackend);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let usage_a = cache.get(a, &text_glyphs("A"), 1.0).map(|atlas| atlas.memory_usage()).unwrap();
        let usage_b = cache.get(b, &text_glyphs("BW"), 1.0).map(|atlas| atlas.memory_usage()).unwrap();
        assert_eq!(cache.memory_usage(), usage_a + usage_b);

        assert!(cache.remove(a));
        assert!(!cache.remove(a));
        assert_eq!(cache.memory_usage(), usage_b);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
    }

    #[test]
    fn test_tiny_scale_is_not_cached() {
        let mut cache = TextAtlasCache::new(CpuTextureBackend);
        assert!(cache.get(Uuid::new_v4(), &text_glyphs("A"), 0.0001).is_none());
        assert!(cache.is_empty());
    }
}
