//! HarfBuzz-compatible shaping through rustybuzz.
//!
//! Shaping needs the raw font file. Extracting and validating it is the
//! expensive part, so prepared fonts are kept in a bounded LRU keyed by
//! typeface unique ID. Faces are re-created per run over the cached bytes.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use rustybuzz::{Direction, Face, UnicodeBuffer};
use smallvec::{smallvec, SmallVec};

use super::{ClusterGlyphs, PrimitiveShaper, ShapingBackend};
use crate::typeface::{FontData, GlyphId, TypefaceRef};

/// Maximum number of prepared shaping fonts kept alive.
pub const SHAPING_FONT_CACHE_SIZE: usize = 100;

/// A font file known to parse as a shaping face.
#[derive(Debug)]
struct ShapingFont {
    data: FontData,
}

impl ShapingFont {
    fn face(&self) -> Option<Face<'_>> {
        Face::from_slice(&self.data.bytes, self.data.index)
    }
}

/// Typeface unique ID → prepared shaping font, least recently used first
/// out. Shared by every thread shaping through the same backend.
pub struct ShapingFontCache {
    fonts: Mutex<LruCache<u32, Arc<ShapingFont>>>,
}

impl Default for ShapingFontCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapingFontCache {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(SHAPING_FONT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            fonts: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get(&self, typeface: &TypefaceRef) -> Option<Arc<ShapingFont>> {
        let unique_id = typeface.unique_id();
        let mut fonts = self.fonts.lock();
        if let Some(font) = fonts.get(&unique_id) {
            return Some(font.clone());
        }
        let data = typeface.font_data()?;
        let font = Arc::new(ShapingFont { data });
        font.face()?;
        fonts.put(unique_id, font.clone());
        Some(font)
    }

    pub fn len(&self) -> usize {
        self.fonts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.lock().is_empty()
    }

    pub fn clear(&self) {
        self.fonts.lock().clear();
    }
}

/// Full Unicode shaping: grapheme clusters, ligatures, marks and complex
/// scripts. Typefaces without font bytes shape one glyph per codepoint.
#[derive(Default)]
pub struct RustybuzzShaper {
    cache: ShapingFontCache,
}

impl RustybuzzShaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &ShapingFontCache {
        &self.cache
    }
}

impl ShapingBackend for RustybuzzShaper {
    fn name(&self) -> &'static str {
        "rustybuzz"
    }

    fn shape_run(&self, text: &str, typeface: &TypefaceRef) -> Vec<ClusterGlyphs> {
        let Some(font) = self.cache.get(typeface) else {
            return PrimitiveShaper.shape_run(text, typeface);
        };
        let Some(face) = font.face() else {
            return PrimitiveShaper.shape_run(text, typeface);
        };

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        let right_to_left = buffer.direction() == Direction::RightToLeft;
        let output = rustybuzz::shape(&face, &[], buffer);

        let mut infos: Vec<(usize, GlyphId)> = output
            .glyph_infos()
            .iter()
            .map(|info| {
                let glyph_id = GlyphId::try_from(info.glyph_id).unwrap_or(0);
                (info.cluster as usize, glyph_id)
            })
            .collect();
        // Clusters come back in visual order; callers need logical order.
        if right_to_left {
            infos.reverse();
        }
        infos.sort_by_key(|(cluster, _)| *cluster);

        let mut clusters: Vec<ClusterGlyphs> = Vec::new();
        for (cluster, glyph_id) in infos {
            match clusters.last_mut() {
                Some(last) if last.string_index == cluster => last.glyph_ids.push(glyph_id),
                _ => {
                    let glyph_ids: SmallVec<[GlyphId; 1]> = smallvec![glyph_id];
                    clusters.push(ClusterGlyphs::new(cluster, glyph_ids));
                }
            }
        }
        clusters
    }

    fn purge_caches(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FontRegistry;
    use crate::shaper::{cluster_range, ShapedGlyph, Shaper};
    use crate::testing::{dejavu_sans, dejavu_sans_mono, test_typeface};

    #[test]
    fn test_path_typeface_falls_back_to_primitive() {
        let shaper = RustybuzzShaper::new();
        let typeface = test_typeface();
        let clusters = shaper.shape_run("AB", &typeface);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].glyph_ids[0], typeface.glyph_id('B'));
        // Nothing to prepare without font bytes.
        assert!(shaper.cache().is_empty());
    }

    #[test]
    fn test_cache_capacity() {
        let cache = ShapingFontCache::new();
        assert_eq!(cache.fonts.lock().cap().get(), SHAPING_FONT_CACHE_SIZE);
    }

    #[test]
    fn test_purge_clears_cache() {
        let shaper = RustybuzzShaper::new();
        let typeface = dejavu_sans();
        let clusters = shaper.shape_run("fi", &typeface);
        assert!(!clusters.is_empty());
        assert_eq!(clusters[0].string_index, 0);
        assert_eq!(shaper.cache().len(), 1);
        shaper.shape_run("ab", &typeface);
        assert_eq!(shaper.cache().len(), 1);
        shaper.purge_caches();
        assert!(shaper.cache().is_empty());
    }

    fn shaper_with_fallbacks(fallbacks: Vec<TypefaceRef>) -> Shaper {
        let registry = FontRegistry::new();
        registry.set_fallback_typefaces(fallbacks);
        Shaper::with_backend(Arc::new(RustybuzzShaper::new()), Arc::new(registry))
    }

    /// Cluster ranges cover `text` end to end, in order, on char boundaries.
    fn assert_partition(text: &str, glyphs: &[ShapedGlyph]) -> Vec<std::ops::Range<usize>> {
        let ranges: Vec<_> = (0..glyphs.len()).map(|i| cluster_range(glyphs, i, text)).collect();
        let mut end = 0;
        for range in &ranges {
            assert_eq!(range.start, end, "{ranges:?}");
            assert!(range.end > range.start, "{ranges:?}");
            assert!(text.is_char_boundary(range.start) && text.is_char_boundary(range.end));
            end = range.end;
        }
        assert_eq!(end, text.len());
        ranges
    }

    #[test]
    fn test_combining_marks_join_their_base() {
        let shaper = shaper_with_fallbacks(Vec::new());
        let text = "e\u{301}a\u{308}\u{323}x";
        let glyphs = shaper.shape(text, Some(&dejavu_sans()));
        assert_eq!(assert_partition(text, &glyphs), vec![0..3, 3..8, 8..9]);
        assert!(glyphs.iter().all(|glyph| glyph.is_mapped()));
    }

    #[test]
    fn test_right_to_left_clusters_in_logical_order() {
        let shaper = shaper_with_fallbacks(Vec::new());
        let typeface = dejavu_sans();
        let text = "שלום a";
        let glyphs = shaper.shape(text, Some(&typeface));
        assert_partition(text, &glyphs);
        assert_eq!(glyphs.len(), 6);
        assert!(glyphs.iter().all(|glyph| glyph.is_mapped()));
        assert_eq!(glyphs[0].glyph_id(), typeface.glyph_id('ש'));
        assert_eq!(glyphs[5].glyph_id(), typeface.glyph_id('a'));
    }

    #[test]
    fn test_fallback_reshapes_unmapped_sub_run() {
        let mono = dejavu_sans_mono();
        let sans = dejavu_sans();
        let shaper = shaper_with_fallbacks(vec![sans.clone()]);
        let text = "aשלום中b";
        let glyphs = shaper.shape(text, Some(&mono));
        let ranges = assert_partition(text, &glyphs);
        assert_eq!(ranges.len(), 7);

        let owner = |i: usize| glyphs[i].typeface.as_ref().map(|t| t.unique_id());
        assert_eq!(owner(0), Some(mono.unique_id()));
        for i in 1..5 {
            assert_eq!(owner(i), Some(sans.unique_id()));
        }
        // Neither font has CJK.
        assert_eq!(owner(5), None);
        assert_eq!(glyphs[5].glyph_id(), 0);
        assert_eq!(owner(6), Some(mono.unique_id()));
        assert_eq!(ranges[5], 9..12);
    }
}
