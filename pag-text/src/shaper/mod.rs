//! Text shaping: text + typeface → glyph clusters.
//!
//! ```text
//! Shaper::shape(text, primary)
//!     │
//!     ├── backend.shape_run(run, primary)       ShapingBackend (trait)
//!     │        ├── RustybuzzShaper   clusters, ligatures, complex scripts
//!     │        └── PrimitiveShaper   one glyph per codepoint
//!     │
//!     └── unmapped sub-runs ──► each fallback typeface in registry order
//! ```
//!
//! The output clusters are sorted by string offset and partition the
//! input string: each cluster spans up to the next one's offset.

mod primitive;
#[cfg(feature = "shaping")]
mod harfbuzz;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::registry::FontRegistry;
use crate::typeface::{same_typeface, GlyphId, TypefaceRef};

pub use primitive::{PrimitiveShaper, Utf8Decoder};
#[cfg(feature = "shaping")]
pub use harfbuzz::{RustybuzzShaper, ShapingFontCache};

/// Glyphs produced for one cluster by a single backend call.
/// `string_index` is relative to the text passed to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterGlyphs {
    pub string_index: usize,
    pub glyph_ids: SmallVec<[GlyphId; 1]>,
}

impl ClusterGlyphs {
    pub fn new(string_index: usize, glyph_ids: SmallVec<[GlyphId; 1]>) -> Self {
        Self {
            string_index,
            glyph_ids,
        }
    }

    fn is_mapped(&self) -> bool {
        !self.glyph_ids.is_empty() && self.glyph_ids.iter().all(|&id| id != 0)
    }
}

/// Shapes a run of text with exactly one typeface. Unmapped characters
/// are reported with glyph 0.
pub trait ShapingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn shape_run(&self, text: &str, typeface: &TypefaceRef) -> Vec<ClusterGlyphs>;

    /// Drops any per-typeface state. Call after unregistering fonts.
    fn purge_caches(&self) {}
}

/// One shaped cluster of the input text.
#[derive(Clone)]
pub struct ShapedGlyph {
    /// `None` when no typeface could map the cluster.
    pub typeface: Option<TypefaceRef>,
    pub glyph_ids: SmallVec<[GlyphId; 1]>,
    /// Byte offset of the cluster in the shaped string.
    pub string_index: usize,
}

impl fmt::Debug for ShapedGlyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapedGlyph")
            .field("typeface", &self.typeface.as_ref().map(|t| t.unique_id()))
            .field("glyph_ids", &self.glyph_ids)
            .field("string_index", &self.string_index)
            .finish()
    }
}

impl ShapedGlyph {
    pub fn glyph_id(&self) -> GlyphId {
        self.glyph_ids.first().copied().unwrap_or(0)
    }

    pub fn is_mapped(&self) -> bool {
        self.typeface.is_some()
    }
}

/// Byte range of the cluster at `index` within `text`.
pub fn cluster_range(glyphs: &[ShapedGlyph], index: usize, text: &str) -> std::ops::Range<usize> {
    let start = glyphs[index].string_index;
    let end = glyphs
        .get(index + 1)
        .map(|next| next.string_index)
        .unwrap_or(text.len());
    start..end
}

// ── Shaper ──────────────────────────────────────────────────────────

/// Shaping backend plus the fallback chain from a [`FontRegistry`].
#[derive(Clone)]
pub struct Shaper {
    backend: Arc<dyn ShapingBackend>,
    registry: Arc<FontRegistry>,
}

impl fmt::Debug for Shaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shaper")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Shaper {
    /// Uses the best backend compiled into this build.
    pub fn new(registry: Arc<FontRegistry>) -> Self {
        Self::with_backend(Self::default_backend(), registry)
    }

    pub fn with_backend(backend: Arc<dyn ShapingBackend>, registry: Arc<FontRegistry>) -> Self {
        Self { backend, registry }
    }

    #[cfg(feature = "shaping")]
    pub fn default_backend() -> Arc<dyn ShapingBackend> {
        Arc::new(RustybuzzShaper::new())
    }

    #[cfg(not(feature = "shaping"))]
    pub fn default_backend() -> Arc<dyn ShapingBackend> {
        Arc::new(PrimitiveShaper)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn registry(&self) -> &Arc<FontRegistry> {
        &self.registry
    }

    pub fn purge_caches(&self) {
        log::debug!("Shaper: purging {} caches", self.backend.name());
        self.backend.purge_caches();
    }

    /// Shapes `text` with `typeface`, re-shaping unmapped sub-runs with
    /// each fallback typeface in order. Clusters nothing could map keep
    /// glyph 0 and no typeface, one per character.
    pub fn shape(&self, text: &str, typeface: Option<&TypefaceRef>) -> Vec<ShapedGlyph> {
        if text.is_empty() {
            return Vec::new();
        }
        let fallbacks = self.registry.fallback_typefaces();
        let candidates = typeface.cloned().into_iter().chain(
            fallbacks
                .into_iter()
                .filter(|fallback| typeface.map_or(true, |primary| !same_typeface(primary, fallback))),
        );

        let mut shaped: BTreeMap<usize, ShapedGlyph> = BTreeMap::new();
        let mut pending = vec![0..text.len()];
        for candidate in candidates {
            if pending.is_empty() {
                break;
            }
            let mut unmapped: Vec<std::ops::Range<usize>> = Vec::new();
            for run in pending {
                self.shape_sub_run(text, run, &candidate, &mut shaped, &mut unmapped);
            }
            pending = unmapped;
        }

        for run in pending {
            for (offset, _) in text[run.clone()].char_indices() {
                let string_index = run.start + offset;
                shaped.insert(
                    string_index,
                    ShapedGlyph {
                        typeface: None,
                        glyph_ids: smallvec![0],
                        string_index,
                    },
                );
            }
        }
        shaped.into_values().collect()
    }

    fn shape_sub_run(
        &self,
        text: &str,
        run: std::ops::Range<usize>,
        typeface: &TypefaceRef,
        shaped: &mut BTreeMap<usize, ShapedGlyph>,
        unmapped: &mut Vec<std::ops::Range<usize>>,
    ) {
        let mut push_unmapped = |range: std::ops::Range<usize>| {
            if range.is_empty() {
                return;
            }
            match unmapped.last_mut() {
                Some(last) if last.end == range.start => last.end = range.end,
                _ => unmapped.push(range),
            }
        };

        let clusters = self.backend.shape_run(&text[run.clone()], typeface);
        let first = clusters.first().map(|c| c.string_index).unwrap_or(run.len());
        push_unmapped(run.start..run.start + first.min(run.len()));

        for (i, cluster) in clusters.iter().enumerate() {
            let start = run.start + cluster.string_index;
            let end = clusters
                .get(i + 1)
                .map(|next| run.start + next.string_index)
                .unwrap_or(run.end)
                .min(run.end);
            if end <= start {
                continue;
            }
            if cluster.is_mapped() {
                shaped.insert(
                    start,
                    ShapedGlyph {
                        typeface: Some(typeface.clone()),
                        glyph_ids: cluster.glyph_ids.clone(),
                        string_index: start,
                    },
                );
            } else {
                push_unmapped(start..end);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fallback_typeface, test_typeface};

    fn primitive(registry: FontRegistry) -> Shaper {
        Shaper::with_backend(Arc::new(PrimitiveShaper), Arc::new(registry))
    }

    fn assert_partition(text: &str, glyphs: &[ShapedGlyph]) {
        assert_eq!(glyphs.first().map(|g| g.string_index), Some(0));
        for pair in glyphs.windows(2) {
            assert!(pair[0].string_index < pair[1].string_index);
        }
        assert!(glyphs.last().unwrap().string_index < text.len());
    }

    #[test]
    fn test_empty_text() {
        let shaper = primitive(FontRegistry::new());
        assert!(shaper.shape("", Some(&test_typeface())).is_empty());
    }

    #[test]
    fn test_primary_only() {
        let shaper = primitive(FontRegistry::new());
        let typeface = test_typeface();
        let glyphs = shaper.shape("AB", Some(&typeface));
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].glyph_id(), typeface.glyph_id('A'));
        assert_eq!(glyphs[1].string_index, 1);
        assert!(glyphs.iter().all(|g| g.is_mapped()));
    }

    #[test]
    fn test_fallback_fills_gaps() {
        let registry = FontRegistry::new();
        let fallback = fallback_typeface();
        registry.set_fallback_typefaces(vec![fallback.clone()]);
        let shaper = primitive(registry);
        let primary = test_typeface();
        let text = "AZΩB";
        let glyphs = shaper.shape(text, Some(&primary));
        assert_partition(text, &glyphs);
        assert_eq!(glyphs.len(), 4);
        let families: Vec<_> = glyphs
            .iter()
            .map(|g| g.typeface.as_ref().unwrap().font_family().to_string())
            .collect();
        assert_eq!(families, vec!["Test", "Fallback", "Fallback", "Test"]);
        assert_eq!(glyphs[2].string_index, 2);
        assert_eq!(glyphs[3].string_index, 4);
    }

    #[test]
    fn test_unmapped_keeps_zero() {
        let shaper = primitive(FontRegistry::new());
        let text = "A€B";
        let glyphs = shaper.shape(text, Some(&test_typeface()));
        assert_partition(text, &glyphs);
        assert_eq!(glyphs.len(), 3);
        assert!(glyphs[1].typeface.is_none());
        assert_eq!(glyphs[1].glyph_id(), 0);
        assert_eq!(cluster_range(&glyphs, 1, text), 1..4);
    }

    #[test]
    fn test_no_primary_uses_fallbacks() {
        let registry = FontRegistry::new();
        registry.set_fallback_typefaces(vec![fallback_typeface()]);
        let shaper = primitive(registry);
        let glyphs = shaper.shape("Z", None);
        assert_eq!(glyphs.len(), 1);
        assert!(glyphs[0].is_mapped());
    }

    #[test]
    fn test_fallback_equal_to_primary_is_skipped() {
        let registry = FontRegistry::new();
        let primary = test_typeface();
        registry.set_fallback_typefaces(vec![primary.clone()]);
        let shaper = primitive(registry);
        let glyphs = shaper.shape("€", Some(&primary));
        assert!(glyphs[0].typeface.is_none());
    }

    #[test]
    fn test_default_backend_name() {
        let shaper = Shaper::new(Arc::new(FontRegistry::new()));
        #[cfg(feature = "shaping")]
        assert_eq!(shaper.backend_name(), "rustybuzz");
        #[cfg(not(feature = "shaping"))]
        assert_eq!(shaper.backend_name(), "primitive");
    }
}
