//! Font registry: registered typefaces, fallback list and the font
//! resolution policy.
//!
//! ## Architecture
//!
//! ```text
//! FontRegistry (Arc-shared, owned by the rendering context)
//!   ├── registered: Vec<(FontKey, TypefaceRef)>   insertion ordered
//!   ├── fallbacks:  Vec<TypefaceRef>               priority ordered
//!   └── font_source: Option<Arc<dyn FontSource>>   system lookup
//! ```
//!
//! Reads happen on every shape call, writes only on reconfiguration, so
//! both lists sit behind `RwLock`s.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::typeface::{FontSource, SystemFonts, TypefaceRef};

const DEFAULT_STYLE: &str = "Regular";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    style: String,
}

impl FontKey {
    fn new(family: &str, style: &str) -> Self {
        Self {
            family: family.to_string(),
            style: normalize_style(style).to_string(),
        }
    }
}

fn normalize_style(style: &str) -> &str {
    if style.is_empty() {
        DEFAULT_STYLE
    } else {
        style
    }
}

#[derive(Default)]
pub struct FontRegistry {
    registered: RwLock<Vec<(FontKey, TypefaceRef)>>,
    fallbacks: RwLock<Vec<TypefaceRef>>,
    font_source: Option<Arc<dyn FontSource>>,
}

impl FontRegistry {
    /// A registry without system font lookup.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_source(font_source: Arc<dyn FontSource>) -> Self {
        Self {
            font_source: Some(font_source),
            ..Self::default()
        }
    }

    /// Scans the installed fonts once and uses them for rule 5 lookups.
    pub fn with_system_fonts() -> Self {
        Self::with_font_source(Arc::new(SystemFonts::discover()))
    }

    // ── Registration ────────────────────────────────────────────────

    /// Registers under the typeface's own family and style names.
    pub fn register_typeface(&self, typeface: TypefaceRef) {
        let family = typeface.font_family().to_string();
        let style = typeface.font_style().to_string();
        self.register_typeface_as(typeface, &family, &style);
    }

    /// Registers under explicit names, replacing an earlier registration
    /// of the same (family, style).
    pub fn register_typeface_as(&self, typeface: TypefaceRef, family: &str, style: &str) {
        let key = FontKey::new(family, style);
        let mut registered = self.registered.write();
        match registered.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = typeface,
            None => registered.push((key, typeface)),
        }
    }

    /// Removes a registration. Shapers holding per-typeface state should
    /// be purged afterwards.
    pub fn unregister_typeface(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        let key = FontKey::new(family, style);
        let mut registered = self.registered.write();
        let index = registered.iter().position(|(k, _)| *k == key)?;
        Some(registered.remove(index).1)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.read().len()
    }

    pub fn set_fallback_typefaces(&self, typefaces: Vec<TypefaceRef>) {
        *self.fallbacks.write() = typefaces;
    }

    pub fn add_fallback_typeface(&self, typeface: TypefaceRef) {
        self.fallbacks.write().push(typeface);
    }

    /// Snapshot of the fallback list in priority order.
    pub fn fallback_typefaces(&self) -> Vec<TypefaceRef> {
        self.fallbacks.read().clone()
    }

    // ── Resolution ──────────────────────────────────────────────────

    fn registered_exact(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        let key = FontKey::new(family, style);
        self.registered
            .read()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, typeface)| typeface.clone())
    }

    fn registered_family(&self, family: &str) -> Option<TypefaceRef> {
        self.registered
            .read()
            .iter()
            .find(|(k, _)| k.family == family)
            .map(|(_, typeface)| typeface.clone())
    }

    /// Resolves the typeface for a text node, first match wins:
    ///
    /// 1. registered (family, style), style defaulting to "Regular";
    /// 2. registered family, any style;
    /// 3. fallback whose family equals `family`;
    /// 4. first fallback;
    /// 5. system font source, when `family` is non-empty;
    /// 6. nothing.
    pub fn find_typeface(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        if let Some(typeface) = self.registered_exact(family, style) {
            return Some(typeface);
        }
        if let Some(typeface) = self.registered_family(family) {
            return Some(typeface);
        }
        {
            let fallbacks = self.fallbacks.read();
            if let Some(typeface) = fallbacks.iter().find(|t| t.font_family() == family) {
                return Some(typeface.clone());
            }
            if let Some(typeface) = fallbacks.first() {
                return Some(typeface.clone());
            }
        }
        if family.is_empty() {
            return None;
        }
        self.font_source
            .as_ref()?
            .make_from_name(family, normalize_style(style))
    }

    /// System lookup that rejects the platform's substitute when its
    /// family differs from the requested one.
    pub fn make_typeface_with_name(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        if family.is_empty() {
            return None;
        }
        let typeface = self
            .font_source
            .as_ref()?
            .make_from_name(family, normalize_style(style))?;
        if typeface.font_family() == family {
            Some(typeface)
        } else {
            None
        }
    }

    /// Registered or exact system match, never a fallback. A name of the
    /// form "Family Style" is retried split at its first space.
    pub fn typeface_without_fallback(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        let lookup = |family: &str, style: &str| {
            self.registered_exact(family, style)
                .or_else(|| self.make_typeface_with_name(family, style))
        };
        if let Some(typeface) = lookup(family, style) {
            return Some(typeface);
        }
        let (split_family, split_style) = family.split_once(' ')?;
        if split_family.is_empty() || split_style.is_empty() {
            return None;
        }
        lookup(split_family, split_style)
    }
}

impl fmt::Display for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FontRegistry({} registered, {} fallbacks, system fonts: {})",
            self.registered_count(),
            self.fallbacks.read().len(),
            self.font_source.is_some(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fallback_typeface, test_typeface_named};
    use crate::typeface::same_typeface;

    struct FakeSource {
        typeface: TypefaceRef,
    }

    impl FontSource for FakeSource {
        fn make_from_name(&self, _family: &str, _style: &str) -> Option<TypefaceRef> {
            Some(self.typeface.clone())
        }
    }

    fn is(a: &Option<TypefaceRef>, b: &TypefaceRef) -> bool {
        a.as_ref().is_some_and(|a| same_typeface(a, b))
    }

    #[test]
    fn test_exact_and_family_match() {
        let registry = FontRegistry::new();
        let bold = test_typeface_named("Foo", "Bold");
        registry.register_typeface(bold.clone());
        assert!(is(&registry.find_typeface("Foo", "Bold"), &bold));
        assert!(is(&registry.find_typeface("Foo", "Italic"), &bold));
        assert!(registry.find_typeface("Bar", "Bold").is_none());
    }

    #[test]
    fn test_style_defaults_to_regular() {
        let registry = FontRegistry::new();
        let bold = test_typeface_named("Foo", "Bold");
        let regular = test_typeface_named("Foo", "Regular");
        registry.register_typeface(bold);
        registry.register_typeface(regular.clone());
        assert!(is(&registry.find_typeface("Foo", ""), &regular));
    }

    #[test]
    fn test_fallback_rules() {
        let registry = FontRegistry::new();
        let first = test_typeface_named("First", "Regular");
        let fallback = fallback_typeface();
        registry.set_fallback_typefaces(vec![first.clone(), fallback.clone()]);
        // Rule 3: same family among fallbacks.
        assert!(is(&registry.find_typeface("Fallback", "Regular"), &fallback));
        // Rule 4: first fallback unconditionally.
        assert!(is(&registry.find_typeface("Missing", "Regular"), &first));
        assert!(is(&registry.find_typeface("", ""), &first));
    }

    #[test]
    fn test_system_source_is_last() {
        let system = test_typeface_named("System", "Regular");
        let registry = FontRegistry::with_font_source(Arc::new(FakeSource {
            typeface: system.clone(),
        }));
        assert!(is(&registry.find_typeface("Anything", "Bold"), &system));
        // Rule 6: empty family with no fallbacks.
        assert!(registry.find_typeface("", "").is_none());
    }

    #[test]
    fn test_register_replaces_same_key() {
        let registry = FontRegistry::new();
        let a = test_typeface_named("Foo", "Regular");
        let b = test_typeface_named("Foo", "Regular");
        registry.register_typeface(a);
        registry.register_typeface(b.clone());
        assert_eq!(registry.registered_count(), 1);
        assert!(is(&registry.find_typeface("Foo", "Regular"), &b));
        assert!(registry.unregister_typeface("Foo", "").is_some());
        assert_eq!(registry.registered_count(), 0);
        assert!(registry.unregister_typeface("Foo", "").is_none());
    }

    #[test]
    fn test_make_typeface_with_name_rejects_substitute() {
        let registry = FontRegistry::with_font_source(Arc::new(FakeSource {
            typeface: test_typeface_named("Substitute", "Regular"),
        }));
        assert!(registry.make_typeface_with_name("Wanted", "Regular").is_none());
        assert!(registry.make_typeface_with_name("Substitute", "Regular").is_some());
    }

    #[test]
    fn test_without_fallback_splits_family_style() {
        let registry = FontRegistry::new();
        let bold = test_typeface_named("Foo", "Bold");
        registry.register_typeface(bold.clone());
        registry.set_fallback_typefaces(vec![fallback_typeface()]);
        assert!(is(&registry.typeface_without_fallback("Foo Bold", ""), &bold));
        assert!(registry.typeface_without_fallback("Foo", "Italic").is_none());
        assert!(registry.typeface_without_fallback("Bar", "").is_none());
    }

    #[test]
    fn test_display() {
        let registry = FontRegistry::new();
        registry.add_fallback_typeface(fallback_typeface());
        assert_eq!(
            format!("{registry}"),
            "FontRegistry(0 registered, 1 fallbacks, system fonts: false)"
        );
    }
}
