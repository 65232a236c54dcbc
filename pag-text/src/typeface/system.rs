//! System font lookup through cosmic-text's font database.
//!
//! ```text
//! SystemFonts
//!   ├── font_system: FontSystem (fontdb::Database of installed faces)
//!   ├── loaded: fontdb::ID → TypefaceRef          (stable unique IDs)
//!   └── make_from_name(family, style)
//!         family/weight/style query → sans-serif query → first face
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use cosmic_text::fontdb::{self, Family, Query, Stretch, Style, Weight};
use cosmic_text::FontSystem;
use parking_lot::Mutex;

use super::{FileTypeface, TypefaceRef};

/// Resolves a (family, style) name pair to a typeface. Implemented by the
/// platform font source; tests provide their own.
pub trait FontSource: Send + Sync {
    fn make_from_name(&self, family: &str, style: &str) -> Option<TypefaceRef>;
}

/// Installed system fonts.
pub struct SystemFonts {
    font_system: Mutex<FontSystem>,
    loaded: Mutex<HashMap<fontdb::ID, TypefaceRef>>,
    discovery_time_ms: f64,
}

impl SystemFonts {
    /// Loads the system font database. This scans font directories, so
    /// call it once and share the result.
    pub fn discover() -> Self {
        let start = Instant::now();
        let font_system = FontSystem::new();
        let discovery_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "SystemFonts: discovered {} faces ({:.1}ms)",
            font_system.db().len(),
            discovery_time_ms,
        );
        Self::with_font_system(font_system, discovery_time_ms)
    }

    /// Wraps a prepared database, e.g. one filled with `load_font_data`.
    pub fn from_database(db: fontdb::Database) -> Self {
        let font_system = FontSystem::new_with_locale_and_db("en-US".to_string(), db);
        Self::with_font_system(font_system, 0.0)
    }

    fn with_font_system(font_system: FontSystem, discovery_time_ms: f64) -> Self {
        Self {
            font_system: Mutex::new(font_system),
            loaded: Mutex::new(HashMap::new()),
            discovery_time_ms,
        }
    }

    pub fn face_count(&self) -> usize {
        self.font_system.lock().db().len()
    }

    pub fn discovery_time_ms(&self) -> f64 {
        self.discovery_time_ms
    }

    fn query(&self, families: &[Family<'_>], weight: Weight, style: Style) -> Option<fontdb::ID> {
        let font_system = self.font_system.lock();
        font_system.db().query(&Query {
            families,
            weight,
            stretch: Stretch::Normal,
            style,
        })
    }

    fn load(&self, id: fontdb::ID) -> Option<TypefaceRef> {
        if let Some(typeface) = self.loaded.lock().get(&id) {
            return Some(typeface.clone());
        }
        let data = {
            let font_system = self.font_system.lock();
            font_system
                .db()
                .with_face_data(id, |bytes, index| (bytes.to_vec(), index))
        };
        let (bytes, index) = data?;
        let typeface = FileTypeface::make_from_bytes(bytes, index)?;
        // Another thread may have loaded the face meanwhile; the first one
        // stored keeps its unique ID.
        let typeface = self.loaded.lock().entry(id).or_insert(typeface).clone();
        Some(typeface)
    }

    fn first_face(&self) -> Option<fontdb::ID> {
        let font_system = self.font_system.lock();
        let id = font_system.db().faces().next().map(|face| face.id);
        id
    }
}

impl FontSource for SystemFonts {
    fn make_from_name(&self, family: &str, style: &str) -> Option<TypefaceRef> {
        let (weight, font_style) = parse_font_style(style);
        let id = self
            .query(&[Family::Name(family)], weight, font_style)
            .or_else(|| self.query(&[Family::SansSerif], weight, font_style))
            .or_else(|| self.first_face());
        match id {
            Some(id) => self.load(id),
            None => {
                log::debug!("SystemFonts: no face for '{family}' '{style}'");
                None
            }
        }
    }
}

impl fmt::Display for SystemFonts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SystemFonts({} faces, {} loaded, {:.1}ms)",
            self.face_count(),
            self.loaded.lock().len(),
            self.discovery_time_ms,
        )
    }
}

// ── Style names ─────────────────────────────────────────────────────

/// Maps a style name such as "Bold Italic" or "SemiBold" to a weight
/// and slant. Unknown words are ignored.
pub fn parse_font_style(style: &str) -> (Weight, Style) {
    let lower = style.to_lowercase();
    let compact: String = lower.chars().filter(|c| c.is_alphanumeric()).collect();
    let weight = if compact.contains("thin") || compact.contains("hairline") {
        Weight::THIN
    } else if compact.contains("extralight") || compact.contains("ultralight") {
        Weight::EXTRA_LIGHT
    } else if compact.contains("semibold") || compact.contains("demibold") {
        Weight::SEMIBOLD
    } else if compact.contains("extrabold") || compact.contains("ultrabold") {
        Weight::EXTRA_BOLD
    } else if compact.contains("black") || compact.contains("heavy") {
        Weight::BLACK
    } else if compact.contains("bold") {
        Weight::BOLD
    } else if compact.contains("medium") {
        Weight::MEDIUM
    } else if compact.contains("light") {
        Weight::LIGHT
    } else {
        Weight::NORMAL
    };
    let slant = if compact.contains("italic") {
        Style::Italic
    } else if compact.contains("oblique") {
        Style::Oblique
    } else {
        Style::Normal
    };
    (weight, slant)
}
