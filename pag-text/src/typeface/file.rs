//! Typeface backed by an OpenType/TrueType file, parsed with ttf-parser.

use std::path::Path;
use std::sync::Arc;

use kurbo::{BezPath, Rect};
use ttf_parser::{name_id, Face, OutlineBuilder, RasterImageFormat};

use super::{next_unique_id, FontData, FontMetrics, GlyphId, GlyphImage, Typeface, TypefaceRef};
use crate::error::TypefaceError;

/// A font file held in memory. Tables are re-read on demand; parsing a
/// face only reads the table directory.
pub struct FileTypeface {
    unique_id: u32,
    data: Arc<[u8]>,
    index: u32,
    family: String,
    style: String,
    units_per_em: u16,
    glyphs_count: usize,
    has_color: bool,
    metrics: FontMetrics,
}

impl std::fmt::Debug for FileTypeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTypeface")
            .field("unique_id", &self.unique_id)
            .field("family", &self.family)
            .field("style", &self.style)
            .field("index", &self.index)
            .finish()
    }
}

impl FileTypeface {
    pub fn from_bytes(data: impl Into<Arc<[u8]>>, index: u32) -> Result<Self, TypefaceError> {
        let data: Arc<[u8]> = data.into();
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        if index >= count {
            return Err(TypefaceError::InvalidIndex { index, count });
        }
        let face = Face::parse(&data, index)?;
        let family = face_name(&face, &[name_id::TYPOGRAPHIC_FAMILY, name_id::FAMILY])
            .unwrap_or_default();
        let style = face_name(&face, &[name_id::TYPOGRAPHIC_SUBFAMILY, name_id::SUBFAMILY])
            .unwrap_or_else(|| "Regular".to_string());
        let tables = face.tables();
        let has_color = tables.sbix.is_some() || tables.cbdt.is_some();
        let metrics = FontMetrics {
            ascent: -(face.ascender() as f32),
            descent: -(face.descender() as f32),
            leading: face.line_gap() as f32,
            x_height: face.x_height().unwrap_or(0) as f32,
            cap_height: face.capital_height().unwrap_or(0) as f32,
        };
        let units_per_em = face.units_per_em();
        let glyphs_count = face.number_of_glyphs() as usize;
        drop(face);

        Ok(Self {
            unique_id: next_unique_id(),
            data,
            index,
            family,
            style,
            units_per_em,
            glyphs_count,
            has_color,
            metrics,
        })
    }

    pub fn from_path(path: impl AsRef<Path>, index: u32) -> Result<Self, TypefaceError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| TypefaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data, index)
    }

    /// Loads a typeface from memory, logging and returning `None` on failure.
    pub fn make_from_bytes(data: impl Into<Arc<[u8]>>, index: u32) -> Option<TypefaceRef> {
        match Self::from_bytes(data, index) {
            Ok(typeface) => Some(Arc::new(typeface)),
            Err(e) => {
                log::warn!("Failed to load typeface from bytes: {e}");
                None
            }
        }
    }

    /// Loads a typeface from disk, logging and returning `None` on failure.
    pub fn make_from_path(path: impl AsRef<Path>, index: u32) -> Option<TypefaceRef> {
        match Self::from_path(path, index) {
            Ok(typeface) => Some(Arc::new(typeface)),
            Err(e) => {
                log::warn!("Failed to load typeface: {e}");
                None
            }
        }
    }

    fn with_face<R>(&self, f: impl FnOnce(&Face<'_>) -> Option<R>) -> Option<R> {
        let face = Face::parse(&self.data, self.index).ok()?;
        f(&face)
    }
}

impl Typeface for FileTypeface {
    fn unique_id(&self) -> u32 {
        self.unique_id
    }

    fn font_family(&self) -> &str {
        &self.family
    }

    fn font_style(&self) -> &str {
        &self.style
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn has_color(&self) -> bool {
        self.has_color
    }

    fn glyphs_count(&self) -> usize {
        self.glyphs_count
    }

    fn glyph_id(&self, unichar: char) -> GlyphId {
        self.with_face(|face| face.glyph_index(unichar))
            .map(|id| id.0)
            .unwrap_or(0)
    }

    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn advance(&self, glyph_id: GlyphId, vertical: bool) -> f32 {
        let id = ttf_parser::GlyphId(glyph_id);
        self.with_face(|face| {
            if vertical {
                face.glyph_ver_advance(id)
            } else {
                face.glyph_hor_advance(id)
            }
        })
        .map(f32::from)
        .unwrap_or(0.0)
    }

    fn bounds(&self, glyph_id: GlyphId) -> Option<Rect> {
        let id = ttf_parser::GlyphId(glyph_id);
        self.with_face(|face| {
            if let Some(bbox) = face.glyph_bounding_box(id) {
                return Some(Rect::new(
                    bbox.x_min as f64,
                    -(bbox.y_max as f64),
                    bbox.x_max as f64,
                    -(bbox.y_min as f64),
                ));
            }
            // Bitmap-only glyphs: derive bounds from the largest strike.
            let raster = face.glyph_raster_image(id, u16::MAX)?;
            if raster.pixels_per_em == 0 {
                return None;
            }
            let scale = self.units_per_em as f64 / raster.pixels_per_em as f64;
            let left = raster.x as f64;
            let top = -(raster.y as f64 + raster.height as f64);
            Some(Rect::new(
                left * scale,
                top * scale,
                (left + raster.width as f64) * scale,
                (top + raster.height as f64) * scale,
            ))
        })
    }

    fn outline(&self, glyph_id: GlyphId) -> Option<BezPath> {
        self.with_face(|face| {
            let mut builder = PathBuilder(BezPath::new());
            face.outline_glyph(ttf_parser::GlyphId(glyph_id), &mut builder)?;
            Some(builder.0)
        })
    }

    fn image(&self, glyph_id: GlyphId, size: f32) -> Option<GlyphImage> {
        if !self.has_color {
            return None;
        }
        let ppem = size.ceil().clamp(1.0, u16::MAX as f32) as u16;
        self.with_face(|face| {
            let raster = face.glyph_raster_image(ttf_parser::GlyphId(glyph_id), ppem)?;
            let pixels = decode_raster(raster.format, raster.width, raster.height, raster.data)?;
            Some(GlyphImage {
                width: raster.width as u32,
                height: raster.height as u32,
                left: raster.x as f32,
                top: -(raster.y as f32 + raster.height as f32),
                pixels_per_em: raster.pixels_per_em as f32,
                pixels,
            })
        })
    }

    fn vertical_origin(&self, glyph_id: GlyphId) -> Option<f32> {
        self.with_face(|face| face.glyph_y_origin(ttf_parser::GlyphId(glyph_id)))
            .map(f32::from)
    }

    fn font_data(&self) -> Option<FontData> {
        Some(FontData {
            bytes: self.data.clone(),
            index: self.index,
        })
    }
}

fn face_name(face: &Face<'_>, ids: &[u16]) -> Option<String> {
    ids.iter().find_map(|id| {
        face.names()
            .into_iter()
            .filter(|name| name.name_id == *id)
            .find_map(|name| name.to_string())
            .filter(|name| !name.is_empty())
    })
}

fn decode_raster(format: RasterImageFormat, width: u16, height: u16, data: &[u8]) -> Option<Vec<u8>> {
    match format {
        RasterImageFormat::PNG => {
            let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png).ok()?;
            Some(decoded.to_rgba8().into_raw())
        }
        RasterImageFormat::BitmapPremulBgra32 => {
            let expected = width as usize * height as usize * 4;
            if data.len() < expected {
                return None;
            }
            let mut pixels = Vec::with_capacity(expected);
            for px in data[..expected].chunks_exact(4) {
                let (b, g, r, a) = (px[0], px[1], px[2], px[3]);
                let unpremultiply = |c: u8| {
                    if a == 0 {
                        0
                    } else {
                        ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8
                    }
                };
                pixels.extend_from_slice(&[unpremultiply(r), unpremultiply(g), unpremultiply(b), a]);
            }
            Some(pixels)
        }
        _ => None,
    }
}

/// Collects ttf-parser outline callbacks into a y-down kurbo path.
struct PathBuilder(BezPath);

impl OutlineBuilder for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to((x as f64, -y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to((x as f64, -y as f64));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to((x1 as f64, -y1 as f64), (x as f64, -y as f64));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.curve_to(
            (x1 as f64, -y1 as f64),
            (x2 as f64, -y2 as f64),
            (x as f64, -y as f64),
        );
    }

    fn close(&mut self) {
        self.0.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = FileTypeface::from_bytes(vec![0u8; 16], 0);
        assert!(matches!(result, Err(TypefaceError::Parse(_))));
    }

    #[test]
    fn test_from_bytes_rejects_bad_index() {
        let result = FileTypeface::from_bytes(vec![0u8; 16], 3);
        assert!(matches!(result, Err(TypefaceError::InvalidIndex { index: 3, count: 1 })));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ttf");
        assert!(matches!(
            FileTypeface::from_path(&missing, 0),
            Err(TypefaceError::Io { .. })
        ));
        assert!(FileTypeface::make_from_path(&missing, 0).is_none());
    }

    #[test]
    fn test_from_path_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        assert!(FileTypeface::make_from_path(&path, 0).is_none());
    }

    #[test]
    fn test_decode_premultiplied_bgra() {
        let data = [0u8, 0, 128, 128];
        let pixels = decode_raster(RasterImageFormat::BitmapPremulBgra32, 1, 1, &data).unwrap();
        assert_eq!(pixels, vec![255, 0, 0, 128]);
    }

    #[test]
    fn test_path_builder_flips_y() {
        let mut builder = PathBuilder(BezPath::new());
        builder.move_to(0.0, 10.0);
        builder.line_to(5.0, 0.0);
        builder.close();
        let bbox = kurbo::Shape::bounding_box(&builder.0);
        assert_eq!(bbox.y0, -10.0);
        assert_eq!(bbox.y1, 0.0);
    }
}
