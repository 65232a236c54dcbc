use kurbo::Rect;

/// An RGBA8 (straight alpha) color glyph bitmap.
///
/// `left`/`top` place the top-left pixel relative to the glyph origin,
/// y-down, in pixels at `pixels_per_em`.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphImage {
    pub width: u32,
    pub height: u32,
    pub left: f32,
    pub top: f32,
    pub pixels_per_em: f32,
    pub pixels: Vec<u8>,
}

impl GlyphImage {
    /// Image rect relative to the glyph origin at its native resolution.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.left as f64,
            self.top as f64,
            (self.left + self.width as f32) as f64,
            (self.top + self.height as f32) as f64,
        )
    }

    /// Resamples the image so that it matches `size` pixels per em.
    /// Returns `None` when the result would be empty.
    pub fn scaled_to(&self, size: f32) -> Option<GlyphImage> {
        if self.pixels_per_em <= 0.0 {
            return None;
        }
        let scale = size / self.pixels_per_em;
        if (scale - 1.0).abs() < f32::EPSILON {
            return Some(self.clone());
        }
        let width = (self.width as f32 * scale).round() as u32;
        let height = (self.height as f32 * scale).round() as u32;
        if width == 0 || height == 0 {
            return None;
        }
        Some(GlyphImage {
            width,
            height,
            left: self.left * scale,
            top: self.top * scale,
            pixels_per_em: size,
            pixels: scale_pixels_bilinear(&self.pixels, self.width, self.height, width, height),
        })
    }
}

/// Bilinear resampling of tightly packed RGBA8 pixels.
pub(crate) fn scale_pixels_bilinear(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> Vec<u8> {
    let mut dst = vec![0u8; (dst_w as usize) * (dst_h as usize) * 4];
    if src_w == 0 || src_h == 0 || src.len() < (src_w as usize) * (src_h as usize) * 4 {
        return dst;
    }
    let scale_x = src_w as f32 / dst_w as f32;
    let scale_y = src_h as f32 / dst_h as f32;
    let max_x = src_w as i64 - 1;
    let max_y = src_h as i64 - 1;
    let row_bytes = src_w as usize * 4;

    for y in 0..dst_h {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = src_y.floor();
        let fy = src_y - y0;
        let y1 = (y0 as i64 + 1).clamp(0, max_y) as usize;
        let y0 = (y0 as i64).clamp(0, max_y) as usize;

        for x in 0..dst_w {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = src_x.floor();
            let fx = src_x - x0;
            let x1 = (x0 as i64 + 1).clamp(0, max_x) as usize;
            let x0 = (x0 as i64).clamp(0, max_x) as usize;

            let p00 = y0 * row_bytes + x0 * 4;
            let p10 = y0 * row_bytes + x1 * 4;
            let p01 = y1 * row_bytes + x0 * 4;
            let p11 = y1 * row_bytes + x1 * 4;
            let out = (y as usize * dst_w as usize + x as usize) * 4;
            for c in 0..4 {
                let v00 = src[p00 + c] as f32;
                let v10 = src[p10 + c] as f32;
                let v01 = src[p01 + c] as f32;
                let v11 = src[p11 + c] as f32;
                let v0 = v00 + (v10 - v00) * fx;
                let v1 = v01 + (v11 - v01) * fx;
                let v = v0 + (v1 - v0) * fy;
                dst[out + c] = v.clamp(0.0, 255.0).round() as u8;
            }
        }
    }
    dst
}
