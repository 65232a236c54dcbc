//! Boundary between atlas building and whatever owns GPU textures.

/// Turns rasterized atlas pages into textures.
///
/// Pixels are tightly packed rows: one coverage byte per pixel for alpha
/// pages, straight-alpha RGBA8 for color pages. Returning `None` makes
/// the atlas unavailable and callers draw glyphs directly instead.
pub trait AtlasBackend {
    type Texture;

    fn make_alpha_texture(&self, width: u32, height: u32, pixels: Vec<u8>) -> Option<Self::Texture>;

    fn make_rgba_texture(&self, width: u32, height: u32, pixels: Vec<u8>) -> Option<Self::Texture>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Alpha8,
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Alpha8 => 1,
            TextureFormat::Rgba8 => 4,
        }
    }
}

/// A texture kept in main memory.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuTexture {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

impl CpuTexture {
    /// Alpha of the pixel at (x, y), 0 outside the texture.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let bpp = self.format.bytes_per_pixel();
        let index = (y as usize * self.width as usize + x as usize) * bpp;
        self.pixels.get(index + bpp - 1).copied().unwrap_or(0)
    }
}

/// Backend for headless use and tests: pages stay in memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuTextureBackend;

impl CpuTextureBackend {
    fn make(width: u32, height: u32, format: TextureFormat, pixels: Vec<u8>) -> Option<CpuTexture> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if width == 0 || height == 0 || pixels.len() != expected {
            log::warn!(
                "CpuTextureBackend: {width}x{height} {format:?} texture got {} bytes",
                pixels.len()
            );
            return None;
        }
        Some(CpuTexture {
            width,
            height,
            format,
            pixels,
        })
    }
}

impl AtlasBackend for CpuTextureBackend {
    type Texture = CpuTexture;

    fn make_alpha_texture(&self, width: u32, height: u32, pixels: Vec<u8>) -> Option<CpuTexture> {
        Self::make(width, height, TextureFormat::Alpha8, pixels)
    }

    fn make_rgba_texture(&self, width: u32, height: u32, pixels: Vec<u8>) -> Option<CpuTexture> {
        Self::make(width, height, TextureFormat::Rgba8, pixels)
    }
}
