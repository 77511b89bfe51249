use std::sync::Arc;

use uuid::Uuid;
use wgpu::{AddressMode, FilterMode, TextureFormat};

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
        }
    }
}

impl TextureSampler {
    #[must_use]
    pub fn clamped() -> Self {
        Self {
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            ..Self::default()
        }
    }
}

/// Where the pixels came from. Used for logging and for re-fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureOrigin {
    /// Generated in memory (matcap bake, solid color, neutral maps).
    Generated,
    /// Embedded in a glTF/GLB buffer view or data URI.
    Embedded,
    /// Fetched from a URL or path.
    Uri(String),
}

/// A 2D texture resource.
///
/// Not `Clone`: each instance is one GPU allocation. Pixel bytes live behind an
/// `Arc` so [`Texture::duplicate`] is cheap while still producing a distinct
/// resource with its own identity.
#[derive(Debug)]
pub struct Texture {
    pub uuid: Uuid,
    pub name: String,

    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Arc<Vec<u8>>,

    pub sampler: TextureSampler,
    pub origin: TextureOrigin,
}

impl Texture {
    #[must_use]
    pub fn new_2d(name: &str, width: u32, height: u32, data: Vec<u8>, format: TextureFormat) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            width,
            height,
            format,
            data: Arc::new(data),
            sampler: TextureSampler::default(),
            origin: TextureOrigin::Generated,
        }
    }

    /// 1×1 texture of a single color.
    #[must_use]
    pub fn create_solid_color(name: &str, color: [u8; 4]) -> Texture {
        Self::new_2d(name, 1, 1, color.to_vec(), TextureFormat::Rgba8Unorm)
    }

    /// Decodes PNG/JPEG/WebP bytes into an RGBA8 texture.
    pub fn from_image_bytes(name: &str, bytes: &[u8], srgb: bool, origin: TextureOrigin) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        let format = if srgb {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };

        let mut texture = Self::new_2d(name, width, height, img.into_raw(), format);
        texture.origin = origin;
        Ok(texture)
    }

    /// A new resource sharing this texture's pixels.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            format: self.format,
            data: Arc::clone(&self.data),
            sampler: self.sampler,
            origin: self.origin.clone(),
        }
    }

    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// RGBA pixel at `(x, y)`; `None` outside the image or for non-RGBA8 formats.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if !matches!(self.format, TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb) {
            return None;
        }
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
