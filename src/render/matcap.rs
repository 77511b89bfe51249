use std::sync::Arc;

use glam::Vec3;
use wgpu::TextureFormat;

use crate::resources::texture::{Texture, TextureOrigin, TextureSampler};

/// Largest matcap edge, in pixels.
pub const MAX_MATCAP_RESOLUTION: u32 = 4096;

/// Baked "clay" lighting sphere used by Solid and Flat modes.
///
/// The pixels are baked once per library; every materialization gets its own
/// texture resource sharing them.
#[derive(Debug, Clone)]
pub struct MatcapLibrary {
    resolution: u32,
    pixels: Arc<Vec<u8>>,
}

impl Default for MatcapLibrary {
    fn default() -> Self {
        Self::new(256)
    }
}

impl MatcapLibrary {
    #[must_use]
    pub fn new(resolution: u32) -> Self {
        let resolution = resolution.clamp(2, MAX_MATCAP_RESOLUTION);
        Self {
            resolution,
            pixels: Arc::new(bake_clay(resolution)),
        }
    }

    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// A fresh texture resource for the default matcap.
    #[must_use]
    pub fn default_texture(&self) -> Texture {
        Texture {
            uuid: uuid::Uuid::new_v4(),
            name: "matcap_clay".to_string(),
            width: self.resolution,
            height: self.resolution,
            format: TextureFormat::Rgba8UnormSrgb,
            data: Arc::clone(&self.pixels),
            sampler: TextureSampler::clamped(),
            origin: TextureOrigin::Generated,
        }
    }
}

/// Shades a unit sphere seen head-on: one warm key light, a cool fill and a
/// soft rim, over a neutral clay albedo.
fn bake_clay(size: u32) -> Vec<u8> {
    let key = Vec3::new(-0.45, 0.6, 0.66).normalize();
    let fill = Vec3::new(0.6, -0.2, 0.77).normalize();
    let albedo = Vec3::new(0.78, 0.76, 0.74);
    let key_color = Vec3::new(1.0, 0.97, 0.92);
    let fill_color = Vec3::new(0.55, 0.6, 0.7);
    let ambient = 0.12;

    let mut out = Vec::with_capacity(size as usize * size as usize * 4);
    let half = (size - 1) as f32 * 0.5;

    for y in 0..size {
        for x in 0..size {
            let u = (x as f32 - half) / half;
            // Image rows go down, view-space y goes up.
            let v = (half - y as f32) / half;
            let r2 = (u * u + v * v).min(1.0);
            let n = Vec3::new(u, v, (1.0 - r2).sqrt()).normalize_or_zero();

            let diffuse = key_color * n.dot(key).max(0.0) + fill_color * 0.4 * n.dot(fill).max(0.0);
            let half_vec = (key + Vec3::Z).normalize();
            let specular = n.dot(half_vec).max(0.0).powf(40.0) * 0.35;
            let rim = (1.0 - n.z).powf(3.0) * 0.25;

            let c = albedo * (diffuse + Vec3::splat(ambient)) + Vec3::splat(specular + rim);
            let to_u8 = |f: f32| (f.clamp(0.0, 1.0) * 255.0).round() as u8;
            out.extend_from_slice(&[to_u8(c.x), to_u8(c.y), to_u8(c.z), 255]);
        }
    }
    out
}
