//! Material presets.
//!
//! A preset replaces whatever the render mode would have assigned. Visual
//! presets are plain PBR (or transparent) parameter sets. Procedural presets
//! project a texture set onto the mesh along the three world axes, so meshes
//! without usable UVs still texture cleanly.
//!
//! Serialized as an id plus exactly one of `visual` / `procedural`:
//!
//! ```json
//! { "id": "granite", "procedural": { "source": { "preset": "granite" }, "scale": 4.0 } }
//! { "id": "glass", "visual": { "color": [0.9, 0.95, 1.0], "opacity": 0.3, "transparent": true } }
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::assets::io::AssetReaderVariant;
use crate::errors::{Error, Result};
use crate::render::templates::render_template;
use crate::resources::material::{
    Material, MaterialVariant, StandardMaterial, TransparentMaterial, TriplanarMaterial,
};
use crate::resources::texture::{Texture, TextureOrigin};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPreset {
    pub id: String,
    #[serde(flatten)]
    pub kind: PresetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    Visual(VisualPreset),
    Procedural(ProceduralPreset),
}

impl MaterialPreset {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualPreset {
    pub color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transparent: bool,
}

impl Default for VisualPreset {
    fn default() -> Self {
        Self {
            color: Vec3::splat(0.8),
            metalness: 0.0,
            roughness: 0.5,
            opacity: 1.0,
            transparent: false,
        }
    }
}

/// Where a procedural preset's textures come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSource {
    /// A directory under the procedural base path holding
    /// `color.jpg`, `normal.jpg` and `roughness.jpg`.
    Preset(String),
    /// Generated textures by URL. Missing maps are replaced by neutral ones.
    Generated {
        color: String,
        #[serde(default)]
        normal: Option<String>,
        #[serde(default)]
        roughness: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralPreset {
    pub source: TextureSource,
    /// Texture repeats across the mesh's bounding diagonal.
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_sharpness")]
    pub blend_sharpness: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default = "default_normal_strength")]
    pub normal_strength: f32,
}

fn default_scale() -> f32 {
    1.0
}
fn default_sharpness() -> f32 {
    4.0
}
fn default_roughness() -> f32 {
    1.0
}
fn default_normal_strength() -> f32 {
    1.0
}

/// Per-axis blend weights for a surface normal: `|n|^sharpness`, normalized
/// to sum to one.
#[must_use]
pub fn triplanar_weights(normal: Vec3, sharpness: f32) -> Vec3 {
    let w = normal.abs().powf(sharpness);
    let sum = w.x + w.y + w.z;
    if sum > f32::EPSILON {
        w / sum
    } else {
        Vec3::splat(1.0 / 3.0)
    }
}

/// World-space sampling scale: `preset_scale / diagonal`. A degenerate
/// diagonal leaves the preset scale as is.
#[must_use]
pub fn texture_scale(preset_scale: f32, diagonal: f32) -> f32 {
    if diagonal > 0.0 && diagonal.is_finite() {
        preset_scale / diagonal
    } else {
        preset_scale
    }
}

/// Flat normal (0, 0, 1) encoded in RGB.
pub const NEUTRAL_NORMAL: [u8; 4] = [128, 128, 255, 255];
/// Full roughness; the material's own roughness factor applies unscaled.
pub const NEUTRAL_ROUGHNESS: [u8; 4] = [255, 255, 255, 255];

/// The three maps of a procedural preset.
///
/// Decoded pixels only; nothing here is owned by a scope. Materials that
/// reach the renderer hold a [`duplicate`](Self::duplicate).
#[derive(Debug)]
pub struct PresetTextures {
    pub color: Texture,
    pub normal: Texture,
    pub roughness: Texture,
    pub neutral_normal: bool,
    pub neutral_roughness: bool,
}

impl PresetTextures {
    /// Color only; normal and roughness are neutral 1×1 textures.
    #[must_use]
    pub fn color_only(color: Texture) -> Self {
        Self {
            color,
            normal: Texture::create_solid_color("neutral_normal", NEUTRAL_NORMAL),
            roughness: Texture::create_solid_color("neutral_roughness", NEUTRAL_ROUGHNESS),
            neutral_normal: true,
            neutral_roughness: true,
        }
    }

    /// New texture resources sharing these pixels.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            color: self.color.duplicate(),
            normal: self.normal.duplicate(),
            roughness: self.roughness.duplicate(),
            neutral_normal: self.neutral_normal,
            neutral_roughness: self.neutral_roughness,
        }
    }
}

pub struct ProceduralMaterialSynthesizer {
    base_path: String,
}

impl ProceduralMaterialSynthesizer {
    #[must_use]
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into().trim_end_matches('/').to_string(),
        }
    }

    fn preset_path(&self, name: &str, map: &str) -> String {
        if self.base_path.is_empty() {
            format!("{name}/{map}.jpg")
        } else {
            format!("{}/{name}/{map}.jpg", self.base_path)
        }
    }

    /// Fetches and decodes the maps of a procedural preset.
    pub async fn fetch_textures(&self, preset: &ProceduralPreset, reader: &AssetReaderVariant) -> Result<PresetTextures> {
        match &preset.source {
            TextureSource::Preset(name) => {
                let color_uri = self.preset_path(name, "color");
                let normal_uri = self.preset_path(name, "normal");
                let roughness_uri = self.preset_path(name, "roughness");
                log::info!("Fetching procedural preset '{name}'");

                let (color, normal, roughness) = futures::try_join!(
                    reader.read_bytes(&color_uri),
                    reader.read_bytes(&normal_uri),
                    reader.read_bytes(&roughness_uri),
                )?;

                Ok(PresetTextures {
                    color: decode(&color_uri, &color, true)?,
                    normal: decode(&normal_uri, &normal, false)?,
                    roughness: decode(&roughness_uri, &roughness, false)?,
                    neutral_normal: false,
                    neutral_roughness: false,
                })
            }
            TextureSource::Generated {
                color,
                normal,
                roughness,
            } => {
                let bytes = reader.read_bytes(color).await?;
                let mut textures = PresetTextures::color_only(decode(color, &bytes, true)?);
                if let Some(uri) = normal {
                    textures.normal = decode(uri, &reader.read_bytes(uri).await?, false)?;
                    textures.neutral_normal = false;
                }
                if let Some(uri) = roughness {
                    textures.roughness = decode(uri, &reader.read_bytes(uri).await?, false)?;
                    textures.neutral_roughness = false;
                }
                Ok(textures)
            }
        }
    }

    /// Builds the material for `preset`. Procedural presets need their
    /// textures; visual presets ignore them.
    pub fn synthesize(&self, preset: &MaterialPreset, textures: Option<PresetTextures>, diagonal: f32) -> Result<Material> {
        let material = match &preset.kind {
            PresetKind::Visual(visual) => visual_material(visual),
            PresetKind::Procedural(procedural) => {
                let textures = textures.ok_or_else(|| {
                    Error::Config(format!("procedural preset '{}' has no textures", preset.id))
                })?;
                triplanar_material(procedural, textures, diagonal)?
            }
        };
        Ok(material.with_name(preset.id.clone()))
    }
}

fn decode(uri: &str, bytes: &[u8], srgb: bool) -> Result<Texture> {
    let name = uri.rsplit('/').next().unwrap_or(uri);
    Texture::from_image_bytes(name, bytes, srgb, TextureOrigin::Uri(uri.to_string()))
}

fn visual_material(visual: &VisualPreset) -> Material {
    let opacity = visual.opacity.clamp(0.0, 1.0);
    let color = visual.color.extend(opacity);

    if visual.transparent {
        let mut material = Material::new(MaterialVariant::Transparent(TransparentMaterial {
            color,
            metalness: visual.metalness,
            roughness: visual.roughness,
            transmission: 1.0 - opacity,
        }));
        let settings = material.settings_mut();
        settings.transparent = true;
        settings.opacity = opacity;
        settings.depth_write = false;
        return material;
    }

    let mut material =
        Material::new(MaterialVariant::Standard(StandardMaterial::new(color).with_pbr(visual.metalness, visual.roughness)));
    material.settings_mut().opacity = opacity;
    material
}

fn triplanar_material(preset: &ProceduralPreset, textures: PresetTextures, diagonal: f32) -> Result<Material> {
    let blend_sharpness = preset.blend_sharpness.clamp(1.0, 64.0);
    let ctx = json!({
        "use_normal_map": !textures.neutral_normal,
        "use_roughness_map": !textures.neutral_roughness,
        "normal_strength": preset.normal_strength,
        "roughness": preset.roughness.clamp(0.0, 1.0),
        "opacity": 1.0,
    });

    let vertex_source = render_template("triplanar.vert", &ctx)?;
    let fragment_source = render_template("triplanar.frag", &ctx)?;

    Ok(Material::new(MaterialVariant::Triplanar(TriplanarMaterial {
        color_map: textures.color,
        normal_map: textures.normal,
        roughness_map: textures.roughness,
        scale: texture_scale(preset.scale, diagonal),
        blend_sharpness,
        vertex_source,
        fragment_source,
    })))
}
