use glam::{Vec3, Vec4};

use crate::resources::material::MaterialFeatures;
use crate::resources::texture::Texture;

/// Metallic-roughness PBR material, as authored in glTF files.
#[derive(Debug)]
pub struct StandardMaterial {
    pub color: Vec4,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub normal_scale: f32,
    pub ao_strength: f32,
    pub flat_shading: bool,
    pub vertex_colors: bool,

    pub map: Option<Texture>,
    pub normal_map: Option<Texture>,
    pub roughness_map: Option<Texture>,
    pub emissive_map: Option<Texture>,
    pub ao_map: Option<Texture>,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}

impl StandardMaterial {
    #[must_use]
    pub fn new(color: Vec4) -> Self {
        Self {
            color,
            metalness: 0.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 1.0,
            normal_scale: 1.0,
            ao_strength: 1.0,
            flat_shading: false,
            vertex_colors: false,
            map: None,
            normal_map: None,
            roughness_map: None,
            emissive_map: None,
            ao_map: None,
        }
    }

    #[must_use]
    pub fn with_pbr(mut self, metalness: f32, roughness: f32) -> Self {
        self.metalness = metalness;
        self.roughness = roughness;
        self
    }

    pub(crate) fn features(&self) -> MaterialFeatures {
        let mut f = MaterialFeatures::empty();
        f.set(MaterialFeatures::USE_MAP, self.map.is_some());
        f.set(MaterialFeatures::USE_NORMAL_MAP, self.normal_map.is_some());
        f.set(MaterialFeatures::USE_ROUGHNESS_MAP, self.roughness_map.is_some());
        f.set(MaterialFeatures::USE_EMISSIVE_MAP, self.emissive_map.is_some());
        f.set(MaterialFeatures::USE_AO_MAP, self.ao_map.is_some());
        f.set(MaterialFeatures::USE_VERTEX_COLOR, self.vertex_colors);
        f.set(MaterialFeatures::FLAT_SHADING, self.flat_shading);
        f
    }

    pub(crate) fn textures(&self) -> impl Iterator<Item = &Texture> {
        [
            &self.map,
            &self.normal_map,
            &self.roughness_map,
            &self.emissive_map,
            &self.ao_map,
        ]
        .into_iter()
        .flatten()
    }

    pub(crate) fn into_textures(self) -> Vec<Texture> {
        [self.map, self.normal_map, self.roughness_map, self.emissive_map, self.ao_map]
            .into_iter()
            .flatten()
            .collect()
    }

    pub(crate) fn duplicate(&self) -> Self {
        Self {
            map: self.map.as_ref().map(Texture::duplicate),
            normal_map: self.normal_map.as_ref().map(Texture::duplicate),
            roughness_map: self.roughness_map.as_ref().map(Texture::duplicate),
            emissive_map: self.emissive_map.as_ref().map(Texture::duplicate),
            ao_map: self.ao_map.as_ref().map(Texture::duplicate),
            ..*self
        }
    }
}
