use crate::resources::material::MaterialFeatures;
use crate::resources::texture::Texture;

/// Samples three 2D maps along the world axes and blends by the surface normal.
#[derive(Debug)]
pub struct TriplanarMaterial {
    pub color_map: Texture,
    pub normal_map: Texture,
    pub roughness_map: Texture,
    /// World units → texture repeats (`preset_scale / bounding_diagonal`).
    pub scale: f32,
    /// Exponent applied to `|n|` before normalizing the axis weights.
    pub blend_sharpness: f32,
    /// Generated GLSL (vertex, fragment).
    pub vertex_source: String,
    pub fragment_source: String,
}

impl TriplanarMaterial {
    pub(crate) fn features(&self) -> MaterialFeatures {
        MaterialFeatures::TRIPLANAR
            | MaterialFeatures::USE_MAP
            | MaterialFeatures::USE_NORMAL_MAP
            | MaterialFeatures::USE_ROUGHNESS_MAP
    }

    pub(crate) fn textures(&self) -> impl Iterator<Item = &Texture> {
        [&self.color_map, &self.normal_map, &self.roughness_map].into_iter()
    }

    pub(crate) fn into_textures(self) -> Vec<Texture> {
        vec![self.color_map, self.normal_map, self.roughness_map]
    }

    pub(crate) fn duplicate(&self) -> Self {
        Self {
            color_map: self.color_map.duplicate(),
            normal_map: self.normal_map.duplicate(),
            roughness_map: self.roughness_map.duplicate(),
            scale: self.scale,
            blend_sharpness: self.blend_sharpness,
            vertex_source: self.vertex_source.clone(),
            fragment_source: self.fragment_source.clone(),
        }
    }
}
