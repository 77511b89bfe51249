use std::collections::BTreeMap;

use crate::resources::texture::Texture;
use crate::resources::uniforms::UniformValue;

/// One entry of a custom shader's uniform dictionary.
#[derive(Debug)]
pub enum ShaderUniform {
    Value(UniformValue),
    /// Owned by the material; released together with it.
    Texture(Texture),
}

impl ShaderUniform {
    #[must_use]
    pub fn as_value(&self) -> Option<&UniformValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Texture(_) => None,
        }
    }
}

/// A material driven by a catalog shader.
#[derive(Debug)]
pub struct ShaderMaterial {
    pub shader_id: String,
    /// Hash of the compiled program, as produced by the program cache.
    pub program_key: u64,
    pub uniforms: BTreeMap<String, ShaderUniform>,
}

impl ShaderMaterial {
    #[must_use]
    pub fn new(shader_id: impl Into<String>, program_key: u64) -> Self {
        Self {
            shader_id: shader_id.into(),
            program_key,
            uniforms: BTreeMap::new(),
        }
    }

    pub fn set_value(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_string(), ShaderUniform::Value(value));
    }

    /// Replaces a texture uniform, returning the previous texture so the caller
    /// can release it.
    pub fn set_texture(&mut self, name: &str, texture: Texture) -> Option<Texture> {
        match self.uniforms.insert(name.to_string(), ShaderUniform::Texture(texture)) {
            Some(ShaderUniform::Texture(old)) => Some(old),
            _ => None,
        }
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name).and_then(ShaderUniform::as_value)
    }

    pub(crate) fn textures(&self) -> impl Iterator<Item = &Texture> {
        self.uniforms.values().filter_map(|u| match u {
            ShaderUniform::Texture(t) => Some(t),
            ShaderUniform::Value(_) => None,
        })
    }

    pub(crate) fn into_textures(self) -> Vec<Texture> {
        self.uniforms
            .into_values()
            .filter_map(|u| match u {
                ShaderUniform::Texture(t) => Some(t),
                ShaderUniform::Value(_) => None,
            })
            .collect()
    }

    pub(crate) fn duplicate(&self) -> Self {
        let uniforms = self
            .uniforms
            .iter()
            .map(|(k, u)| {
                let u = match u {
                    ShaderUniform::Value(v) => ShaderUniform::Value(*v),
                    ShaderUniform::Texture(t) => ShaderUniform::Texture(t.duplicate()),
                };
                (k.clone(), u)
            })
            .collect();
        Self {
            shader_id: self.shader_id.clone(),
            program_key: self.program_key,
            uniforms,
        }
    }
}
