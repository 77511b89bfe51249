//! Shader Uniform Values
//!
//! Plain-data uniform values as they are fed to custom shaders. Texture-valued
//! uniforms are not represented here: they are resources with their own
//! lifetime and live in [`ShaderUniform::Texture`](crate::resources::material::ShaderUniform).

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Declared type of a uniform in a shader schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformType {
    Float,
    Int,
    Bool,
    Color,
    Vec2,
    Vec3,
    /// Sampler bound by the system (e.g. the matcap). Never user-editable.
    Texture,
}

impl UniformType {
    #[must_use]
    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Color | Self::Vec3 => "vec3",
            Self::Vec2 => "vec2",
            Self::Texture => "sampler2D",
        }
    }
}

/// A resolved, data-only uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    /// Linear RGB.
    Color(Vec3),
    Vec2(Vec2),
    Vec3(Vec3),
}

impl UniformValue {
    #[must_use]
    pub fn uniform_type(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Int(_) => UniformType::Int,
            Self::Bool(_) => UniformType::Bool,
            Self::Color(_) => UniformType::Color,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    /// Exact bit pattern comparison (distinguishes `0.0` from `-0.0`, equal NaNs).
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        fn bits(v: &[f32]) -> impl Iterator<Item = u32> + '_ {
            v.iter().map(|f| f.to_bits())
        }
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Color(a), Self::Color(b)) | (Self::Vec3(a), Self::Vec3(b)) => {
                bits(&a.to_array()).eq(bits(&b.to_array()))
            }
            (Self::Vec2(a), Self::Vec2(b)) => bits(&a.to_array()).eq(bits(&b.to_array())),
            _ => false,
        }
    }

    /// Converts to a JSON value in the same shape the catalog uses for defaults.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match *self {
            Self::Float(v) => json!(v),
            Self::Int(v) => json!(v),
            Self::Bool(v) => json!(v),
            Self::Color(c) | Self::Vec3(c) => json!([c.x, c.y, c.z]),
            Self::Vec2(v) => json!([v.x, v.y]),
        }
    }
}
