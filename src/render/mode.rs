use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

const SHADER_PREFIX: &str = "shader:";

/// Visual materialization strategy for the loaded mesh.
///
/// Serialized as a bare lower-case name (`"wireframe"`) or `"shader:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RenderMode {
    #[default]
    Solid,
    Wireframe,
    NormalMap,
    Flat,
    Smooth,
    Textured,
    Shader(String),
}

impl RenderMode {
    #[must_use]
    pub fn shader_id(&self) -> Option<&str> {
        match self {
            Self::Shader(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solid => f.write_str("solid"),
            Self::Wireframe => f.write_str("wireframe"),
            Self::NormalMap => f.write_str("normal"),
            Self::Flat => f.write_str("flat"),
            Self::Smooth => f.write_str("smooth"),
            Self::Textured => f.write_str("textured"),
            Self::Shader(id) => write!(f, "{SHADER_PREFIX}{id}"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix(SHADER_PREFIX) {
            if id.is_empty() {
                return Err(Error::Config("render mode 'shader:' needs a shader id".into()));
            }
            return Ok(Self::Shader(id.to_string()));
        }

        match s.to_ascii_lowercase().as_str() {
            "solid" => Ok(Self::Solid),
            "wireframe" => Ok(Self::Wireframe),
            "normal" | "normals" | "normalmap" | "normal_map" => Ok(Self::NormalMap),
            "flat" => Ok(Self::Flat),
            "smooth" => Ok(Self::Smooth),
            "textured" | "texture" => Ok(Self::Textured),
            other => Err(Error::Config(format!("unknown render mode '{other}'"))),
        }
    }
}

impl TryFrom<String> for RenderMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RenderMode> for String {
    fn from(mode: RenderMode) -> Self {
        mode.to_string()
    }
}
