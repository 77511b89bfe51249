//! Shader catalog.
//!
//! Descriptors are authored externally as JSON and are immutable once loaded.
//! Every uniform declares its type up front, so which uniforms hold textures
//! (and are therefore owned resources) is known without inspecting values.
//!
//! ```json
//! {
//!   "shaders": [{
//!     "id": "xray",
//!     "label": "X-Ray",
//!     "vertex":   { "file": "xray.vert.glsl" },
//!     "fragment": "void main() { ... }",
//!     "uniforms": {
//!       "power": { "type": "float", "default": 2.0, "min": 0.5, "max": 8.0, "step": 0.1 }
//!     }
//!   }]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ShaderError};
use crate::resources::uniforms::UniformType;

#[derive(RustEmbed)]
#[folder = "src/render/shaders/"]
pub(crate) struct ShaderAssets;

pub(crate) fn embedded_source(name: &str) -> Option<String> {
    let file = ShaderAssets::get(name)?;
    std::str::from_utf8(file.data.as_ref()).ok().map(str::to_string)
}

/// Schema entry for one uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformSpec {
    #[serde(rename = "type")]
    pub ty: UniformType,
    #[serde(default)]
    pub default: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Not shown in the control surface.
    #[serde(default)]
    pub hidden: bool,
    /// Advanced every tick by the frame scheduler.
    #[serde(default)]
    pub animated: bool,
}

impl UniformSpec {
    /// Whether a user-facing control exists for this entry.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        !self.hidden && !self.animated && self.ty != UniformType::Texture
    }

    fn check_range(&self, shader: &str, name: &str) -> std::result::Result<(), ShaderError> {
        let (Some(min), Some(max)) = (self.min, self.max) else {
            return Ok(());
        };
        let empty = match self.ty {
            UniformType::Int => min.ceil() > max.floor(),
            _ => min > max,
        };
        if empty {
            return Err(ShaderError::Catalog(format!(
                "shader '{shader}': uniform '{name}' has an empty range [{min}, {max}]"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum SourceRef {
    Inline(String),
    File { file: String },
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    id: String,
    #[serde(default)]
    label: Option<String>,
    vertex: SourceRef,
    fragment: SourceRef,
    #[serde(default)]
    uniforms: BTreeMap<String, UniformSpec>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    shaders: Vec<RawDescriptor>,
}

/// An externally authored custom shader.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDescriptor {
    pub id: String,
    pub label: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub uniforms: BTreeMap<String, UniformSpec>,
}

impl ShaderDescriptor {
    pub fn uniform(&self, name: &str) -> Option<&UniformSpec> {
        self.uniforms.get(name)
    }

    /// Names of uniforms advanced by the frame scheduler.
    pub fn animated_uniforms(&self) -> impl Iterator<Item = &str> {
        self.uniforms
            .iter()
            .filter(|(_, spec)| spec.animated)
            .map(|(name, _)| name.as_str())
    }

    /// Names of texture-typed uniforms (owned by the material at runtime).
    pub fn texture_uniforms(&self) -> impl Iterator<Item = &str> {
        self.uniforms
            .iter()
            .filter(|(_, spec)| spec.ty == UniformType::Texture)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShaderCatalog {
    shaders: BTreeMap<String, Arc<ShaderDescriptor>>,
}

impl ShaderCatalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        let json = embedded_source("catalog.json")
            .ok_or_else(|| ShaderError::Catalog("embedded catalog.json missing".into()))?;
        Self::from_json(&json)
    }

    /// Parses a catalog document. `{"file": ...}` sources resolve against the
    /// embedded shader directory.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(json).map_err(|e| ShaderError::Catalog(e.to_string()))?;

        let mut shaders = BTreeMap::new();
        for entry in raw.shaders {
            if entry.id.is_empty() || entry.id.contains(char::is_whitespace) {
                return Err(ShaderError::Catalog(format!("invalid shader id '{}'", entry.id)).into());
            }
            for (name, spec) in &entry.uniforms {
                spec.check_range(&entry.id, name)?;
            }
            let descriptor = ShaderDescriptor {
                label: entry.label.unwrap_or_else(|| entry.id.clone()),
                vertex_source: resolve_source(&entry.id, entry.vertex)?,
                fragment_source: resolve_source(&entry.id, entry.fragment)?,
                uniforms: entry.uniforms,
                id: entry.id,
            };
            if shaders.insert(descriptor.id.clone(), Arc::new(descriptor)).is_some() {
                log::warn!("Shader catalog: duplicate id, later entry wins");
            }
        }

        log::debug!("Loaded shader catalog with {} entries", shaders.len());
        Ok(Self { shaders })
    }

    /// Adds (or replaces) entries from `other`.
    pub fn extend(&mut self, other: ShaderCatalog) {
        self.shaders.extend(other.shaders);
    }

    pub fn get(&self, id: &str) -> std::result::Result<Arc<ShaderDescriptor>, ShaderError> {
        self.shaders
            .get(id)
            .cloned()
            .ok_or_else(|| ShaderError::UnknownShader(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.shaders.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

fn resolve_source(id: &str, source: SourceRef) -> Result<String> {
    match source {
        SourceRef::Inline(code) => Ok(code),
        SourceRef::File { file } => embedded_source(&file)
            .ok_or_else(|| ShaderError::Catalog(format!("shader '{id}': source file '{file}' not found")).into()),
    }
}
