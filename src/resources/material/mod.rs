mod shader;
mod standard;
mod triplanar;

pub use shader::{ShaderMaterial, ShaderUniform};
pub use standard::StandardMaterial;
pub use triplanar::TriplanarMaterial;

use bitflags::bitflags;
use glam::Vec4;
use uuid::Uuid;

use crate::resources::texture::Texture;

// Shader variant switches
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFeatures: u32 {
        const USE_MAP           = 1 << 0;
        const USE_NORMAL_MAP    = 1 << 1;
        const USE_ROUGHNESS_MAP = 1 << 2;
        const USE_EMISSIVE_MAP  = 1 << 3;
        const USE_AO_MAP        = 1 << 4;
        const USE_VERTEX_COLOR  = 1 << 5;
        const USE_MATCAP        = 1 << 6;
        const TRIPLANAR         = 1 << 7;
        const WIREFRAME         = 1 << 8;
        const FLAT_SHADING      = 1 << 9;
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Side {
    Front,
    Back,
    #[default]
    Double,
}

/// Pipeline-level state.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct MaterialSettings {
    pub transparent: bool,
    pub opacity: f32,
    pub depth_write: bool,
    pub depth_test: bool,
    pub side: Side,
    pub wireframe: bool,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            transparent: false,
            opacity: 1.0,
            depth_write: true,
            depth_test: true,
            side: Side::Double,
            wireframe: false,
        }
    }
}

/// Lit by a baked lighting texture looked up by view-space normal.
#[derive(Debug)]
pub struct MatcapMaterial {
    pub color: Vec4,
    pub matcap: Texture,
    pub flat_shading: bool,
}

/// Unlit, per-vertex colored points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsMaterial {
    pub size: f32,
    pub color: Vec4,
    pub vertex_colors: bool,
    pub size_attenuation: bool,
}

/// Physically based but see-through; used by transparent visual presets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransparentMaterial {
    pub color: Vec4,
    pub metalness: f32,
    pub roughness: f32,
    pub transmission: f32,
}

/// Every material shape the viewer can assign.
///
/// Assigning a variant is construction: there is no mutable material that
/// switches behavior at runtime.
#[derive(Debug)]
pub enum MaterialVariant {
    Matcap(MatcapMaterial),
    /// Vertex-color shading, lit.
    VertexColor { flat_shading: bool },
    /// Unlit single color. Used for wireframe and placeholder geometry.
    Basic { color: Vec4 },
    /// Maps the shading normal to RGB.
    NormalDebug,
    Standard(StandardMaterial),
    Shader(ShaderMaterial),
    Points(PointsMaterial),
    Triplanar(TriplanarMaterial),
    Transparent(TransparentMaterial),
}

impl MaterialVariant {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Matcap(_) => "matcap",
            Self::VertexColor { .. } => "vertex_color",
            Self::Basic { .. } => "basic",
            Self::NormalDebug => "normal",
            Self::Standard(_) => "standard",
            Self::Shader(_) => "shader",
            Self::Points(_) => "points",
            Self::Triplanar(_) => "triplanar",
            Self::Transparent(_) => "transparent",
        }
    }

    fn duplicate(&self) -> Self {
        match self {
            Self::Matcap(m) => Self::Matcap(MatcapMaterial {
                color: m.color,
                matcap: m.matcap.duplicate(),
                flat_shading: m.flat_shading,
            }),
            Self::VertexColor { flat_shading } => Self::VertexColor {
                flat_shading: *flat_shading,
            },
            Self::Basic { color } => Self::Basic { color: *color },
            Self::NormalDebug => Self::NormalDebug,
            Self::Standard(m) => Self::Standard(m.duplicate()),
            Self::Shader(m) => Self::Shader(m.duplicate()),
            Self::Points(m) => Self::Points(*m),
            Self::Triplanar(m) => Self::Triplanar(m.duplicate()),
            Self::Transparent(m) => Self::Transparent(*m),
        }
    }
}

#[derive(Debug)]
pub struct Material {
    pub uuid: Uuid,
    pub name: Option<String>,
    pub variant: MaterialVariant,
    pub settings: MaterialSettings,
}

impl Material {
    #[must_use]
    pub fn new(variant: MaterialVariant) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: None,
            variant,
            settings: MaterialSettings::default(),
        }
    }

    #[must_use]
    pub fn new_basic(color: Vec4) -> Self {
        Self::new(MaterialVariant::Basic { color })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: MaterialSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn variant(&self) -> &MaterialVariant {
        &self.variant
    }

    #[must_use]
    pub fn settings(&self) -> &MaterialSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut MaterialSettings {
        &mut self.settings
    }

    #[must_use]
    pub fn features(&self) -> MaterialFeatures {
        let mut features = match &self.variant {
            MaterialVariant::Matcap(m) => {
                let mut f = MaterialFeatures::USE_MATCAP;
                f.set(MaterialFeatures::FLAT_SHADING, m.flat_shading);
                f
            }
            MaterialVariant::VertexColor { flat_shading } => {
                let mut f = MaterialFeatures::USE_VERTEX_COLOR;
                f.set(MaterialFeatures::FLAT_SHADING, *flat_shading);
                f
            }
            MaterialVariant::Standard(m) => m.features(),
            MaterialVariant::Points(m) if m.vertex_colors => MaterialFeatures::USE_VERTEX_COLOR,
            MaterialVariant::Triplanar(m) => m.features(),
            _ => MaterialFeatures::empty(),
        };
        features.set(MaterialFeatures::WIREFRAME, self.settings.wireframe);
        features
    }

    /// Whether this material samples a color map.
    #[must_use]
    pub fn is_textured(&self) -> bool {
        match &self.variant {
            MaterialVariant::Standard(m) => m.map.is_some(),
            MaterialVariant::Triplanar(_) => true,
            _ => false,
        }
    }

    /// Calls `f` for every texture owned by this material, including texture
    /// values nested in shader uniforms.
    pub fn visit_textures(&self, mut f: impl FnMut(&Texture)) {
        match &self.variant {
            MaterialVariant::Matcap(m) => f(&m.matcap),
            MaterialVariant::Standard(m) => m.textures().for_each(f),
            MaterialVariant::Shader(m) => m.textures().for_each(f),
            MaterialVariant::Triplanar(m) => m.textures().for_each(f),
            _ => {}
        }
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        let mut n = 0;
        self.visit_textures(|_| n += 1);
        n
    }

    /// Consumes the material, yielding its owned textures.
    #[must_use]
    pub fn into_textures(self) -> Vec<Texture> {
        match self.variant {
            MaterialVariant::Matcap(m) => vec![m.matcap],
            MaterialVariant::Standard(m) => m.into_textures(),
            MaterialVariant::Shader(m) => m.into_textures(),
            MaterialVariant::Triplanar(m) => m.into_textures(),
            _ => Vec::new(),
        }
    }

    /// A new material (fresh identity) with duplicated textures.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: self.name.clone(),
            variant: self.variant.duplicate(),
            settings: self.settings,
        }
    }
}
