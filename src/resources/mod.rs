//! Core resource definitions, independent of the GPU backend:
//! - Geometry: vertex attributes, indices, bounds
//! - Texture: decoded pixels plus sampler state
//! - Material: the closed set of material variants
//! - Uniforms: data-only shader uniform values
//! - Lifecycle: scoped ownership and deterministic disposal

pub mod geometry;
pub mod lifecycle;
pub mod material;
pub mod texture;
pub mod uniforms;

pub use geometry::{Attribute, BoundingBox, Geometry};
pub use lifecycle::{
    DisposeEvent, DisposeReport, DisposeSink, GeometryHandle, GroupHandle, LiveCounts, MaterialHandle,
    ResourceHandle, ResourceKind, ResourceLifecycleManager, Scope, ScopeId, TextureHandle,
};
pub use material::{
    MatcapMaterial, Material, MaterialFeatures, MaterialSettings, MaterialVariant, PointsMaterial, ShaderMaterial,
    ShaderUniform, Side, StandardMaterial, TransparentMaterial, TriplanarMaterial,
};
pub use texture::{Texture, TextureOrigin, TextureSampler};
pub use uniforms::{UniformType, UniformValue};
