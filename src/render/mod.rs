//! Materialization pipeline.
//!
//! Everything between a loaded [`MeshHandle`](crate::assets::MeshHandle) and
//! the drawable scene graph:
//!
//! - [`normals`]: normal policy (compute when absent, faceted and smooth copies)
//! - [`mode`] / [`materializer`]: render modes and their material variants
//! - [`catalog`] / [`uniforms`] / [`compiler`]: custom shaders, their uniform
//!   schema and program cache
//! - [`point_cloud`]: LOD subsampling for the point-cloud shader
//! - [`procedural`]: material presets
//! - [`frame`]: per-frame driver

pub mod catalog;
pub mod compiler;
pub mod frame;
pub mod matcap;
pub mod materializer;
pub mod mode;
pub mod normals;
pub mod point_cloud;
pub mod procedural;
pub mod templates;
pub mod uniforms;

pub use catalog::{ShaderCatalog, ShaderDescriptor, UniformSpec};
pub use compiler::{GlslValidator, ProgramSource, ShaderCompiler, ShaderProgramCache};
pub use frame::{CameraState, FrameInput, FrameScheduler, FrameStats};
pub use matcap::MatcapLibrary;
pub use materializer::{MaterializedModel, POINT_CLOUD_SHADER, RenderModeMaterializer, Representation};
pub use mode::RenderMode;
pub use normals::NormalsPolicy;
pub use point_cloud::{LodStep, LodTable, PointCloudBuilder, auto_density, resolve_density, stride_subsample};
pub use procedural::{
    MaterialPreset, PresetKind, PresetTextures, ProceduralMaterialSynthesizer, ProceduralPreset, TextureSource,
    VisualPreset, texture_scale, triplanar_weights,
};
pub use uniforms::{ControlKind, ControlSpec, UniformBinder, convert_value, resolve_uniforms};
