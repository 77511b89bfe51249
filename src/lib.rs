#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod errors;
pub mod physics;
pub mod render;
pub mod resources;
pub mod scene;
pub mod utils;
pub mod viewer;

pub use assets::{AssetReaderVariant, FormatLoader, LoadContext, MeshCategory, MeshHandle, MeshSource};
pub use errors::{AssetError, Error, Result, ShaderError};
pub use physics::{ColliderExtractor, ColliderHull, PhysicsBinding, PhysicsSettings, PhysicsWorld};
pub use render::{
    FrameInput, FrameScheduler, MaterialPreset, MaterializedModel, NormalsPolicy, RenderMode, RenderModeMaterializer,
    ShaderCatalog, ShaderDescriptor, UniformBinder,
};
pub use resources::{Geometry, Material, MaterialVariant, ResourceLifecycleManager, Scope, Texture};
pub use scene::{GroupNode, MeshNode, SceneNode, placeholder_scene};
pub use viewer::{LoadOutcome, LoadTicket, ViewerSettings, ViewerSlot};
