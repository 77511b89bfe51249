//! Scene graph of a materialized mesh.
//!
//! Nodes reference geometries and materials by handle; the
//! [`ResourceLifecycleManager`](crate::resources::lifecycle::ResourceLifecycleManager)
//! owns them.

pub mod node;
pub mod placeholder;

pub use node::{GroupNode, MeshNode, Primitive, SceneNode};
pub use placeholder::{Placeholder, box_geometry, placeholder_scene};
