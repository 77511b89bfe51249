//! Physics Module
//!
//! Collider extraction from materialized meshes and the binding that keeps a
//! host rigid body in step with it. The simulation itself belongs to the host
//! and is reached through [`PhysicsWorld`].

pub mod collider;
pub mod world;

pub use collider::{ColliderExtractor, ColliderHull, DEFAULT_MAX_HULL_POINTS};
pub use world::{BodyId, PhysicsBinding, PhysicsSettings, PhysicsWorld, SyncEvent};
