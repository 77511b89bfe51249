use glam::Affine3A;
use uuid::Uuid;

use crate::resources::lifecycle::{GeometryHandle, GroupHandle, MaterialHandle};

/// How a mesh leaf is rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// A drawable leaf: one geometry, exactly one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub primitive: Primitive,
    pub transform: Affine3A,
}

impl MeshNode {
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: GeometryHandle, material: MaterialHandle) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            primitive: Primitive::Triangles,
            transform: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Group(GroupHandle),
    Mesh(MeshNode),
}

/// Interior node of a materialized scene graph.
///
/// Children are referenced by handle; the lifecycle manager owns the nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub uuid: Uuid,
    pub name: String,
    pub transform: Affine3A,
    pub visible: bool,
    pub children: Vec<SceneNode>,
}

impl GroupNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            transform: Affine3A::IDENTITY,
            visible: true,
            children: Vec::new(),
        }
    }

    pub fn push_mesh(&mut self, mesh: MeshNode) {
        self.children.push(SceneNode::Mesh(mesh));
    }

    pub fn push_group(&mut self, group: GroupHandle) {
        self.children.push(SceneNode::Group(group));
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshNode> {
        self.children.iter().filter_map(|c| match c {
            SceneNode::Mesh(m) => Some(m),
            SceneNode::Group(_) => None,
        })
    }
}
