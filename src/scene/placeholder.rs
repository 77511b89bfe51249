use glam::{Affine3A, Vec3, Vec4};

use crate::render::normals::NormalsPolicy;
use crate::resources::geometry::Geometry;
use crate::resources::lifecycle::{DisposeReport, GroupHandle, ResourceLifecycleManager, Scope};
use crate::resources::material::Material;
use crate::scene::node::{GroupNode, MeshNode};

const PLACEHOLDER_COLOR: Vec4 = Vec4::new(0.55, 0.55, 0.55, 1.0);

/// Shown in place of a mesh that failed to load.
#[derive(Debug)]
#[must_use = "the placeholder owns a scope that must be disposed"]
pub struct Placeholder {
    scope: Scope,
    pub root: GroupHandle,
}

impl Placeholder {
    pub fn dispose(self, manager: &mut ResourceLifecycleManager) -> DisposeReport {
        manager.dispose_scope(self.scope)
    }
}

/// Axis-aligned box centered on the origin.
#[must_use]
pub fn box_geometry(size: f32) -> Geometry {
    let h = size * 0.5;
    let corners: Vec<[f32; 3]> = (0..8)
        .map(|i| {
            let sign = |bit: u32| if i & bit == 0 { -h } else { h };
            [sign(1), sign(2), sign(4)]
        })
        .collect();
    #[rustfmt::skip]
    let indices: [u32; 36] = [
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ];
    let mut geometry = Geometry::from_positions(&corners, Some(&indices));
    NormalsPolicy::ensure(&mut geometry);
    geometry
}

/// A fixed pair of gray wireframe boxes: a unit box and a half-size box
/// rotated inside it. Always identical, whatever failed.
pub fn placeholder_scene(manager: &mut ResourceLifecycleManager) -> Placeholder {
    let scope = manager.begin_scope("placeholder");
    let mut root = GroupNode::new("placeholder");

    let boxes = [
        ("outer", 1.0, Affine3A::IDENTITY),
        (
            "inner",
            0.5,
            Affine3A::from_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_4),
        ),
    ];
    for (name, size, transform) in boxes {
        let mut material = Material::new_basic(PLACEHOLDER_COLOR).with_name("placeholder");
        material.settings_mut().wireframe = true;

        let geometry = manager.add_geometry(&scope, box_geometry(size));
        let material = manager.add_material(&scope, material);
        let mut node = MeshNode::new(name, geometry, material);
        node.transform = transform;
        root.push_mesh(node);
    }

    let root = manager.add_group(&scope, root);
    Placeholder { scope, root }
}
