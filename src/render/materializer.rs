//! Render-mode materialization.
//!
//! A [`MeshHandle`] is never drawn directly. For every mode the materializer
//! builds a fresh scene graph in a child scope of the load scope: duplicated
//! (or re-derived) geometry plus exactly one material per leaf. The result is
//! a [`MaterializedModel`], released as a unit through
//! [`MaterializedModel::dispose`].

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Affine3A, Vec4};
use serde_json::Value;
use wgpu::PrimitiveTopology;

use crate::assets::mesh_handle::{MeshHandle, SubMesh};
use crate::errors::ShaderError;
use crate::render::catalog::{ShaderCatalog, ShaderDescriptor};
use crate::render::compiler::{ProgramSource, ShaderProgramCache};
use crate::render::matcap::MatcapLibrary;
use crate::render::mode::RenderMode;
use crate::render::normals::NormalsPolicy;
use crate::render::point_cloud::{LodTable, PointCloudBuilder, resolve_density};
use crate::render::uniforms::UniformBinder;
use crate::resources::geometry::Geometry;
use crate::resources::lifecycle::{
    DisposeReport, GeometryHandle, GroupHandle, MaterialHandle, ResourceLifecycleManager, Scope,
};
use crate::resources::material::{
    MatcapMaterial, Material, MaterialVariant, PointsMaterial, ShaderMaterial,
};
use crate::resources::texture::Texture;
use crate::resources::uniforms::UniformValue;
use crate::scene::{GroupNode, MeshNode, Primitive};

/// Catalog id of the shader that turns the mesh into a point cloud.
pub const POINT_CLOUD_SHADER: &str = "pointcloud";

const WIREFRAME_COLOR: Vec4 = Vec4::new(0.85, 0.85, 0.85, 1.0);

/// What a materialized model shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    Mode(RenderMode),
    /// A material preset, by id.
    Preset(String),
}

/// An owned, drawable scene graph derived from a mesh.
#[derive(Debug)]
#[must_use = "a materialized model must be disposed"]
pub struct MaterializedModel {
    scope: Scope,
    pub root: GroupHandle,
    pub representation: Representation,
    /// Live uniform binding when a custom shader is active.
    pub binder: Option<UniformBinder>,
    /// Set when the requested shader could not be used and Solid was built
    /// instead.
    pub fallback: Option<ShaderError>,
    /// Number of points drawn by the point-cloud shader.
    pub point_count: Option<u32>,
    shader_materials: Vec<MaterialHandle>,
}

impl MaterializedModel {
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The mode actually built, after any shader fallback.
    #[must_use]
    pub fn effective_mode(&self) -> Option<&RenderMode> {
        match &self.representation {
            Representation::Mode(mode) => Some(mode),
            Representation::Preset(_) => None,
        }
    }

    #[must_use]
    pub fn meshes(&self, manager: &ResourceLifecycleManager) -> Vec<MeshNode> {
        manager
            .group(self.root)
            .map(|g| g.meshes().cloned().collect())
            .unwrap_or_default()
    }

    /// Leaf geometries with their world transforms.
    #[must_use]
    pub fn geometries<'m>(&self, manager: &'m ResourceLifecycleManager) -> Vec<(&'m Geometry, Affine3A)> {
        self.meshes(manager)
            .into_iter()
            .filter_map(|m| manager.geometry(m.geometry).map(|g| (g, m.transform)))
            .collect()
    }

    /// Pushes the binder's resolved values into every shader material.
    pub fn sync_uniforms(&self, manager: &mut ResourceLifecycleManager) {
        let Some(binder) = &self.binder else {
            return;
        };
        for handle in &self.shader_materials {
            if let Some(Material {
                variant: MaterialVariant::Shader(shader),
                ..
            }) = manager.material_mut(*handle)
            {
                binder.apply_to(shader);
            }
        }
    }

    pub fn dispose(self, manager: &mut ResourceLifecycleManager) -> DisposeReport {
        manager.dispose_scope(self.scope)
    }
}

/// Builds [`MaterializedModel`]s for render modes and material presets.
pub struct RenderModeMaterializer {
    matcaps: MatcapLibrary,
    catalog: ShaderCatalog,
    programs: ShaderProgramCache,
    lod: LodTable,
}

impl RenderModeMaterializer {
    #[must_use]
    pub fn new(matcaps: MatcapLibrary, catalog: ShaderCatalog, lod: LodTable) -> Self {
        Self {
            matcaps,
            catalog,
            programs: ShaderProgramCache::default(),
            lod,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ShaderCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn programs(&self) -> &ShaderProgramCache {
        &self.programs
    }

    #[must_use]
    pub fn matcaps(&self) -> &MatcapLibrary {
        &self.matcaps
    }

    /// Builds `mode` for `mesh`. Shader overrides only apply to
    /// [`RenderMode::Shader`].
    ///
    /// A shader that is unknown or fails to compile falls back to Solid; the
    /// error is kept in [`MaterializedModel::fallback`].
    pub fn materialize(
        &mut self,
        mesh: &MeshHandle,
        mode: &RenderMode,
        overrides: &BTreeMap<String, Value>,
        manager: &mut ResourceLifecycleManager,
    ) -> MaterializedModel {
        if let RenderMode::Shader(id) = mode {
            match self.prepare_shader(id) {
                Ok((descriptor, program_key)) => {
                    let binder = UniformBinder::new(descriptor).with_overrides(overrides.clone());
                    return self.build_shader(mesh, mode, binder, program_key, manager);
                }
                Err(err) => {
                    log::warn!("Shader mode '{id}' unavailable, falling back to solid: {err}");
                    let mut model = self.build_mode(mesh, &RenderMode::Solid, manager);
                    model.fallback = Some(err);
                    return model;
                }
            }
        }
        self.build_mode(mesh, mode, manager)
    }

    /// Builds one leaf per part, materials supplied by `make_material`. Used
    /// for material presets, which replace every part's material.
    pub fn materialize_with(
        &mut self,
        mesh: &MeshHandle,
        preset_id: &str,
        manager: &mut ResourceLifecycleManager,
        mut make_material: impl FnMut(&Geometry) -> Material,
    ) -> MaterializedModel {
        let mut builder = ModelBuilder::open(mesh, &format!("preset:{preset_id}"), manager);
        for part in &mesh.parts {
            let Some(geometry) = manager.geometry(part.geometry).map(Geometry::duplicate) else {
                continue;
            };
            let material = make_material(&geometry);
            let primitive = primitive_of(&geometry);
            let g = manager.add_geometry(&builder.scope, geometry);
            let m = manager.add_material(&builder.scope, material);
            builder.leaf(part, g, m, primitive);
        }
        builder.finish(Representation::Preset(preset_id.to_string()), manager)
    }

    fn prepare_shader(&mut self, id: &str) -> Result<(Arc<ShaderDescriptor>, u64), ShaderError> {
        let descriptor = self.catalog.get(id)?;
        let key = self.programs.get_or_compile(&ProgramSource::from_descriptor(&descriptor))?;
        Ok((descriptor, key))
    }

    fn build_mode(&self, mesh: &MeshHandle, mode: &RenderMode, manager: &mut ResourceLifecycleManager) -> MaterializedModel {
        let mut builder = ModelBuilder::open(mesh, &format!("mode:{mode}"), manager);

        for part in &mesh.parts {
            let Some(pristine) = manager.geometry(part.geometry) else {
                continue;
            };
            let geometry = match mode {
                RenderMode::Flat => NormalsPolicy::faceted(pristine),
                RenderMode::Smooth => NormalsPolicy::smooth(pristine),
                _ => pristine.duplicate(),
            };
            let primitive = primitive_of(&geometry);

            // Textured clones the captured material; the original stays with
            // the load scope and outlives every mode switch.
            let material = match mode {
                RenderMode::Textured => mesh
                    .captured_material(part)
                    .and_then(|h| manager.material(h))
                    .filter(|m| m.is_textured())
                    .map(Material::duplicate),
                _ => None,
            }
            .unwrap_or_else(|| self.mode_material(mode, &geometry, primitive));

            let material = manager.add_material(&builder.scope, material);
            let g = manager.add_geometry(&builder.scope, geometry);
            builder.leaf(part, g, material, primitive);
        }

        builder.finish(Representation::Mode(mode.clone()), manager)
    }

    fn mode_material(&self, mode: &RenderMode, geometry: &Geometry, primitive: Primitive) -> Material {
        if primitive == Primitive::Points {
            return Material::new(MaterialVariant::Points(PointsMaterial {
                size: 2.0,
                color: Vec4::splat(0.8).with_w(1.0),
                vertex_colors: geometry.has_vertex_colors(),
                size_attenuation: true,
            }));
        }

        match mode {
            RenderMode::Wireframe => {
                let mut material = Material::new_basic(WIREFRAME_COLOR);
                material.settings_mut().wireframe = true;
                material
            }
            RenderMode::NormalMap => Material::new(MaterialVariant::NormalDebug),
            RenderMode::Flat => self.matcap_material(true),
            _ if geometry.has_vertex_colors() => Material::new(MaterialVariant::VertexColor { flat_shading: false }),
            _ => self.matcap_material(false),
        }
    }

    fn matcap_material(&self, flat_shading: bool) -> Material {
        Material::new(MaterialVariant::Matcap(MatcapMaterial {
            color: Vec4::ONE,
            matcap: self.matcaps.default_texture(),
            flat_shading,
        }))
    }

    fn build_shader(
        &self,
        mesh: &MeshHandle,
        mode: &RenderMode,
        binder: UniformBinder,
        program_key: u64,
        manager: &mut ResourceLifecycleManager,
    ) -> MaterializedModel {
        let descriptor = Arc::clone(binder.descriptor());
        let mut builder = ModelBuilder::open(mesh, &format!("mode:{mode}"), manager);
        let mut shader_materials = Vec::new();
        let mut point_count = None;

        if descriptor.id == POINT_CLOUD_SHADER {
            let resolved = binder.resolved();
            let explicit = match (resolved.get("auto_density"), resolved.get("density")) {
                (Some(UniformValue::Bool(false)), Some(d)) => d.as_f32(),
                _ => None,
            };
            let source_count = mesh.vertex_count(manager);
            let density = resolve_density(source_count, explicit, &self.lod);

            let points = {
                let parts = mesh
                    .parts
                    .iter()
                    .filter_map(|p| manager.geometry(p.geometry).map(|g| (g, p.transform)));
                PointCloudBuilder::new(density).build(parts)
            };
            point_count = Some(points.vertex_count());

            let material = self.shader_material(&descriptor, &binder, program_key);
            let g = manager.add_geometry(&builder.scope, points);
            let m = manager.add_material(&builder.scope, material);
            shader_materials.push(m);
            // Points are already in world space.
            builder.push(MeshNode::new("points", g, m).with_primitive(Primitive::Points));
        } else {
            for part in &mesh.parts {
                let Some(geometry) = manager.geometry(part.geometry).map(Geometry::duplicate) else {
                    continue;
                };
                let primitive = primitive_of(&geometry);
                let material = self.shader_material(&descriptor, &binder, program_key);
                let g = manager.add_geometry(&builder.scope, geometry);
                let m = manager.add_material(&builder.scope, material);
                shader_materials.push(m);
                builder.leaf(part, g, m, primitive);
            }
        }

        let mut model = builder.finish(Representation::Mode(mode.clone()), manager);
        model.binder = Some(binder);
        model.point_count = point_count;
        model.shader_materials = shader_materials;
        model
    }

    fn shader_material(&self, descriptor: &ShaderDescriptor, binder: &UniformBinder, program_key: u64) -> Material {
        let mut shader = ShaderMaterial::new(&descriptor.id, program_key);
        binder.apply_to(&mut shader);
        for name in descriptor.texture_uniforms() {
            let texture = if name == "matcap" {
                self.matcaps.default_texture()
            } else {
                Texture::create_solid_color(name, [255, 255, 255, 255])
            };
            // A fresh material has no previous texture to release.
            let _ = shader.set_texture(name, texture);
        }
        Material::new(MaterialVariant::Shader(shader)).with_name(descriptor.label.clone())
    }
}

fn primitive_of(geometry: &Geometry) -> Primitive {
    match geometry.topology {
        PrimitiveTopology::PointList => Primitive::Points,
        PrimitiveTopology::LineList | PrimitiveTopology::LineStrip => Primitive::Lines,
        _ => Primitive::Triangles,
    }
}

/// Collects leaves into a root group inside a child scope of the load.
struct ModelBuilder {
    scope: Scope,
    root: GroupNode,
}

impl ModelBuilder {
    fn open(mesh: &MeshHandle, label: &str, manager: &mut ResourceLifecycleManager) -> Self {
        let scope = manager.child_scope(mesh.scope(), label);
        let mut root = GroupNode::new(mesh.source.filename.clone());
        root.transform = Affine3A::IDENTITY;
        Self { scope, root }
    }

    fn leaf(&mut self, part: &SubMesh, geometry: GeometryHandle, material: MaterialHandle, primitive: Primitive) {
        let mut node = MeshNode::new(part.name.clone(), geometry, material).with_primitive(primitive);
        node.transform = part.transform;
        self.push(node);
    }

    fn push(&mut self, node: MeshNode) {
        self.root.push_mesh(node);
    }

    fn finish(self, representation: Representation, manager: &mut ResourceLifecycleManager) -> MaterializedModel {
        let root = manager.add_group(&self.scope, self.root);
        MaterializedModel {
            scope: self.scope,
            root,
            representation,
            binder: None,
            fallback: None,
            point_count: None,
            shader_materials: Vec::new(),
        }
    }
}
