use glam::Affine3A;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::assets::loaders::{MeshFormat, ParsedMesh};
use crate::assets::source::MeshSource;
use crate::render::normals::NormalsPolicy;
use crate::resources::geometry::BoundingBox;
use crate::resources::lifecycle::{DisposeReport, GeometryHandle, MaterialHandle, ResourceLifecycleManager, Scope};

/// Lookup key for a captured material: the mesh name when it is unique within
/// the file, the part's position otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MaterialKey {
    Name(String),
    Index(usize),
}

/// Original materials of a glTF/GLB file, captured once at load time.
#[derive(Debug, Default)]
pub struct CapturedMaterials {
    entries: FxHashMap<MaterialKey, MaterialHandle>,
}

impl CapturedMaterials {
    #[must_use]
    pub fn get(&self, key: &MaterialKey) -> Option<MaterialHandle> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One sub-mesh of a loaded file. The geometry is the pristine copy; render
/// modes always work on duplicates of it.
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub name: String,
    pub key: MaterialKey,
    pub geometry: GeometryHandle,
    pub transform: Affine3A,
}

/// A loaded mesh, normalized across formats.
///
/// Owns the load scope: pristine geometry, captured materials and the
/// default material. Dropped only through [`MeshHandle::dispose`].
#[derive(Debug)]
pub struct MeshHandle {
    pub source: MeshSource,
    pub load_id: u64,
    pub format: MeshFormat,
    pub parts: Vec<SubMesh>,
    pub captured: CapturedMaterials,
    /// Gray double-sided material synthesized for STL, PLY and OFF, which
    /// carry none. Render modes build their own materials and never read it;
    /// it is what a host gets when it draws the raw handle.
    pub default_material: Option<MaterialHandle>,
    pub bounds: Option<BoundingBox>,
    scope: Scope,
}

impl MeshHandle {
    /// Registers a parse result with the lifecycle manager. Runs the normals
    /// policy on every part, so every sub-mesh of the result has normals.
    pub fn install(
        parsed: ParsedMesh,
        source: MeshSource,
        load_id: u64,
        manager: &mut ResourceLifecycleManager,
    ) -> Self {
        let scope = manager.begin_scope(&format!("load:{}#{}", source.filename, load_id));

        let material_handles: Vec<MaterialHandle> = parsed
            .materials
            .into_iter()
            .map(|m| manager.add_material(&scope, m))
            .collect();
        let default_material = parsed.default_material.map(|m| manager.add_material(&scope, m));

        let mut seen = FxHashSet::default();
        let duplicated: FxHashSet<&str> = parsed
            .parts
            .iter()
            .filter(|p| !seen.insert(p.name.as_str()))
            .map(|p| p.name.as_str())
            .collect();
        let keys: Vec<MaterialKey> = parsed
            .parts
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if duplicated.contains(p.name.as_str()) {
                    MaterialKey::Index(i)
                } else {
                    MaterialKey::Name(p.name.clone())
                }
            })
            .collect();

        let mut captured = CapturedMaterials::default();
        let mut parts = Vec::with_capacity(parsed.parts.len());
        let mut bounds: Option<BoundingBox> = None;

        for (part, key) in parsed.parts.into_iter().zip(keys) {
            let mut geometry = part.geometry;
            NormalsPolicy::ensure(&mut geometry);
            geometry.compute_bounding_volume();

            if let Some(b) = geometry.bounding_box() {
                let world = b.transform(&part.transform);
                bounds = Some(bounds.map_or(world, |acc| acc.union(&world)));
            }

            if let Some(handle) = part.material.and_then(|i| material_handles.get(i)) {
                captured.entries.insert(key.clone(), *handle);
            }

            parts.push(SubMesh {
                name: part.name,
                key,
                geometry: manager.add_geometry(&scope, geometry),
                transform: part.transform,
            });
        }

        Self {
            source,
            load_id,
            format: parsed.format,
            parts,
            captured,
            default_material,
            bounds,
            scope,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Original material of `part`, if the file provided one.
    #[must_use]
    pub fn captured_material(&self, part: &SubMesh) -> Option<MaterialHandle> {
        self.captured.get(&part.key)
    }

    #[must_use]
    pub fn has_vertex_colors(&self, manager: &ResourceLifecycleManager) -> bool {
        self.parts
            .iter()
            .filter_map(|p| manager.geometry(p.geometry))
            .any(|g| g.has_vertex_colors())
    }

    #[must_use]
    pub fn vertex_count(&self, manager: &ResourceLifecycleManager) -> u32 {
        self.parts
            .iter()
            .filter_map(|p| manager.geometry(p.geometry))
            .map(|g| g.vertex_count())
            .sum()
    }

    /// Diagonal of the world-space bounds; zero for an empty mesh.
    #[must_use]
    pub fn bounding_diagonal(&self) -> f32 {
        self.bounds.map_or(0.0, |b| b.diagonal())
    }

    /// Releases the load scope (and every scope derived from it).
    pub fn dispose(self, manager: &mut ResourceLifecycleManager) -> DisposeReport {
        manager.dispose_scope(self.scope)
    }
}
