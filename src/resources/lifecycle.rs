//! Resource Lifecycle Management
//!
//! [`ResourceLifecycleManager`] is the single owner of every GPU-resident
//! object the viewer creates: geometries, materials (and the textures they
//! hold), standalone textures and scene-graph group nodes.
//!
//! # Ownership model
//!
//! Resources are owned by a *scope*. A scope is opened with
//! [`ResourceLifecycleManager::begin_scope`] (or
//! [`child_scope`](ResourceLifecycleManager::child_scope)) which hands back a
//! [`Scope`] token. The token is not `Clone`; the only way to release a scope
//! is [`dispose_scope`](ResourceLifecycleManager::dispose_scope), which consumes
//! it. A resource therefore cannot be released twice, and a handle into a
//! released scope simply resolves to `None` (handles are generational).
//!
//! Disposal walks child scopes first, then releases, per scope:
//!
//! 1. geometries
//! 2. materials, unwrapping every texture-valued field (shader uniforms included)
//! 3. standalone textures
//! 4. group nodes
//!
//! Every release is forwarded to an optional [`DisposeSink`] (the GPU backend)
//! and recorded in the returned [`DisposeReport`].

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::resources::geometry::Geometry;
use crate::resources::material::Material;
use crate::resources::texture::Texture;
use crate::scene::GroupNode;

new_key_type! {
    pub struct GeometryHandle;
    pub struct MaterialHandle;
    pub struct TextureHandle;
    pub struct GroupHandle;
    pub struct ScopeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
    Group,
}

/// Receives every release in disposal order.
pub trait DisposeSink {
    fn release(&mut self, kind: ResourceKind, uuid: Uuid, label: &str);
}

/// One released resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposeEvent {
    pub kind: ResourceKind,
    pub uuid: Uuid,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisposeReport {
    pub events: Vec<DisposeEvent>,
}

impl DisposeReport {
    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn merge(&mut self, other: DisposeReport) {
        self.events.extend(other.events);
    }
}

/// Snapshot of everything currently alive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LiveCounts {
    pub geometries: usize,
    pub materials: usize,
    /// Standalone textures plus textures held inside materials.
    pub textures: usize,
    pub groups: usize,
    pub scopes: usize,
}

impl LiveCounts {
    #[must_use]
    pub fn total_resources(&self) -> usize {
        self.geometries + self.materials + self.textures + self.groups
    }
}

/// Ownership token for a scope. Consumed by
/// [`ResourceLifecycleManager::dispose_scope`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a scope that is dropped without being disposed leaks its resources"]
pub struct Scope {
    id: ScopeId,
}

impl Scope {
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.id
    }
}

/// A handle of any resource kind, used for ownership transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceHandle {
    Geometry(GeometryHandle),
    Material(MaterialHandle),
    Texture(TextureHandle),
    Group(GroupHandle),
}

struct Owned<T> {
    scope: ScopeId,
    value: T,
}

#[derive(Default)]
struct ScopeNode {
    label: String,
    parent: Option<ScopeId>,
    /// A load scope rarely holds more than the active model.
    children: SmallVec<[ScopeId; 2]>,
    geometries: Vec<GeometryHandle>,
    materials: Vec<MaterialHandle>,
    textures: Vec<TextureHandle>,
    groups: Vec<GroupHandle>,
}

#[derive(Default)]
pub struct ResourceLifecycleManager {
    scopes: SlotMap<ScopeId, ScopeNode>,
    geometries: SlotMap<GeometryHandle, Owned<Geometry>>,
    materials: SlotMap<MaterialHandle, Owned<Material>>,
    textures: SlotMap<TextureHandle, Owned<Texture>>,
    groups: SlotMap<GroupHandle, Owned<GroupNode>>,

    sink: Option<Box<dyn DisposeSink>>,
    released_total: u64,
}

impl std::fmt::Debug for ResourceLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLifecycleManager")
            .field("live", &self.live_counts())
            .field("released_total", &self.released_total)
            .finish_non_exhaustive()
    }
}

impl ResourceLifecycleManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards every release to `sink` (e.g. a GPU resource cache).
    #[must_use]
    pub fn with_sink(mut self, sink: impl DisposeSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Opens a root scope.
    pub fn begin_scope(&mut self, label: &str) -> Scope {
        let id = self.scopes.insert(ScopeNode {
            label: label.to_string(),
            ..ScopeNode::default()
        });
        Scope { id }
    }

    /// Opens a scope nested in `parent`. Disposing the parent disposes it too.
    pub fn child_scope(&mut self, parent: &Scope, label: &str) -> Scope {
        let id = self.scopes.insert(ScopeNode {
            label: label.to_string(),
            parent: Some(parent.id),
            ..ScopeNode::default()
        });
        if let Some(p) = self.scopes.get_mut(parent.id) {
            p.children.push(id);
        }
        Scope { id }
    }

    #[must_use]
    pub fn is_alive(&self, scope: &Scope) -> bool {
        self.scopes.contains_key(scope.id)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn add_geometry(&mut self, scope: &Scope, geometry: Geometry) -> GeometryHandle {
        let handle = self.geometries.insert(Owned {
            scope: scope.id,
            value: geometry,
        });
        if let Some(node) = self.scopes.get_mut(scope.id) {
            node.geometries.push(handle);
        }
        handle
    }

    pub fn add_material(&mut self, scope: &Scope, material: Material) -> MaterialHandle {
        let handle = self.materials.insert(Owned {
            scope: scope.id,
            value: material,
        });
        if let Some(node) = self.scopes.get_mut(scope.id) {
            node.materials.push(handle);
        }
        handle
    }

    pub fn add_texture(&mut self, scope: &Scope, texture: Texture) -> TextureHandle {
        let handle = self.textures.insert(Owned {
            scope: scope.id,
            value: texture,
        });
        if let Some(node) = self.scopes.get_mut(scope.id) {
            node.textures.push(handle);
        }
        handle
    }

    pub fn add_group(&mut self, scope: &Scope, group: GroupNode) -> GroupHandle {
        let handle = self.groups.insert(Owned {
            scope: scope.id,
            value: group,
        });
        if let Some(node) = self.scopes.get_mut(scope.id) {
            node.groups.push(handle);
        }
        handle
    }

    /// Moves ownership of a resource into `to`. Returns `false` if the handle
    /// is stale or the target scope is gone.
    pub fn transfer(&mut self, handle: ResourceHandle, to: &Scope) -> bool {
        if !self.scopes.contains_key(to.id) {
            return false;
        }

        macro_rules! move_owned {
            ($map:ident, $list:ident, $h:expr) => {{
                let Some(owned) = self.$map.get_mut($h) else {
                    return false;
                };
                let from = std::mem::replace(&mut owned.scope, to.id);
                if let Some(node) = self.scopes.get_mut(from) {
                    node.$list.retain(|x| *x != $h);
                }
                if let Some(node) = self.scopes.get_mut(to.id) {
                    node.$list.push($h);
                }
            }};
        }

        match handle {
            ResourceHandle::Geometry(h) => move_owned!(geometries, geometries, h),
            ResourceHandle::Material(h) => move_owned!(materials, materials, h),
            ResourceHandle::Texture(h) => move_owned!(textures, textures, h),
            ResourceHandle::Group(h) => move_owned!(groups, groups, h),
        }
        true
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(handle).map(|o| &o.value)
    }

    pub fn geometry_mut(&mut self, handle: GeometryHandle) -> Option<&mut Geometry> {
        self.geometries.get_mut(handle).map(|o| &mut o.value)
    }

    #[must_use]
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle).map(|o| &o.value)
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle).map(|o| &mut o.value)
    }

    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle).map(|o| &o.value)
    }

    #[must_use]
    pub fn group(&self, handle: GroupHandle) -> Option<&GroupNode> {
        self.groups.get(handle).map(|o| &o.value)
    }

    pub fn group_mut(&mut self, handle: GroupHandle) -> Option<&mut GroupNode> {
        self.groups.get_mut(handle).map(|o| &mut o.value)
    }

    /// Scope that currently owns `handle`.
    #[must_use]
    pub fn owner_of(&self, handle: ResourceHandle) -> Option<ScopeId> {
        match handle {
            ResourceHandle::Geometry(h) => self.geometries.get(h).map(|o| o.scope),
            ResourceHandle::Material(h) => self.materials.get(h).map(|o| o.scope),
            ResourceHandle::Texture(h) => self.textures.get(h).map(|o| o.scope),
            ResourceHandle::Group(h) => self.groups.get(h).map(|o| o.scope),
        }
    }

    // ========================================================================
    // Replacement & disposal
    // ========================================================================

    /// Swaps the material behind `handle`, releasing the previous one (and its
    /// textures) before the new one becomes visible.
    pub fn replace_material(&mut self, handle: MaterialHandle, material: Material) -> DisposeReport {
        let mut report = DisposeReport::default();
        if let Some(owned) = self.materials.get_mut(handle) {
            let old = std::mem::replace(&mut owned.value, material);
            self.release_material(old, &mut report);
        }
        report
    }

    /// Swaps the geometry behind `handle`, releasing the previous one first.
    pub fn replace_geometry(&mut self, handle: GeometryHandle, geometry: Geometry) -> DisposeReport {
        let mut report = DisposeReport::default();
        if let Some(owned) = self.geometries.get_mut(handle) {
            let old = std::mem::replace(&mut owned.value, geometry);
            self.emit(ResourceKind::Geometry, old.uuid, "geometry", &mut report);
        }
        report
    }

    /// Releases every resource owned by `scope` and its descendants.
    pub fn dispose_scope(&mut self, scope: Scope) -> DisposeReport {
        let mut report = DisposeReport::default();
        let label = self
            .scopes
            .get(scope.id)
            .map(|s| s.label.clone())
            .unwrap_or_default();

        self.dispose_scope_id(scope.id, &mut report);

        if !report.is_empty() {
            log::debug!(
                "Disposed scope '{}': {} geometries, {} materials, {} textures, {} groups",
                label,
                report.count(ResourceKind::Geometry),
                report.count(ResourceKind::Material),
                report.count(ResourceKind::Texture),
                report.count(ResourceKind::Group),
            );
        }
        report
    }

    fn dispose_scope_id(&mut self, id: ScopeId, report: &mut DisposeReport) {
        let Some(node) = self.scopes.remove(id) else {
            return;
        };

        for child in &node.children {
            self.dispose_scope_id(*child, report);
        }

        if let Some(parent) = node.parent.and_then(|p| self.scopes.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }

        for h in node.geometries {
            if let Some(owned) = self.geometries.remove(h) {
                self.emit(ResourceKind::Geometry, owned.value.uuid, "geometry", report);
            }
        }
        for h in node.materials {
            if let Some(owned) = self.materials.remove(h) {
                self.release_material(owned.value, report);
            }
        }
        for h in node.textures {
            if let Some(owned) = self.textures.remove(h) {
                self.emit(ResourceKind::Texture, owned.value.uuid, &owned.value.name, report);
            }
        }
        for h in node.groups {
            if let Some(owned) = self.groups.remove(h) {
                self.emit(ResourceKind::Group, owned.value.uuid, &owned.value.name, report);
            }
        }
    }

    fn release_material(&mut self, material: Material, report: &mut DisposeReport) {
        let uuid = material.uuid;
        let name = material.name.clone().unwrap_or_default();
        self.emit(ResourceKind::Material, uuid, &name, report);
        for texture in material.into_textures() {
            self.emit(ResourceKind::Texture, texture.uuid, &texture.name, report);
        }
    }

    fn emit(&mut self, kind: ResourceKind, uuid: Uuid, label: &str, report: &mut DisposeReport) {
        if let Some(sink) = self.sink.as_mut() {
            sink.release(kind, uuid, label);
        }
        self.released_total += 1;
        report.events.push(DisposeEvent { kind, uuid });
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    #[must_use]
    pub fn live_counts(&self) -> LiveCounts {
        let nested: usize = self.materials.values().map(|m| m.value.texture_count()).sum();
        LiveCounts {
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            textures: self.textures.len() + nested,
            groups: self.groups.len(),
            scopes: self.scopes.len(),
        }
    }

    /// Number of releases performed since creation.
    #[must_use]
    pub fn released_total(&self) -> u64 {
        self.released_total
    }
}
