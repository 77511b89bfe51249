//! Viewer slot orchestration.
//!
//! [`ViewerSlot`] is the single writer of the viewer state: which mesh is
//! installed, which render mode or preset is active, and whether physics is
//! on. Every change disposes what it replaces before the replacement is
//! installed, inside the same call.
//!
//! Loads are split in two so the host can run several fetches without
//! holding the slot: [`ViewerSlot::request_load`] hands out a ticket, and
//! [`ViewerSlot::finish_load`] installs the result only if that ticket is
//! still the latest one requested.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assets::io::AssetReaderVariant;
use crate::assets::loaders::{FormatLoader, LoadContext, ParsedMesh};
use crate::assets::mesh_handle::MeshHandle;
use crate::assets::source::MeshSource;
use crate::errors::{Error, Result, ShaderError};
use crate::physics::{ColliderExtractor, DEFAULT_MAX_HULL_POINTS, PhysicsBinding, PhysicsSettings, PhysicsWorld, SyncEvent};
use crate::render::catalog::ShaderCatalog;
use crate::render::frame::{FrameInput, FrameScheduler, FrameStats};
use crate::render::matcap::{MAX_MATCAP_RESOLUTION, MatcapLibrary};
use crate::render::materializer::{MaterializedModel, POINT_CLOUD_SHADER, RenderModeMaterializer};
use crate::render::mode::RenderMode;
use crate::render::point_cloud::LodTable;
use crate::render::procedural::{MaterialPreset, PresetKind, PresetTextures, ProceduralMaterialSynthesizer};
use crate::resources::lifecycle::{DisposeReport, LiveCounts, ResourceLifecycleManager};
use crate::resources::uniforms::UniformValue;
use crate::scene::{Placeholder, placeholder_scene};

/// Deployment-level knobs. Every field has a default; JSON may set any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Upper bound on collider hull points.
    pub collider_max_points: usize,
    pub lod: LodTable,
    pub physics: PhysicsSettings,
    /// Seconds between diagnostic reports.
    pub diagnostics_interval: f32,
    pub matcap_resolution: u32,
    /// Root of the named procedural preset directories.
    pub procedural_base_path: String,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            collider_max_points: DEFAULT_MAX_HULL_POINTS,
            lod: LodTable::default(),
            physics: PhysicsSettings::default(),
            diagnostics_interval: 1.0,
            matcap_resolution: 256,
            procedural_base_path: "materials".to_string(),
        }
    }
}

impl ViewerSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collider_max_points == 0 {
            return Err(Error::Config("collider_max_points must be positive".into()));
        }
        if self.diagnostics_interval.is_nan() || self.diagnostics_interval <= 0.0 {
            return Err(Error::Config("diagnostics_interval must be positive".into()));
        }
        if !(2..=MAX_MATCAP_RESOLUTION).contains(&self.matcap_resolution) {
            return Err(Error::Config(format!(
                "matcap_resolution must be within 2..={MAX_MATCAP_RESOLUTION}"
            )));
        }
        self.lod.validate()
    }
}

/// Proof of a load request. Only the most recent ticket can install.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    pub load_id: u64,
    pub source: MeshSource,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Installed { load_id: u64 },
    /// The load failed; the placeholder is shown instead.
    Failed { load_id: u64, error: Error },
    /// A newer request superseded this one; nothing changed.
    Stale { load_id: u64 },
}

/// One interactive viewer and everything it owns.
pub struct ViewerSlot {
    settings: ViewerSettings,
    reader: AssetReaderVariant,
    manager: ResourceLifecycleManager,
    materializer: RenderModeMaterializer,
    synthesizer: ProceduralMaterialSynthesizer,
    scheduler: FrameScheduler,

    next_load_id: u64,
    latest_requested: Option<u64>,

    mesh: Option<MeshHandle>,
    model: Option<MaterializedModel>,
    placeholder: Option<Placeholder>,
    load_error: Option<String>,

    mode: RenderMode,
    preset: Option<MaterialPreset>,
    /// Decoded preset maps kept on the CPU between rebuilds. Never registered
    /// with the manager; every leaf registers its own duplicate instead.
    preset_textures: Option<PresetTextures>,
    shader_overrides: BTreeMap<String, BTreeMap<String, Value>>,

    physics_enabled: bool,
    physics: Option<PhysicsBinding>,
    detached: Vec<PhysicsBinding>,
}

impl ViewerSlot {
    /// A slot using the builtin shader catalog.
    pub fn new(settings: ViewerSettings, reader: AssetReaderVariant) -> Result<Self> {
        Self::with_catalog(settings, reader, ShaderCatalog::builtin()?)
    }

    pub fn with_catalog(settings: ViewerSettings, reader: AssetReaderVariant, catalog: ShaderCatalog) -> Result<Self> {
        settings.validate()?;
        let materializer = RenderModeMaterializer::new(
            MatcapLibrary::new(settings.matcap_resolution),
            catalog,
            settings.lod.clone(),
        );
        Ok(Self {
            synthesizer: ProceduralMaterialSynthesizer::new(settings.procedural_base_path.clone()),
            scheduler: FrameScheduler::new(settings.diagnostics_interval),
            settings,
            reader,
            manager: ResourceLifecycleManager::new(),
            materializer,
            next_load_id: 0,
            latest_requested: None,
            mesh: None,
            model: None,
            placeholder: None,
            load_error: None,
            mode: RenderMode::default(),
            preset: None,
            preset_textures: None,
            shader_overrides: BTreeMap::new(),
            physics_enabled: false,
            physics: None,
            detached: Vec::new(),
        })
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Registers `source` as the latest request.
    pub fn request_load(&mut self, source: MeshSource) -> LoadTicket {
        self.next_load_id += 1;
        self.latest_requested = Some(self.next_load_id);
        log::info!("Load #{} requested: {}", self.next_load_id, source.relative_path());
        LoadTicket {
            load_id: self.next_load_id,
            source,
        }
    }

    /// Installs the result of `ticket` if it is still the latest request.
    ///
    /// The previous model and mesh are disposed before the new one is
    /// installed. A failed load installs the placeholder.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<ParsedMesh>) -> LoadOutcome {
        let load_id = ticket.load_id;
        if self.latest_requested != Some(load_id) {
            log::debug!(
                "Discarding stale load #{load_id} (latest is #{})",
                self.latest_requested.unwrap_or_default()
            );
            return LoadOutcome::Stale { load_id };
        }

        let report = self.clear_installed();
        if !report.is_empty() {
            log::debug!("Load #{load_id}: released {} previous resources", report.events.len());
        }

        match result {
            Ok(parsed) => {
                let mesh = MeshHandle::install(parsed, ticket.source, load_id, &mut self.manager);
                log::info!(
                    "Load #{load_id} installed: {} parts, {} vertices",
                    mesh.parts.len(),
                    mesh.vertex_count(&self.manager)
                );
                self.mesh = Some(mesh);
                self.load_error = None;
                self.scheduler.reset_clock();
                self.rematerialize();
                LoadOutcome::Installed { load_id }
            }
            Err(error) => {
                log::error!("Load #{load_id} failed: {error}");
                self.load_error = Some(error.to_string());
                self.placeholder = Some(placeholder_scene(&mut self.manager));
                self.refresh_physics();
                LoadOutcome::Failed { load_id, error }
            }
        }
    }

    /// Fetches, parses and installs `source`.
    pub async fn load(&mut self, source: MeshSource) -> LoadOutcome {
        let ticket = self.request_load(source);
        let mut ctx = LoadContext::new(ticket.load_id, ticket.source.clone(), self.reader.clone());
        let result = FormatLoader::load(&mut ctx).await;
        for warning in ctx.warnings() {
            log::warn!("Load #{}: {warning}", ticket.load_id);
        }
        self.finish_load(ticket, result)
    }

    /// Disposes model, mesh and placeholder, in that order.
    fn clear_installed(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();
        if let Some(model) = self.model.take() {
            report.merge(model.dispose(&mut self.manager));
        }
        if let Some(mesh) = self.mesh.take() {
            report.merge(mesh.dispose(&mut self.manager));
        }
        if let Some(placeholder) = self.placeholder.take() {
            report.merge(placeholder.dispose(&mut self.manager));
        }
        report
    }

    // ========================================================================
    // Mode, preset and uniforms
    // ========================================================================

    /// Switches render mode. Re-entering the current mode rebuilds it.
    pub fn set_mode(&mut self, mode: RenderMode) {
        log::debug!("Render mode: {} -> {mode}", self.mode);
        self.mode = mode;
        self.rematerialize();
    }

    /// Activates (or clears) a material preset. Procedural textures are
    /// fetched first; on failure the current state is kept.
    pub async fn set_preset(&mut self, preset: Option<MaterialPreset>) -> Result<()> {
        let textures = match preset.as_ref().map(|p| &p.kind) {
            Some(PresetKind::Procedural(procedural)) => {
                Some(self.synthesizer.fetch_textures(procedural, &self.reader).await?)
            }
            _ => None,
        };
        self.preset = preset;
        self.preset_textures = textures;
        self.rematerialize();
        Ok(())
    }

    /// Edits a uniform of the active shader and stores it as an override.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> std::result::Result<(), ShaderError> {
        let Some(model) = self.model.as_mut() else {
            return Err(ShaderError::UnknownShader(self.mode.to_string()));
        };
        let Some(binder) = model.binder.as_mut() else {
            return Err(ShaderError::UnknownShader(self.mode.to_string()));
        };
        binder.apply_edit(name, value)?;

        let shader_id = binder.descriptor().id.clone();
        self.shader_overrides.insert(shader_id.clone(), binder.overrides().clone());

        if shader_id == POINT_CLOUD_SHADER && matches!(name, "density" | "auto_density") {
            self.rematerialize();
        } else {
            model.sync_uniforms(&mut self.manager);
        }
        Ok(())
    }

    /// Clears every override of the active shader.
    pub fn reset_uniforms(&mut self) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let Some(binder) = model.binder.as_mut() else {
            return;
        };
        binder.reset();
        let shader_id = binder.descriptor().id.clone();
        self.shader_overrides.remove(&shader_id);
        if shader_id == POINT_CLOUD_SHADER {
            self.rematerialize();
        } else {
            model.sync_uniforms(&mut self.manager);
        }
    }

    /// Rebuilds the model for the current mode or preset, disposing the old
    /// one first.
    fn rematerialize(&mut self) {
        if let Some(old) = self.model.take() {
            old.dispose(&mut self.manager);
        }
        let Some(mesh) = self.mesh.as_ref() else {
            self.refresh_physics();
            return;
        };

        let preset_model = self.preset.as_ref().and_then(|preset| {
            let textures = self.preset_textures.as_ref().map(PresetTextures::duplicate);
            // `template` is a prototype and is dropped unregistered.
            match self.synthesizer.synthesize(preset, textures, mesh.bounding_diagonal()) {
                Ok(template) => Some(self.materializer.materialize_with(
                    mesh,
                    &preset.id,
                    &mut self.manager,
                    |_| template.duplicate(),
                )),
                Err(err) => {
                    log::warn!("Preset '{}' unavailable, using render mode: {err}", preset.id);
                    None
                }
            }
        });

        let model = match preset_model {
            Some(model) => model,
            None => {
                let empty = BTreeMap::new();
                let overrides = self
                    .mode
                    .shader_id()
                    .and_then(|id| self.shader_overrides.get(id))
                    .unwrap_or(&empty);
                self.materializer.materialize(mesh, &self.mode, overrides, &mut self.manager)
            }
        };

        if let Some(binder) = &model.binder {
            log::debug!("Shader '{}' bound ({} uniforms)", binder.descriptor().id, binder.resolved().len());
        }
        self.model = Some(model);
        self.refresh_physics();
    }

    // ========================================================================
    // Physics
    // ========================================================================

    /// Enables physics with `settings`, or disables it. The body itself is
    /// created on the next [`sync_physics`](Self::sync_physics).
    pub fn set_physics(&mut self, settings: Option<PhysicsSettings>) {
        match settings {
            Some(settings) => {
                self.settings.physics = settings.clamped();
                self.physics_enabled = true;
                match self.physics.as_mut() {
                    Some(binding) => binding.set_settings(settings),
                    None => self.refresh_physics(),
                }
            }
            None => {
                self.physics_enabled = false;
                self.detach_physics();
            }
        }
    }

    #[must_use]
    pub fn physics(&self) -> Option<&PhysicsBinding> {
        self.physics.as_ref()
    }

    /// Recomputes the hull from the current model. Without a model the body
    /// is queued for removal; it comes back with the next installed mesh.
    fn refresh_physics(&mut self) {
        if !self.physics_enabled {
            return;
        }
        let Some(model) = self.model.as_ref() else {
            self.detach_physics();
            return;
        };
        let hull = Arc::new(
            ColliderExtractor::new(self.settings.collider_max_points).extract(model.geometries(&self.manager)),
        );
        match self.physics.as_mut() {
            Some(binding) => binding.set_hull(hull),
            None => self.physics = Some(PhysicsBinding::new(hull, self.settings.physics)),
        }
    }

    fn detach_physics(&mut self) {
        if let Some(binding) = self.physics.take() {
            self.detached.push(binding);
        }
    }

    /// Applies pending physics changes to the host world. Called from the
    /// host's simulation step.
    pub fn sync_physics(&mut self, world: &mut dyn PhysicsWorld, dt: f32) -> SyncEvent {
        for binding in self.detached.drain(..) {
            binding.detach(world);
        }
        self.physics
            .as_mut()
            .map_or(SyncEvent::Idle, |binding| binding.sync(world, dt))
    }

    // ========================================================================
    // Frame & teardown
    // ========================================================================

    pub fn tick(&mut self, input: FrameInput) -> FrameStats {
        self.scheduler.tick(input, self.model.as_mut(), &mut self.manager)
    }

    #[must_use]
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    /// Releases everything the slot owns. Pending loads become stale; the
    /// physics body is removed on the next sync.
    pub fn unmount(&mut self) -> DisposeReport {
        self.latest_requested = None;
        self.physics_enabled = false;
        self.detach_physics();
        self.preset_textures = None;
        let report = self.clear_installed();
        log::info!("Viewer unmounted, released {} resources", report.events.len());
        report
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn installed(&self) -> Option<&MeshHandle> {
        self.mesh.as_ref()
    }

    #[must_use]
    pub fn model(&self) -> Option<&MaterializedModel> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn mode(&self) -> &RenderMode {
        &self.mode
    }

    #[must_use]
    pub fn preset(&self) -> Option<&MaterialPreset> {
        self.preset.as_ref()
    }

    #[must_use]
    pub fn latest_requested(&self) -> Option<u64> {
        self.latest_requested
    }

    #[must_use]
    pub fn manager(&self) -> &ResourceLifecycleManager {
        &self.manager
    }

    #[must_use]
    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    #[must_use]
    pub fn live_counts(&self) -> LiveCounts {
        self.manager.live_counts()
    }
}
