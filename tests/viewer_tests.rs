//! Viewer Slot Tests
//!
//! Tests for:
//! - Load ordering: latest request wins, stale results are discarded
//! - Replacement disposal and placeholder on failure
//! - Mode switches, shader uniform edits and their persistence
//! - Material presets (visual and procedural)
//! - Physics enable/disable through the slot
//! - Unmount and settings validation

mod common;

use glam::Vec3;

use meshview::assets::{AssetReaderVariant, MeshCategory, MeshSource};
use meshview::physics::{BodyId, ColliderHull, PhysicsSettings, PhysicsWorld, SyncEvent};
use meshview::render::{MaterialPreset, RenderMode, Representation};
use meshview::resources::{MaterialVariant, UniformValue};
use meshview::{AssetError, Error, LoadOutcome, ShaderError, ViewerSettings, ViewerSlot};

use common::{memory_reader, png_bytes};

const BASE: &str = "https://meshes.example.com/files";

fn slot() -> ViewerSlot {
    let reader = memory_reader()
        .with_file("materials/granite/color.jpg", png_bytes([120, 120, 120, 255]))
        .with_file("materials/granite/normal.jpg", png_bytes([128, 128, 255, 255]))
        .with_file("materials/granite/roughness.jpg", png_bytes([200, 200, 200, 255]));
    ViewerSlot::new(ViewerSettings::default(), AssetReaderVariant::memory(reader)).unwrap()
}

fn source(filename: &str) -> MeshSource {
    MeshSource::new(BASE, MeshCategory::Input, filename)
}

fn load(slot: &mut ViewerSlot, src: MeshSource) -> LoadOutcome {
    pollster::block_on(slot.load(src))
}

fn leaf_variant_name(slot: &ViewerSlot) -> &'static str {
    let model = slot.model().unwrap();
    let leaf = model.meshes(slot.manager()).into_iter().next().unwrap();
    slot.manager().material(leaf.material).unwrap().variant.kind_name()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn latest_request_wins() {
    let mut slot = slot();
    let reader = memory_reader();

    let first = slot.request_load(source("cube.obj"));
    let second = slot.request_load(source("tetra.off"));
    assert_eq!(slot.latest_requested(), Some(second.load_id));

    let second_id = second.load_id;
    let tetra = common::parse(&reader, MeshCategory::Input, "tetra.off");
    assert!(matches!(slot.finish_load(second, tetra), LoadOutcome::Installed { load_id } if load_id == second_id));

    // The older fetch completes last and must not replace the newer mesh.
    let cube = common::parse(&reader, MeshCategory::Input, "cube.obj");
    assert!(matches!(slot.finish_load(first, cube), LoadOutcome::Stale { .. }));
    assert_eq!(slot.installed().unwrap().source.filename, "tetra.off");
    assert_eq!(slot.installed().unwrap().load_id, second_id);
}

#[test]
fn reload_with_new_token_replaces_the_mesh() {
    let mut slot = slot();
    assert!(matches!(load(&mut slot, source("cube.obj").with_cache_token("1")), LoadOutcome::Installed { .. }));
    let after_first = slot.live_counts();

    assert!(matches!(load(&mut slot, source("cube.obj").with_cache_token("2")), LoadOutcome::Installed { .. }));
    assert_eq!(slot.live_counts(), after_first);
    assert_eq!(slot.installed().unwrap().source.cache_token.as_deref(), Some("2"));
}

#[test]
fn failed_load_shows_the_placeholder() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));

    let outcome = load(&mut slot, source("missing.obj"));
    let LoadOutcome::Failed { error, .. } = outcome else {
        panic!("expected a failed load");
    };
    assert!(matches!(error, Error::Asset(AssetError::NotFound(_))));
    assert!(slot.installed().is_none());
    assert!(slot.model().is_none());
    assert!(slot.placeholder().is_some());
    assert!(slot.load_error().is_some());

    let live = slot.live_counts();
    assert_eq!((live.geometries, live.materials, live.groups), (2, 2, 1));

    // The next successful load clears the placeholder and the error.
    load(&mut slot, source("tri.stl"));
    assert!(slot.placeholder().is_none());
    assert!(slot.load_error().is_none());
}

#[test]
fn parse_errors_also_fall_back() {
    let mut slot = slot();
    let outcome = load(&mut slot, source("broken.off"));
    assert!(matches!(
        outcome,
        LoadOutcome::Failed { error: Error::Asset(AssetError::Parse { .. }), .. }
    ));
    assert!(slot.placeholder().is_some());
}

// ============================================================================
// Modes and uniforms
// ============================================================================

#[test]
fn mode_switches_keep_counts_stable() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));
    let baseline = slot.live_counts();
    let shape = |c: meshview::resources::LiveCounts| (c.geometries, c.materials, c.groups, c.scopes);

    for mode in ["wireframe", "flat", "normal", "smooth", "textured", "shader:xray", "solid"] {
        slot.set_mode(mode.parse().unwrap());
        assert_eq!(shape(slot.live_counts()), shape(baseline), "mode {mode}");
    }
    assert_eq!(slot.live_counts(), baseline);
    assert_eq!(leaf_variant_name(&slot), "matcap");

    // Re-entering the same mode rebuilds without growth.
    slot.set_mode(RenderMode::Solid);
    slot.set_mode(RenderMode::Solid);
    assert_eq!(slot.live_counts(), baseline);
}

#[test]
fn uniform_edits_persist_across_mode_switches() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));

    assert!(matches!(
        slot.set_uniform("steps", UniformValue::Int(5)),
        Err(ShaderError::UnknownShader(_))
    ));

    slot.set_mode(RenderMode::Shader("toon".into()));
    slot.set_uniform("steps", UniformValue::Int(5)).unwrap();
    slot.set_uniform("color", UniformValue::Color(Vec3::new(0.0, 0.0, 1.0))).unwrap();
    assert!(slot.set_uniform("steps", UniformValue::Float(1.0)).is_err());

    let resolved = |slot: &ViewerSlot| slot.model().unwrap().binder.as_ref().unwrap().resolved();
    assert_eq!(resolved(&slot)["steps"], UniformValue::Int(5));

    slot.set_mode(RenderMode::Wireframe);
    slot.set_mode(RenderMode::Shader("toon".into()));
    assert_eq!(resolved(&slot)["steps"], UniformValue::Int(5));

    let model = slot.model().unwrap();
    let leaf = model.meshes(slot.manager()).into_iter().next().unwrap();
    let MaterialVariant::Shader(shader) = &slot.manager().material(leaf.material).unwrap().variant else {
        panic!("expected a shader material");
    };
    assert_eq!(shader.value("color"), Some(&UniformValue::Color(Vec3::Z)));

    slot.reset_uniforms();
    assert_eq!(resolved(&slot)["steps"], UniformValue::Int(4));
    slot.set_mode(RenderMode::Solid);
    slot.set_mode(RenderMode::Shader("toon".into()));
    assert_eq!(resolved(&slot)["steps"], UniformValue::Int(4));
}

#[test]
fn point_density_edits_rebuild_the_cloud() {
    let mut slot = slot();
    let ticket = slot.request_load(MeshSource::new(BASE, MeshCategory::Input, "scan.ply"));
    let outcome = slot.finish_load(ticket, Ok(common::point_mesh(1_000)));
    assert!(matches!(outcome, LoadOutcome::Installed { .. }));

    slot.set_mode(RenderMode::Shader("pointcloud".into()));
    assert_eq!(slot.model().unwrap().point_count, Some(1_000));

    slot.set_uniform("auto_density", UniformValue::Bool(false)).unwrap();
    slot.set_uniform("density", UniformValue::Float(0.5)).unwrap();
    assert_eq!(slot.model().unwrap().point_count, Some(500));

    slot.reset_uniforms();
    assert_eq!(slot.model().unwrap().point_count, Some(1_000));
}

#[test]
fn unknown_shader_mode_reports_the_fallback() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));
    slot.set_mode(RenderMode::Shader("sparkle".into()));

    let model = slot.model().unwrap();
    assert_eq!(model.effective_mode(), Some(&RenderMode::Solid));
    assert!(model.fallback.is_some());
    assert_eq!(slot.mode(), &RenderMode::Shader("sparkle".into()));
}

#[test]
fn frame_ticks_drive_animated_uniforms() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));
    slot.set_mode(RenderMode::Shader("hologram".into()));

    for _ in 0..3 {
        slot.tick(meshview::FrameInput::new(0.5));
    }
    let binder = slot.model().unwrap().binder.as_ref().unwrap();
    assert_eq!(binder.resolved()["time"], UniformValue::Float(1.5));
}

// ============================================================================
// Presets
// ============================================================================

#[test]
fn visual_preset_replaces_part_materials() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));
    let baseline = slot.live_counts();

    let chrome = MaterialPreset::from_json(r#"{ "id": "chrome", "visual": { "metalness": 1.0, "roughness": 0.1 } }"#)
        .unwrap();
    pollster::block_on(slot.set_preset(Some(chrome))).unwrap();
    assert_eq!(slot.model().unwrap().representation, Representation::Preset("chrome".into()));
    assert_eq!(leaf_variant_name(&slot), "standard");

    pollster::block_on(slot.set_preset(None)).unwrap();
    assert_eq!(slot.model().unwrap().effective_mode(), Some(&RenderMode::Solid));
    assert_eq!(slot.live_counts(), baseline);
}

#[test]
fn procedural_preset_is_fetched_and_applied() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));

    let granite = MaterialPreset::from_json(
        r#"{ "id": "granite", "procedural": { "source": { "preset": "granite" }, "scale": 2.0 } }"#,
    )
    .unwrap();
    pollster::block_on(slot.set_preset(Some(granite))).unwrap();
    assert_eq!(leaf_variant_name(&slot), "triplanar");

    // The preset survives a reload of another mesh.
    load(&mut slot, source("tetra.off"));
    assert_eq!(slot.preset().unwrap().id, "granite");
    assert_eq!(leaf_variant_name(&slot), "triplanar");
}

#[test]
fn missing_preset_textures_keep_the_current_state() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));

    let marble = MaterialPreset::from_json(r#"{ "id": "marble", "procedural": { "source": { "preset": "marble" } } }"#)
        .unwrap();
    assert!(pollster::block_on(slot.set_preset(Some(marble))).is_err());
    assert!(slot.preset().is_none());
    assert_eq!(leaf_variant_name(&slot), "matcap");
}

// ============================================================================
// Physics
// ============================================================================

#[derive(Default)]
struct CountingWorld {
    created: Vec<BodyId>,
    removed: Vec<BodyId>,
    next_id: u64,
}

impl PhysicsWorld for CountingWorld {
    fn set_gravity(&mut self, _gravity: Vec3) {}

    fn create_convex_body(&mut self, hull: &ColliderHull, _mass: f32) -> BodyId {
        assert!(!hull.points.is_empty());
        self.next_id += 1;
        let id = BodyId(self.next_id);
        self.created.push(id);
        id
    }

    fn set_restitution(&mut self, _body: BodyId, _restitution: f32) {}
    fn set_damping(&mut self, _body: BodyId, _linear: f32, _angular: f32) {}
    fn set_friction(&mut self, _body: BodyId, _friction: f32) {}

    fn remove_body(&mut self, body: BodyId) {
        self.removed.push(body);
    }
}

#[test]
fn physics_follows_the_materialized_model() {
    let mut slot = slot();
    let mut world = CountingWorld::default();
    load(&mut slot, source("cube.obj"));
    assert_eq!(slot.sync_physics(&mut world, 0.016), SyncEvent::Idle);

    slot.set_physics(Some(PhysicsSettings::default()));
    assert_eq!(slot.physics().unwrap().hull().source_vertices, 10);
    assert_eq!(slot.sync_physics(&mut world, 0.016), SyncEvent::Created(BodyId(1)));
    assert_eq!(slot.sync_physics(&mut world, 1.0), SyncEvent::Configured(BodyId(1)));

    // Flat mode has a different vertex layout; the body is rebuilt.
    slot.set_mode(RenderMode::Flat);
    assert_eq!(slot.physics().unwrap().hull().source_vertices, 48);
    assert_eq!(slot.sync_physics(&mut world, 0.016), SyncEvent::Created(BodyId(2)));
    assert_eq!(world.removed, vec![BodyId(1)]);

    slot.set_physics(None);
    assert!(slot.physics().is_none());
    assert_eq!(slot.sync_physics(&mut world, 0.016), SyncEvent::Idle);
    assert_eq!(world.removed, vec![BodyId(1), BodyId(2)]);
}

#[test]
fn failed_load_removes_the_body_until_the_next_mesh() {
    let mut slot = slot();
    let mut world = CountingWorld::default();
    load(&mut slot, source("cube.obj"));
    slot.set_physics(Some(PhysicsSettings::default()));
    slot.sync_physics(&mut world, 0.016);
    slot.sync_physics(&mut world, 1.0);

    assert!(matches!(load(&mut slot, source("missing.obj")), LoadOutcome::Failed { .. }));
    assert!(slot.physics().is_none());
    assert_eq!(slot.sync_physics(&mut world, 0.016), SyncEvent::Idle);
    assert_eq!(world.removed, vec![BodyId(1)]);

    // Physics stays enabled; the next mesh gets a fresh body.
    load(&mut slot, source("cube.obj"));
    assert_eq!(slot.physics().unwrap().hull().source_vertices, 10);
    assert_eq!(slot.sync_physics(&mut world, 0.016), SyncEvent::Created(BodyId(2)));
}

#[test]
fn physics_settings_are_clamped_on_entry() {
    let mut slot = slot();
    load(&mut slot, source("cube.obj"));
    slot.set_physics(Some(PhysicsSettings {
        restitution: 4.0,
        ..PhysicsSettings::default()
    }));
    assert_eq!(slot.physics().unwrap().settings().restitution, 1.0);
    assert_eq!(slot.settings().physics.restitution, 1.0);
}

// ============================================================================
// Teardown and settings
// ============================================================================

#[test]
fn unmount_releases_everything() {
    let mut slot = slot();
    let mut world = CountingWorld::default();
    load(&mut slot, source("quad.ply"));
    slot.set_mode(RenderMode::Shader("matcap_tint".into()));
    slot.set_physics(Some(PhysicsSettings::default()));
    slot.sync_physics(&mut world, 0.0);

    let pending = slot.request_load(source("cube.obj"));
    let report = slot.unmount();
    assert!(!report.is_empty());
    assert_eq!(slot.live_counts().total_resources(), 0);
    assert_eq!(slot.manager().live_counts().scopes, 0);

    slot.sync_physics(&mut world, 0.0);
    assert_eq!(world.removed, world.created);

    // A load that was in flight is stale after unmount.
    let cube = common::parse(&memory_reader(), MeshCategory::Input, "cube.obj");
    assert!(matches!(slot.finish_load(pending, cube), LoadOutcome::Stale { .. }));
    assert_eq!(slot.live_counts().total_resources(), 0);
}

#[test]
fn settings_json_is_validated() {
    let settings = ViewerSettings::from_json(r#"{ "diagnostics_interval": 2.0, "physics": { "friction": 0.9 } }"#)
        .unwrap();
    assert_eq!(settings.diagnostics_interval, 2.0);
    assert_eq!(settings.physics.friction, 0.9);
    assert_eq!(settings.collider_max_points, 256);

    assert!(matches!(
        ViewerSettings::from_json(r#"{ "collider_max_points": 0 }"#),
        Err(Error::Config(_))
    ));
    assert!(ViewerSettings::from_json(r#"{ "diagnostics_interval": 0.0 }"#).is_err());
    assert!(ViewerSettings::from_json(r#"{ "matcap_resolution": 0 }"#).is_err());
    assert!(ViewerSettings::from_json(r#"{ "matcap_resolution": 100000 }"#).is_err());
    assert_eq!(ViewerSettings::from_json(r#"{ "matcap_resolution": 4096 }"#).unwrap().matcap_resolution, 4096);
    assert!(
        ViewerSettings::from_json(r#"{ "lod": { "steps": [{ "below": 10, "density": 0.5 }, { "below": 20, "density": 0.9 }] } }"#)
            .is_err()
    );
    assert!(ViewerSettings::from_json("not json").is_err());
}
