//! Render Pipeline Tests
//!
//! Tests for:
//! - RenderModeMaterializer: every mode, live-count stability across switches
//! - Textured mode cloning captured materials without touching the originals
//! - Shader fallback (unknown id, compile failure) and the program cache
//! - UniformBinder edits, clamping, reset and animated values
//! - Point-cloud LOD and stride subsampling
//! - Procedural presets: triplanar weights, texture scale, synthesized materials
//! - RenderMode parsing and serde

mod common;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Vec3, Vec4};
use serde_json::json;

use meshview::assets::{AssetReaderVariant, MeshCategory, MeshHandle, MeshSource, MemoryAssetReader};
use meshview::render::{
    ControlKind, FrameInput, FrameScheduler, GlslValidator, LodTable, MatcapLibrary, MaterialPreset,
    ProceduralMaterialSynthesizer, ProgramSource, RenderMode, RenderModeMaterializer, Representation, ShaderCatalog,
    ShaderCompiler, ShaderProgramCache, UniformBinder, auto_density, resolve_density, stride_subsample, texture_scale,
    triplanar_weights,
};
use meshview::resources::{Material, MaterialVariant, ResourceLifecycleManager, UniformType, UniformValue};
use meshview::scene::Primitive;
use meshview::{Error, ShaderError};

use common::{load, memory_reader, point_mesh, textured_parsed};

fn materializer() -> RenderModeMaterializer {
    RenderModeMaterializer::new(MatcapLibrary::new(16), ShaderCatalog::builtin().unwrap(), LodTable::default())
}

fn no_overrides() -> BTreeMap<String, serde_json::Value> {
    BTreeMap::new()
}

fn install(mgr: &mut ResourceLifecycleManager, parsed: meshview::assets::ParsedMesh, name: &str) -> MeshHandle {
    MeshHandle::install(parsed, MeshSource::new("mem", MeshCategory::Input, name), 1, mgr)
}

fn leaf_material<'m>(model: &meshview::MaterializedModel, mgr: &'m ResourceLifecycleManager) -> &'m Material {
    let leaf = model.meshes(mgr).into_iter().next().unwrap();
    mgr.material(leaf.material).unwrap()
}

// ============================================================================
// Mode materialization
// ============================================================================

#[test]
fn mode_switches_leave_no_residue() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();
    let baseline = mgr.live_counts();

    let modes = [
        RenderMode::Solid,
        RenderMode::Wireframe,
        RenderMode::NormalMap,
        RenderMode::Flat,
        RenderMode::Smooth,
        RenderMode::Textured,
        RenderMode::Shader("toon".into()),
        RenderMode::Shader("matcap_tint".into()),
        RenderMode::Shader("pointcloud".into()),
        RenderMode::Shader("does_not_exist".into()),
        RenderMode::Solid,
    ];
    for mode in &modes {
        let model = m.materialize(&mesh, mode, &no_overrides(), &mut mgr);
        let live = mgr.live_counts();
        assert!(live.geometries > baseline.geometries, "{mode} built no geometry");
        assert_eq!(live.groups, baseline.groups + 1);
        model.dispose(&mut mgr);
        assert_eq!(mgr.live_counts(), baseline, "{mode} leaked resources");
    }

    mesh.dispose(&mut mgr);
    assert_eq!(mgr.live_counts().total_resources(), 0);
}

#[test]
fn flat_mode_derives_faceted_geometry() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();

    let model = m.materialize(&mesh, &RenderMode::Flat, &no_overrides(), &mut mgr);
    let (geometry, _) = model.geometries(&mgr)[0];
    assert!(!geometry.is_indexed());
    assert_eq!(geometry.vertex_count(), 48);

    let MaterialVariant::Matcap(matcap) = &leaf_material(&model, &mgr).variant else {
        panic!("flat mode should use a matcap");
    };
    assert!(matcap.flat_shading);

    // The pristine geometry stays indexed.
    assert!(mgr.geometry(mesh.parts[0].geometry).unwrap().is_indexed());
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

#[test]
fn wireframe_and_normal_modes() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();

    let model = m.materialize(&mesh, &RenderMode::Wireframe, &no_overrides(), &mut mgr);
    let material = leaf_material(&model, &mgr);
    assert!(material.settings.wireframe);
    assert_eq!(material.variant.kind_name(), "basic");
    model.dispose(&mut mgr);

    let model = m.materialize(&mesh, &RenderMode::NormalMap, &no_overrides(), &mut mgr);
    assert!(matches!(leaf_material(&model, &mgr).variant, MaterialVariant::NormalDebug));
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

#[test]
fn solid_prefers_vertex_colors() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mut m = materializer();

    let colored = load(&mut mgr, &reader, MeshCategory::Input, "quad.ply");
    let model = m.materialize(&colored, &RenderMode::Solid, &no_overrides(), &mut mgr);
    assert!(matches!(leaf_material(&model, &mgr).variant, MaterialVariant::VertexColor { .. }));
    model.dispose(&mut mgr);
    colored.dispose(&mut mgr);

    let plain = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let model = m.materialize(&plain, &RenderMode::Solid, &no_overrides(), &mut mgr);
    assert!(matches!(leaf_material(&model, &mgr).variant, MaterialVariant::Matcap(_)));
    model.dispose(&mut mgr);
    plain.dispose(&mut mgr);
}

#[test]
fn point_only_meshes_get_points_materials() {
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = install(&mut mgr, point_mesh(100), "scan.ply");
    let mut m = materializer();

    let model = m.materialize(&mesh, &RenderMode::Solid, &no_overrides(), &mut mgr);
    let leaf = &model.meshes(&mgr)[0];
    assert_eq!(leaf.primitive, Primitive::Points);
    assert!(matches!(mgr.material(leaf.material).unwrap().variant, MaterialVariant::Points(_)));
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

// ============================================================================
// Textured mode
// ============================================================================

#[test]
fn textured_mode_clones_the_captured_material() {
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = install(&mut mgr, textured_parsed(), "painted.glb");
    let mut m = materializer();

    let captured = mesh.captured_material(&mesh.parts[0]).unwrap();
    let original_uuid = mgr.material(captured).unwrap().uuid;

    let model = m.materialize(&mesh, &RenderMode::Textured, &no_overrides(), &mut mgr);
    let original_map_uuid = {
        let clone = leaf_material(&model, &mgr);
        assert_ne!(clone.uuid, original_uuid);

        let (MaterialVariant::Standard(a), MaterialVariant::Standard(b)) =
            (&mgr.material(captured).unwrap().variant, &clone.variant)
        else {
            panic!("textured mode should keep the standard material");
        };
        let (a, b) = (a.map.as_ref().unwrap(), b.map.as_ref().unwrap());
        assert!(Arc::ptr_eq(&a.data, &b.data));
        assert_ne!(a.uuid, b.uuid);
        a.uuid
    };

    // Disposing the clone releases its texture, not the original's.
    let report = model.dispose(&mut mgr);
    assert!(!report.is_empty());
    assert!(report.events.iter().all(|e| e.uuid != original_uuid && e.uuid != original_map_uuid));
    assert!(mgr.material(captured).is_some());

    // Switching on to Solid keeps the original alive for the next Textured.
    let model = m.materialize(&mesh, &RenderMode::Solid, &no_overrides(), &mut mgr);
    assert!(matches!(leaf_material(&model, &mgr).variant, MaterialVariant::Matcap(_)));
    model.dispose(&mut mgr);
    assert!(mgr.material(captured).unwrap().is_textured());

    mesh.dispose(&mut mgr);
    assert_eq!(mgr.live_counts().total_resources(), 0);
}

#[test]
fn textured_mode_without_textures_looks_like_solid() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();

    let model = m.materialize(&mesh, &RenderMode::Textured, &no_overrides(), &mut mgr);
    assert!(matches!(leaf_material(&model, &mgr).variant, MaterialVariant::Matcap(_)));
    assert_eq!(model.effective_mode(), Some(&RenderMode::Textured));
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

// ============================================================================
// Shader modes
// ============================================================================

#[test]
fn unknown_shader_falls_back_to_solid() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();

    let model = m.materialize(&mesh, &RenderMode::Shader("nope".into()), &no_overrides(), &mut mgr);
    assert_eq!(model.effective_mode(), Some(&RenderMode::Solid));
    assert_eq!(model.fallback, Some(ShaderError::UnknownShader("nope".into())));
    assert!(model.binder.is_none());
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

#[test]
fn compile_failure_is_isolated_to_one_shader() {
    let broken = json!({
        "shaders": [{
            "id": "broken",
            "vertex": "void main() { gl_Position = vec4(0.0); }",
            "fragment": "void main() { oops",
            "uniforms": {}
        }]
    });
    let mut catalog = ShaderCatalog::builtin().unwrap();
    catalog.extend(ShaderCatalog::from_json(&broken.to_string()).unwrap());
    let mut m = RenderModeMaterializer::new(MatcapLibrary::new(16), catalog, LodTable::default());

    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");

    let model = m.materialize(&mesh, &RenderMode::Shader("broken".into()), &no_overrides(), &mut mgr);
    assert!(matches!(model.fallback, Some(ShaderError::CompileFailed { ref id, .. }) if id == "broken"));
    assert!(m.programs().is_failed("broken"));
    model.dispose(&mut mgr);

    let model = m.materialize(&mesh, &RenderMode::Shader("xray".into()), &no_overrides(), &mut mgr);
    assert!(model.fallback.is_none());
    assert_eq!(model.effective_mode(), Some(&RenderMode::Shader("xray".into())));
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

#[test]
fn builtin_catalog_compiles() {
    let catalog = ShaderCatalog::builtin().unwrap();
    assert!(catalog.len() >= 6);
    let mut validator = GlslValidator;
    for id in catalog.ids() {
        let descriptor = catalog.get(id).unwrap();
        let source = ProgramSource::from_descriptor(&descriptor);
        assert_eq!(validator.compile(&source), Ok(()), "shader '{id}'");
    }
}

struct CountingCompiler {
    calls: Rc<Cell<usize>>,
}

impl ShaderCompiler for CountingCompiler {
    fn compile(&mut self, source: &ProgramSource<'_>) -> Result<(), String> {
        self.calls.set(self.calls.get() + 1);
        if source.fragment.contains("fail") {
            Err("forced failure".into())
        } else {
            Ok(())
        }
    }
}

#[test]
fn program_cache_compiles_each_source_once() {
    let calls = Rc::new(Cell::new(0));
    let mut cache = ShaderProgramCache::new(CountingCompiler { calls: Rc::clone(&calls) });
    let ok = ProgramSource {
        id: "a",
        vertex: "void main() {}",
        fragment: "void main() {}",
        uniforms: Vec::new(),
    };
    let same_text = ProgramSource { id: "b", ..ok.clone() };
    let bad = ProgramSource {
        id: "c",
        fragment: "fail",
        ..ok.clone()
    };

    let key = cache.get_or_compile(&ok).unwrap();
    assert_eq!(cache.get_or_compile(&same_text).unwrap(), key);
    assert!(cache.get_or_compile(&bad).is_err());
    assert!(cache.get_or_compile(&bad).is_err());
    assert_eq!(cache.program_count(), 1);
    assert_eq!(calls.get(), 2);

    assert!(cache.clear_failure("c"));
    assert!(cache.get_or_compile(&bad).is_err());
    assert_eq!(calls.get(), 3);
}

#[test]
fn shader_materials_receive_resolved_uniforms_and_textures() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();

    let overrides = BTreeMap::from([("tint".to_string(), json!("#ff0000"))]);
    let model = m.materialize(&mesh, &RenderMode::Shader("matcap_tint".into()), &overrides, &mut mgr);
    let MaterialVariant::Shader(shader) = &leaf_material(&model, &mgr).variant else {
        panic!("expected a shader material");
    };
    assert_eq!(shader.value("tint"), Some(&UniformValue::Color(Vec3::X)));
    assert_eq!(leaf_material(&model, &mgr).texture_count(), 1);
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

// ============================================================================
// Uniforms
// ============================================================================

#[test]
fn reset_restores_defaults_bit_for_bit() {
    let catalog = ShaderCatalog::builtin().unwrap();
    let mut binder = UniformBinder::new(catalog.get("toon").unwrap());
    let defaults = binder.resolved();

    binder.apply_edit("steps", UniformValue::Int(6)).unwrap();
    binder.apply_edit("color", UniformValue::Color(Vec3::new(0.1, 0.2, 0.3))).unwrap();
    binder.apply_edit("light_dir", UniformValue::Vec3(Vec3::new(-1.0, 0.0, 0.0))).unwrap();
    assert_ne!(binder.resolved(), defaults);

    binder.reset();
    let after = binder.resolved();
    assert!(binder.overrides().is_empty());
    assert_eq!(after.len(), defaults.len());
    for (name, value) in &defaults {
        assert!(after[name].bit_eq(value), "'{name}' differs after reset");
    }
}

#[test]
fn edits_are_validated_and_clamped() {
    let catalog = ShaderCatalog::builtin().unwrap();
    let mut binder = UniformBinder::new(catalog.get("pointcloud").unwrap());

    binder.apply_edit("point_size", UniformValue::Float(100.0)).unwrap();
    assert_eq!(binder.resolved()["point_size"], UniformValue::Float(10.0));

    assert!(matches!(
        binder.apply_edit("time", UniformValue::Float(1.0)),
        Err(ShaderError::InvalidUniform { .. })
    ));
    assert!(binder.apply_edit("point_size", UniformValue::Bool(true)).is_err());
    assert!(binder.apply_edit("missing", UniformValue::Float(1.0)).is_err());
    assert!(binder.set_override("color", json!("not a color")).is_err());
    binder.set_override("color", json!({ "r": 1.0, "g": 0.5, "b": 0.0 })).unwrap();
    assert_eq!(binder.resolved()["color"], UniformValue::Color(Vec3::new(1.0, 0.5, 0.0)));
}

#[test]
fn empty_uniform_ranges_are_rejected_at_load() {
    let catalog = |min: f64, max: f64| {
        json!({
            "shaders": [{
                "id": "stepped",
                "vertex": "void main() {}",
                "fragment": "void main() {}",
                "uniforms": { "steps": { "type": "int", "default": 1, "min": min, "max": max } }
            }]
        })
        .to_string()
    };
    assert!(matches!(
        ShaderCatalog::from_json(&catalog(0.2, 0.8)),
        Err(Error::Shader(ShaderError::Catalog(_)))
    ));
    assert!(ShaderCatalog::from_json(&catalog(5.0, 1.0)).is_err());

    let ok = ShaderCatalog::from_json(&catalog(0.5, 3.5)).unwrap();
    let mut binder = UniformBinder::new(ok.get("stepped").unwrap());
    binder.apply_edit("steps", UniformValue::Int(9)).unwrap();
    assert_eq!(binder.resolved()["steps"], UniformValue::Int(3));
    binder.apply_edit("steps", UniformValue::Int(-4)).unwrap();
    assert_eq!(binder.resolved()["steps"], UniformValue::Int(1));
}

#[test]
fn controls_skip_hidden_and_animated_entries() {
    let catalog = ShaderCatalog::builtin().unwrap();
    let toon = UniformBinder::new(catalog.get("toon").unwrap());
    let controls = toon.controls();
    let kind = |name: &str| controls.iter().find(|c| c.name == name).map(|c| c.kind);

    assert_eq!(kind("color"), Some(ControlKind::ColorPicker));
    assert_eq!(kind("rim"), Some(ControlKind::Checkbox));
    assert!(matches!(kind("steps"), Some(ControlKind::Slider { min, max, .. }) if min == 2.0 && max == 8.0));
    assert!(matches!(kind("light_dir"), Some(ControlKind::PerAxis { axes: 3, .. })));

    let hologram = UniformBinder::new(catalog.get("hologram").unwrap());
    assert!(hologram.controls().iter().all(|c| c.name != "time"));
    let tint = UniformBinder::new(catalog.get("matcap_tint").unwrap());
    assert!(tint.controls().iter().all(|c| c.name != "matcap"));
}

#[test]
fn scheduler_advances_animated_time() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();
    let mut model = m.materialize(&mesh, &RenderMode::Shader("hologram".into()), &no_overrides(), &mut mgr);

    let mut scheduler = FrameScheduler::new(1.0);
    for _ in 0..4 {
        scheduler.tick(FrameInput::new(0.25), Some(&mut model), &mut mgr);
    }
    let MaterialVariant::Shader(shader) = &leaf_material(&model, &mgr).variant else {
        panic!("expected a shader material");
    };
    assert_eq!(shader.value("time"), Some(&UniformValue::Float(1.0)));

    let binder = model.binder.as_ref().unwrap();
    assert_eq!(binder.animated_names(), vec!["time".to_string()]);
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

#[test]
fn scheduler_reports_diagnostics_at_the_interval() {
    let mut mgr = ResourceLifecycleManager::new();
    let mut scheduler = FrameScheduler::new(0.41);
    let reports: Vec<f32> = (0..60)
        .filter_map(|_| scheduler.tick(FrameInput::new(1.0 / 60.0), None, &mut mgr).fps)
        .collect();
    assert_eq!(reports.len(), 2);
    assert!((reports[0] - 60.0).abs() < 0.5);
    assert!((scheduler.elapsed() - 1.0).abs() < 1e-4);
    scheduler.reset_clock();
    assert_eq!(scheduler.elapsed(), 0.0);
}

// ============================================================================
// Point cloud
// ============================================================================

#[test]
fn lod_table_steps() {
    assert_eq!(auto_density(10), 1.0);
    assert_eq!(auto_density(50_000), 0.75);
    assert_eq!(auto_density(150_000), 0.5);
    assert_eq!(auto_density(600_000), 0.15);
    assert_eq!(auto_density(1_000_000), 0.12);
    assert_eq!(auto_density(1_000_001), 0.1);

    let table = LodTable::default();
    assert_eq!(resolve_density(600_000, Some(0.4), &table), 0.4);
    assert_eq!(resolve_density(600_000, Some(3.0), &table), 1.0);
    assert_eq!(resolve_density(600_000, Some(0.0), &table), 0.15);
}

#[test]
fn stride_subsample_is_even_and_ordered() {
    let items: Vec<u32> = (0..10).collect();
    assert_eq!(stride_subsample(&items, 0.5), vec![0, 2, 4, 6, 8]);
    assert_eq!(stride_subsample(&items, 1.0), items);
    assert_eq!(stride_subsample(&items, 0.01), vec![0]);
    assert!(stride_subsample::<u32>(&[], 0.5).is_empty());
}

#[test]
fn large_scan_is_decimated_by_the_lod_table() {
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = install(&mut mgr, point_mesh(600_000), "scan.ply");
    let mut m = materializer();

    let model = m.materialize(&mesh, &RenderMode::Shader("pointcloud".into()), &no_overrides(), &mut mgr);
    assert_eq!(model.point_count, Some(90_000));
    let leaves = model.meshes(&mgr);
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].primitive, Primitive::Points);
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

#[test]
fn explicit_density_overrides_the_table() {
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = install(&mut mgr, point_mesh(1_000), "scan.ply");
    let mut m = materializer();
    let shader = RenderMode::Shader("pointcloud".into());

    let model = m.materialize(&mesh, &shader, &no_overrides(), &mut mgr);
    assert_eq!(model.point_count, Some(1_000));
    model.dispose(&mut mgr);

    let overrides = BTreeMap::from([
        ("auto_density".to_string(), json!(false)),
        ("density".to_string(), json!(0.25)),
    ]);
    let model = m.materialize(&mesh, &shader, &overrides, &mut mgr);
    assert_eq!(model.point_count, Some(250));
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

// ============================================================================
// Procedural presets
// ============================================================================

#[test]
fn texture_scale_is_preset_scale_over_diagonal() {
    assert_eq!(texture_scale(4.0, 2.0), 2.0);
    assert_eq!(texture_scale(3.0, 0.0), 3.0);
    assert_eq!(texture_scale(1.0, 8.0), 1.0 / 8.0);
}

#[test]
fn triplanar_weights_follow_the_dominant_axis() {
    let w = triplanar_weights(Vec3::new(0.2, 0.9, 0.1).normalize(), 4.0);
    assert!(w.y > 0.9);
    assert!((w.x + w.y + w.z - 1.0).abs() < 1e-6);
    let flat = triplanar_weights(Vec3::new(1.0, 1.0, 1.0).normalize(), 2.0);
    assert!((flat - Vec3::splat(1.0 / 3.0)).abs().max_element() < 1e-6);
}

#[test]
fn transparent_visual_preset() {
    let preset = MaterialPreset::from_json(
        r#"{ "id": "glass", "visual": { "color": [0.9, 0.95, 1.0], "opacity": 0.3, "transparent": true } }"#,
    )
    .unwrap();
    let synth = ProceduralMaterialSynthesizer::new("materials");
    let material = synth.synthesize(&preset, None, 1.0).unwrap();

    assert!(matches!(material.variant, MaterialVariant::Transparent(_)));
    assert!(material.settings.transparent);
    assert!(!material.settings.depth_write);
    assert!((material.settings.opacity - 0.3).abs() < 1e-6);
    assert_eq!(material.name.as_deref(), Some("glass"));
}

#[test]
fn procedural_preset_builds_a_triplanar_material() {
    let reader = MemoryAssetReader::new()
        .with_file("materials/granite/color.jpg", common::png_bytes([120, 120, 120, 255]))
        .with_file("materials/granite/normal.jpg", common::png_bytes([128, 128, 255, 255]))
        .with_file("materials/granite/roughness.jpg", common::png_bytes([200, 200, 200, 255]));
    let reader = AssetReaderVariant::memory(reader);

    let preset = MaterialPreset::from_json(
        r#"{ "id": "granite", "procedural": { "source": { "preset": "granite" }, "scale": 4.0, "blend_sharpness": 6.0 } }"#,
    )
    .unwrap();
    let meshview::render::PresetKind::Procedural(procedural) = &preset.kind else {
        panic!("expected a procedural preset");
    };

    let synth = ProceduralMaterialSynthesizer::new("materials/");
    let textures = pollster::block_on(synth.fetch_textures(procedural, &reader)).unwrap();
    assert!(!textures.neutral_normal);

    let material = synth.synthesize(&preset, Some(textures), 2.0).unwrap();
    let MaterialVariant::Triplanar(triplanar) = &material.variant else {
        panic!("expected a triplanar material");
    };
    assert_eq!(triplanar.scale, 2.0);
    assert_eq!(triplanar.blend_sharpness, 6.0);
    assert!(triplanar.fragment_source.contains("void main"));
    assert!(triplanar.fragment_source.contains("normal_map"));
    assert_eq!(material.texture_count(), 3);
}

#[test]
fn procedural_preset_without_textures_is_an_error() {
    let preset =
        MaterialPreset::from_json(r#"{ "id": "rock", "procedural": { "source": { "preset": "rock" } } }"#).unwrap();
    let synth = ProceduralMaterialSynthesizer::new("materials");
    assert!(synth.synthesize(&preset, None, 1.0).is_err());

    let reader = AssetReaderVariant::memory(MemoryAssetReader::new());
    let meshview::render::PresetKind::Procedural(procedural) = &preset.kind else {
        panic!("expected a procedural preset");
    };
    assert!(pollster::block_on(synth.fetch_textures(procedural, &reader)).is_err());
}

#[test]
fn presets_replace_every_part_material() {
    let reader = memory_reader();
    let mut mgr = ResourceLifecycleManager::new();
    let mesh = load(&mut mgr, &reader, MeshCategory::Input, "cube.obj");
    let mut m = materializer();

    let template = Material::new_basic(Vec4::new(1.0, 0.0, 0.0, 1.0));
    let model = m.materialize_with(&mesh, "red", &mut mgr, |_| template.duplicate());
    assert_eq!(model.representation, Representation::Preset("red".into()));
    assert!(model.effective_mode().is_none());
    assert_eq!(leaf_material(&model, &mgr).variant.kind_name(), "basic");
    model.dispose(&mut mgr);
    mesh.dispose(&mut mgr);
}

// ============================================================================
// RenderMode
// ============================================================================

#[test]
fn render_mode_strings() {
    assert_eq!("wireframe".parse::<RenderMode>().unwrap(), RenderMode::Wireframe);
    assert_eq!("Normals".parse::<RenderMode>().unwrap(), RenderMode::NormalMap);
    assert_eq!("shader:toon".parse::<RenderMode>().unwrap(), RenderMode::Shader("toon".into()));
    assert!("shader:".parse::<RenderMode>().is_err());
    assert!("sparkly".parse::<RenderMode>().is_err());

    let json = serde_json::to_string(&RenderMode::Shader("xray".into())).unwrap();
    assert_eq!(json, r#""shader:xray""#);
    let back: RenderMode = serde_json::from_str(r#""flat""#).unwrap();
    assert_eq!(back, RenderMode::Flat);
    assert_eq!(RenderMode::default(), RenderMode::Solid);
}

#[test]
fn uniform_types_map_to_glsl() {
    assert_eq!(UniformType::Color.glsl_name(), "vec3");
    assert_eq!(UniformType::Texture.glsl_name(), "sampler2D");
}
